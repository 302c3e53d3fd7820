#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use postbox_api::{AppConfig, AppState, MemoryDatabase, create_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

/// Default config with the test secret and the cheapest bcrypt cost.
pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        bcrypt_cost: 4,
        ..AppConfig::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: MemoryDatabase,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub fn spawn_app() -> TestApp {
    let db = MemoryDatabase::new();
    let state = AppState::new(test_config(), Arc::new(db.clone()));
    TestApp {
        router: create_router(state.clone()),
        db,
        state,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn register(&self, username: &str, password: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/register/",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "grant_type=password&username={}&password={}",
                username, password
            )))
            .unwrap();
        self.send(request).await
    }

    /// Registers `username` and returns a fresh access token for it.
    pub async fn signed_up(&self, username: &str, password: &str) -> String {
        assert_eq!(self.register(username, password).await.status, StatusCode::OK);
        let response = self.login(username, password).await;
        assert_eq!(response.status, StatusCode::OK);
        response.body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn create_post(&self, token: &str, body: Value) -> Value {
        let response = self
            .request(Method::POST, "/posts/", Some(token), Some(body))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        response.body
    }
}
