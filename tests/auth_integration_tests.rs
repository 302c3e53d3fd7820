mod common;

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, Method, Request, header, request::Parts},
};
use chrono::Duration;
use common::{TEST_JWT_SECRET, spawn_app};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use postbox_api::{
    AppError, TokenService,
    auth::{AuthUser, resolve_active_user},
    credentials,
    models::RegisterUserRequest,
    repository::Database,
};
use serde::Serialize;

// --- Helper Functions ---

fn get_request_parts(authorization: Option<&str>) -> Parts {
    let mut builder = Request::builder().method(Method::GET).uri("/");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    }
    let (parts, _) = builder.body(axum::body::Body::empty()).unwrap().into_parts();
    parts
}

async fn seed_user(app: &common::TestApp, username: &str) {
    let session = app.db.session().await.unwrap();
    credentials::register(
        &*session,
        &app.state.hasher,
        RegisterUserRequest {
            username: username.to_string(),
            password: "pw".to_string(),
            email: None,
            full_name: None,
        },
    )
    .await
    .unwrap();
}

// --- Extractor Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_token() {
    let app = spawn_app();
    seed_user(&app, "alice").await;
    let token = app.state.tokens.issue("alice").unwrap();

    let mut parts = get_request_parts(Some(&format!("Bearer {}", token)));
    let auth_user = AuthUser::from_request_parts(&mut parts, &app.state).await;

    let AuthUser(user) = auth_user.unwrap();
    assert_eq!(user.username, "alice");
    assert!(!user.disabled);
}

#[tokio::test]
async fn test_auth_scheme_is_case_insensitive() {
    let app = spawn_app();
    seed_user(&app, "alice").await;
    let token = app.state.tokens.issue("alice").unwrap();

    let mut parts = get_request_parts(Some(&format!("bearer {}", token)));
    assert!(AuthUser::from_request_parts(&mut parts, &app.state).await.is_ok());
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app = spawn_app();

    let mut parts = get_request_parts(None);
    let auth_user = AuthUser::from_request_parts(&mut parts, &app.state).await;

    assert!(matches!(auth_user.unwrap_err(), AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_auth_failure_with_other_scheme() {
    let app = spawn_app();
    seed_user(&app, "alice").await;
    let token = app.state.tokens.issue("alice").unwrap();

    let mut parts = get_request_parts(Some(&format!("Basic {}", token)));
    let auth_user = AuthUser::from_request_parts(&mut parts, &app.state).await;

    assert!(matches!(auth_user.unwrap_err(), AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_auth_failure_for_unknown_subject() {
    let app = spawn_app();
    let token = app.state.tokens.issue("ghost").unwrap();

    let mut parts = get_request_parts(Some(&format!("Bearer {}", token)));
    let auth_user = AuthUser::from_request_parts(&mut parts, &app.state).await;

    assert!(matches!(auth_user.unwrap_err(), AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_auth_rejects_disabled_user() {
    let app = spawn_app();
    seed_user(&app, "alice").await;
    app.db.set_user_disabled("alice", true).await;
    let token = app.state.tokens.issue("alice").unwrap();

    let mut parts = get_request_parts(Some(&format!("Bearer {}", token)));
    let auth_user = AuthUser::from_request_parts(&mut parts, &app.state).await;

    assert!(matches!(auth_user.unwrap_err(), AppError::InactiveUser));
}

// --- Token Validation ---

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = spawn_app();
    seed_user(&app, "alice").await;
    let token = app
        .state
        .tokens
        .issue_with_ttl("alice", Duration::seconds(-1))
        .unwrap();

    let session = app.db.session().await.unwrap();
    let result = resolve_active_user(&app.state.tokens, &*session, &token).await;

    assert!(matches!(result.unwrap_err(), AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_tampered_token_is_rejected() {
    let tokens = TokenService::new(TEST_JWT_SECRET, Duration::minutes(30));
    let alice = tokens.issue("alice").unwrap();
    let bob = tokens.issue("bob").unwrap();

    // Bob's claims under Alice's signature.
    let alice_parts: Vec<&str> = alice.split('.').collect();
    let bob_parts: Vec<&str> = bob.split('.').collect();
    let forged = format!("{}.{}.{}", alice_parts[0], bob_parts[1], alice_parts[2]);

    assert!(tokens.validate(&alice).is_ok());
    assert!(tokens.validate(&forged).is_err());
}

#[tokio::test]
async fn test_token_from_other_secret_is_rejected() {
    let ours = TokenService::new(TEST_JWT_SECRET, Duration::minutes(30));
    let theirs = TokenService::new("some-other-secret", Duration::minutes(30));

    let token = theirs.issue("alice").unwrap();

    assert!(ours.validate(&token).is_err());
}

#[tokio::test]
async fn test_token_without_subject_is_rejected() {
    #[derive(Serialize)]
    struct NoSubject {
        exp: i64,
    }

    let tokens = TokenService::new(TEST_JWT_SECRET, Duration::minutes(30));
    let exp = (chrono::Utc::now() + Duration::minutes(5)).timestamp();
    let token = encode(
        &Header::default(),
        &NoSubject { exp },
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();

    assert!(matches!(
        tokens.validate(&token).unwrap_err(),
        AppError::Unauthorized(_)
    ));
}

#[tokio::test]
async fn test_token_ttl_follows_config() {
    let app = spawn_app();
    let token = app.state.tokens.issue("alice").unwrap();

    let claims = decode::<serde_json::Value>(
        &token,
        &DecodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .unwrap()
    .claims;

    let ttl = claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap();
    assert_eq!(ttl, 30 * 60);
}
