use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// AppError
///
/// The single failure type shared by the repository, the auth services and the handlers.
/// Every variant renders as `{"detail": "..."}` so clients see one error shape.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad, missing or expired bearer token, or bad login credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// The token resolved to an account flagged as disabled.
    #[error("Inactive user")]
    InactiveUser,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Malformed JSON body, form, path segment or query string.
    #[error("{detail}")]
    InvalidRequest { status: StatusCode, detail: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// The rejection used for any token that fails validation.
    pub fn invalid_token() -> Self {
        AppError::Unauthorized("Could not validate credentials".to_string())
    }

    pub fn post_not_found() -> Self {
        AppError::NotFound("Post not found".to_string())
    }
}

macro_rules! invalid_request_from {
    ($($rejection:ty),*) => {
        $(impl From<$rejection> for AppError {
            fn from(rejection: $rejection) -> Self {
                AppError::InvalidRequest {
                    status: rejection.status(),
                    detail: rejection.body_text(),
                }
            }
        })*
    };
}

invalid_request_from!(JsonRejection, FormRejection, PathRejection, QueryRejection);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            // Disabled accounts are reported as a client error, not 403.
            AppError::InactiveUser => (StatusCode::BAD_REQUEST, "Inactive user".to_string()),
            AppError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidRequest { status, detail } => (status, detail),
            AppError::Jwt(ref e) => {
                tracing::debug!("JWT error: {:?}", e);
                (
                    StatusCode::UNAUTHORIZED,
                    "Could not validate credentials".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::Migration(ref e) => {
                tracing::error!("Migration error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::Bcrypt(ref e) => {
                tracing::error!("Bcrypt error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Password error".to_string(),
                )
            }
            AppError::Task(ref e) => {
                tracing::error!("Blocking task failed: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let mut response = (status, Json(json!({ "detail": detail }))).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer"),
            );
        }

        response
    }
}
