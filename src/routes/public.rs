use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token. Everything a client does before it holds a
/// token lives here.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers and monitoring.
        .route("/health", get(|| async { "ok" }))
        // POST /token
        // OAuth2 password-flow login: form-encoded username/password in,
        // `{access_token, token_type: "bearer"}` out.
        .route("/token", post(handlers::login))
        // POST /register/
        // Creates an account. 400 if the username is already registered.
        .route("/register/", post(handlers::register_user))
        // GET /logout/
        // Stateless no-op; the client simply discards its token.
        .route("/logout/", get(handlers::logout))
}
