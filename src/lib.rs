use axum::{
    extract::{FromRef, Request},
    http::HeaderName,
    Router,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod password;
pub mod repository;
pub mod token;

// Routing split by access level (public, authenticated).
pub mod routes;
use routes::{authenticated, public};
use auth::AuthUser;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use memory::MemoryDatabase;
pub use password::PasswordHasher;
pub use repository::{DatabaseState, PostgresDatabase};
pub use token::TokenService;

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json`
/// and browsable under `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::register_user, handlers::get_me, handlers::logout,
        handlers::create_post, handlers::list_posts, handlers::get_post,
        handlers::update_post, handlers::delete_post
    ),
    components(
        schemas(
            models::User, models::Post, models::RegisterUserRequest, models::LoginForm,
            models::CreatePostRequest, models::UpdatePostRequest, models::TokenResponse,
            models::DetailResponse,
        )
    ),
    tags(
        (name = "postbox", description = "Authenticated personal posts API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable state handed to every request. The per-request store
/// session is not part of it; see [`repository::DbSession`].
#[derive(Clone)]
pub struct AppState {
    /// Source of request-scoped repository sessions.
    pub db: DatabaseState,
    /// Signs and validates bearer tokens with the configured secret.
    pub tokens: TokenService,
    pub hasher: PasswordHasher,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the state, deriving the token service and hasher from `config`.
    pub fn new(config: AppConfig, db: DatabaseState) -> Self {
        Self {
            db,
            tokens: TokenService::from_config(&config),
            hasher: PasswordHasher::new(config.bcrypt_cost),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for DatabaseState {
    fn from_ref(app_state: &AppState) -> DatabaseState {
        app_state.db.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated routes. Resolving `AuthUser` rejects the request with
/// the authorizer's error before any handler runs; on success the identity is
/// stored in the request extensions so handlers do not resolve it twice.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// create_router
///
/// Assembles the routes, the auth layer, observability layers and CORS.
pub fn create_router(state: AppState) -> Router {
    // Single configured origin. Credentials are allowed, so methods and headers
    // are mirrored instead of wildcarded.
    let cors = CorsLayer::new()
        .allow_origin(state.config.cors_origin.clone())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware
                ))
        )
        .with_state(state);

    base_router
        .layer(
             ServiceBuilder::new()
                 .layer(SetRequestIdLayer::new(
                     x_request_id.clone(),
                     MakeRequestUuid,
                 ))
                 .layer(
                     TraceLayer::new_for_http()
                         .make_span_with(trace_span_logger)
                         .on_response(
                             DefaultOnResponse::new()
                                 .level(Level::INFO)
                                 .latency_unit(tower_http::LatencyUnit::Millis)
                         )
                 )
                 .layer(PropagateRequestIdLayer::new(x_request_id))
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the `http_request` span for `TraceLayer`, tagged with the request id so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
