use crate::{AppState, handlers};
use axum::{
    Router,
    routing::get,
};

/// Authenticated Router Module
///
/// Every route here sits behind the auth middleware, so handlers always receive a
/// resolved, active `AuthUser`. Post operations are scoped to that user.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /users/me/
        .route("/users/me/", get(handlers::get_me))
        // GET /posts/?skip=N | POST /posts/
        // List the caller's posts, or create one owned by the caller.
        .route(
            "/posts/",
            get(handlers::list_posts).post(handlers::create_post),
        )
        // GET/PUT/DELETE /posts/{id}
        // 404 for ids that do not exist or belong to another user.
        .route(
            "/posts/{id}",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
}
