use crate::{
    AppState,
    auth::AuthUser,
    credentials,
    error::AppError,
    models::{
        CreatePostRequest, DetailResponse, ListPostsQuery, LoginForm, Post, RegisterUserRequest,
        TokenResponse, UpdatePostRequest, User,
    },
    extract::{Form, Json, Path, Query},
    repository::DbSession,
};
use axum::extract::State;

// --- Auth Handlers ---

/// login
///
/// [Public Route] Exchanges form-encoded credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/token",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 422, description = "Malformed form", body = DetailResponse),
        (status = 401, description = "Incorrect username or password", body = DetailResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    DbSession(repo): DbSession,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = credentials::authenticate(&*repo, &state.hasher, &form.username, &form.password)
        .await?
        .ok_or_else(|| {
            tracing::debug!(username = %form.username, "login rejected");
            AppError::Unauthorized("Incorrect username or password".to_string())
        })?;

    let access_token = state.tokens.issue(&user.username)?;
    Ok(Json(TokenResponse::bearer(access_token)))
}

/// register_user
///
/// [Public Route] Creates an account. The password hash never leaves the server.
#[utoipa::path(
    post,
    path = "/register/",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "Registered", body = User),
        (status = 400, description = "Username already registered", body = DetailResponse)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    DbSession(repo): DbSession,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<Json<User>, AppError> {
    let user = credentials::register(&*repo, &state.hasher, payload).await?;
    Ok(Json(user))
}

/// get_me
///
/// [Authenticated Route] Returns the caller's own account.
#[utoipa::path(
    get,
    path = "/users/me/",
    responses((status = 200, description = "Current user", body = User))
)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// logout
///
/// [Public Route] Tokens are stateless, so there is nothing to revoke.
#[utoipa::path(
    get,
    path = "/logout/",
    responses((status = 200, description = "Logged out", body = DetailResponse))
)]
pub async fn logout() -> Json<DetailResponse> {
    Json(DetailResponse::new("Logout successful"))
}

// --- Post Handlers ---

/// create_post
///
/// [Authenticated Route] The author is always the caller.
#[utoipa::path(
    post,
    path = "/posts/",
    request_body = CreatePostRequest,
    responses(
        (status = 200, description = "Created", body = Post),
        (status = 422, description = "Malformed body", body = DetailResponse)
    )
)]
pub async fn create_post(
    user: AuthUser,
    DbSession(repo): DbSession,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<Post>, AppError> {
    let post = repo.create_post(payload, user.id()).await?;
    tracing::debug!(post_id = post.id, author_id = post.author_id, "post created");
    Ok(Json(post))
}

/// list_posts
///
/// [Authenticated Route] Lists only the caller's posts, skipping the first `skip`.
#[utoipa::path(
    get,
    path = "/posts/",
    params(ListPostsQuery),
    responses((status = 200, description = "Caller's posts", body = [Post]))
)]
pub async fn list_posts(
    user: AuthUser,
    DbSession(repo): DbSession,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<Vec<Post>>, AppError> {
    let posts = repo.list_posts(user.id(), query.skip).await?;
    Ok(Json(posts))
}

/// get_post
///
/// [Authenticated Route] Fetches one post. Posts owned by someone else are reported
/// exactly like missing ones.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 404, description = "Post not found", body = DetailResponse)
    )
)]
pub async fn get_post(
    user: AuthUser,
    DbSession(repo): DbSession,
    Path(id): Path<i64>,
) -> Result<Json<Post>, AppError> {
    match repo.get_post(id).await? {
        Some(post) if post.author_id == user.id() => Ok(Json(post)),
        Some(post) => {
            tracing::warn!(
                post_id = id,
                owner_id = post.author_id,
                caller_id = user.id(),
                "read of another user's post refused"
            );
            Err(AppError::post_not_found())
        }
        None => Err(AppError::post_not_found()),
    }
}

/// update_post
///
/// [Authenticated Route] Partial update; owner-only, enforced in the repository query.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 404, description = "Post not found", body = DetailResponse)
    )
)]
pub async fn update_post(
    user: AuthUser,
    DbSession(repo): DbSession,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    repo.update_post(id, user.id(), payload)
        .await?
        .map(Json)
        .ok_or_else(AppError::post_not_found)
}

/// delete_post
///
/// [Authenticated Route] Owner-only delete.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted", body = DetailResponse),
        (status = 404, description = "Post not found", body = DetailResponse)
    )
)]
pub async fn delete_post(
    user: AuthUser,
    DbSession(repo): DbSession,
    Path(id): Path<i64>,
) -> Result<Json<DetailResponse>, AppError> {
    if repo.delete_post(id, user.id()).await? {
        tracing::debug!(post_id = id, "post deleted");
        Ok(Json(DetailResponse::new("Post deleted")))
    } else {
        Err(AppError::post_not_found())
    }
}
