use crate::{
    config::AppConfig,
    error::{AppError, Result},
    models::{CreatePostRequest, NewUser, Post, UpdatePostRequest, UserRecord},
};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use sqlx::{PgPool, Postgres, pool::PoolConnection, postgres::PgPoolOptions};
use std::{ops::Deref, sync::Arc};
use tokio::sync::Mutex;

/// Repository Trait
///
/// The persistence operations available to one request. Implementations are handed
/// out per request by a [`Database`] and released when the request ends.
///
/// Ownership rules live in the queries: update and delete only match rows whose
/// `author_id` is the caller's id.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---
    async fn get_user(&self, username: &str) -> Result<Option<UserRecord>>;
    // Conflict if the username or email is already taken.
    async fn create_user(&self, user: NewUser) -> Result<UserRecord>;

    // --- Post Store ---
    async fn create_post(&self, req: CreatePostRequest, author_id: i64) -> Result<Post>;
    // Caller's posts in insertion order, offset by `skip`.
    async fn list_posts(&self, author_id: i64, skip: u32) -> Result<Vec<Post>>;
    // Unscoped lookup by id.
    async fn get_post(&self, id: i64) -> Result<Option<Post>>;
    // Owner-only. Only `Some` fields of `req` are written.
    async fn update_post(
        &self,
        id: i64,
        author_id: i64,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>>;
    // Owner-only. Returns true if a row was removed.
    async fn delete_post(&self, id: i64, author_id: i64) -> Result<bool>;
}

/// RepositoryState
///
/// A request-scoped repository session.
pub type RepositoryState = Arc<dyn Repository>;

/// Database Trait
///
/// Source of request-scoped [`Repository`] sessions.
#[async_trait]
pub trait Database: Send + Sync {
    async fn session(&self) -> Result<RepositoryState>;
}

/// DatabaseState
///
/// The shared handle stored in the application state.
pub type DatabaseState = Arc<dyn Database>;

/// DbSession Extractor
///
/// Opens one repository session per request. The first extractor to ask for it
/// (usually the authorizer) acquires it and caches it in the request extensions, so
/// the handler reuses the same session. It is released when the request is dropped,
/// whatever the outcome.
#[derive(Clone)]
pub struct DbSession(pub RepositoryState);

impl Deref for DbSession {
    type Target = dyn Repository;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for DbSession
where
    S: Send + Sync,
    DatabaseState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        if let Some(session) = parts.extensions.get::<DbSession>() {
            return Ok(session.clone());
        }

        let database = DatabaseState::from_ref(state);
        let session = DbSession(database.session().await?);
        parts.extensions.insert(session.clone());
        Ok(session)
    }
}

// --- Postgres ---

const USER_COLUMNS: &str = "id, username, email, full_name, hashed_password, disabled";
const POST_COLUMNS: &str = "id, title, description, completed, author_id";

/// PostgresDatabase
///
/// Owns the connection pool. Each session checks out one pooled connection.
#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the pool from configuration.
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.db_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn session(&self) -> Result<RepositoryState> {
        let conn = self.pool.acquire().await?;
        Ok(Arc::new(PostgresRepository {
            conn: Mutex::new(conn),
        }))
    }
}

/// PostgresRepository
///
/// A session bound to a single pooled connection, returned to the pool on drop.
pub struct PostgresRepository {
    conn: Mutex<PoolConnection<Postgres>>,
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, username: &str) -> Result<Option<UserRecord>> {
        let mut conn = self.conn.lock().await;
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, UserRecord>(&query)
            .bind(username)
            .fetch_optional(&mut **conn)
            .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// Unique violations (a concurrent registration won the race) surface as Conflict.
    async fn create_user(&self, user: NewUser) -> Result<UserRecord> {
        let mut conn = self.conn.lock().await;
        let query = format!(
            "INSERT INTO users (username, email, full_name, hashed_password, disabled) \
             VALUES ($1, $2, $3, $4, false) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(&user.hashed_password)
            .fetch_one(&mut **conn)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    if db.constraint().is_some_and(|c| c.contains("email")) {
                        AppError::Conflict("Email already registered".to_string())
                    } else {
                        AppError::Conflict("Username already registered".to_string())
                    }
                }
                other => AppError::Database(other),
            })
    }

    async fn create_post(&self, req: CreatePostRequest, author_id: i64) -> Result<Post> {
        let mut conn = self.conn.lock().await;
        let query = format!(
            "INSERT INTO posts (title, description, completed, author_id) \
             VALUES ($1, $2, $3, $4) RETURNING {POST_COLUMNS}"
        );
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(req.title)
            .bind(req.description)
            .bind(req.completed)
            .bind(author_id)
            .fetch_one(&mut **conn)
            .await?;
        Ok(post)
    }

    async fn list_posts(&self, author_id: i64, skip: u32) -> Result<Vec<Post>> {
        let mut conn = self.conn.lock().await;
        let query = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE author_id = $1 ORDER BY id OFFSET $2"
        );
        let posts = sqlx::query_as::<_, Post>(&query)
            .bind(author_id)
            .bind(i64::from(skip))
            .fetch_all(&mut **conn)
            .await?;
        Ok(posts)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let mut conn = self.conn.lock().await;
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(&mut **conn)
            .await?;
        Ok(post)
    }

    /// update_post
    ///
    /// `COALESCE` keeps the stored value for every field left as `None`.
    async fn update_post(
        &self,
        id: i64,
        author_id: i64,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>> {
        let mut conn = self.conn.lock().await;
        let query = format!(
            "UPDATE posts \
             SET title = COALESCE($3, title), \
                 description = COALESCE($4, description), \
                 completed = COALESCE($5, completed) \
             WHERE id = $1 AND author_id = $2 \
             RETURNING {POST_COLUMNS}"
        );
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(author_id)
            .bind(req.title)
            .bind(req.description)
            .bind(req.completed)
            .fetch_optional(&mut **conn)
            .await?;
        Ok(post)
    }

    async fn delete_post(&self, id: i64, author_id: i64) -> Result<bool> {
        let mut conn = self.conn.lock().await;
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(id)
            .bind(author_id)
            .execute(&mut **conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
