use crate::{
    error::{AppError, Result},
    models::{CreatePostRequest, NewUser, Post, UpdatePostRequest, UserRecord},
    repository::{Database, Repository, RepositoryState},
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    users: Vec<UserRecord>,
    // Kept in insertion order.
    posts: Vec<Post>,
    last_user_id: i64,
    last_post_id: i64,
}

/// MemoryDatabase
///
/// In-process stand-in for Postgres with the same uniqueness and ownership rules.
/// Used by the test suite and for running the API without a database.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the `disabled` flag of an account. Returns false if no such user exists.
    pub async fn set_user_disabled(&self, username: &str, disabled: bool) -> bool {
        let mut tables = self.tables.lock().await;
        match tables.users.iter_mut().find(|u| u.username == username) {
            Some(user) => {
                user.disabled = disabled;
                true
            }
            None => false,
        }
    }

    pub async fn post_count(&self) -> usize {
        self.tables.lock().await.posts.len()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn session(&self) -> Result<RepositoryState> {
        Ok(Arc::new(MemoryRepository {
            tables: self.tables.clone(),
        }))
    }
}

pub struct MemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_user(&self, username: &str) -> Result<Option<UserRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<UserRecord> {
        let mut tables = self.tables.lock().await;

        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(AppError::Conflict("Username already registered".to_string()));
        }
        if user.email.is_some() && tables.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        tables.last_user_id += 1;
        let record = UserRecord {
            id: tables.last_user_id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            hashed_password: user.hashed_password,
            disabled: false,
        };
        tables.users.push(record.clone());
        Ok(record)
    }

    async fn create_post(&self, req: CreatePostRequest, author_id: i64) -> Result<Post> {
        let mut tables = self.tables.lock().await;
        tables.last_post_id += 1;
        let post = Post {
            id: tables.last_post_id,
            title: req.title,
            description: req.description,
            completed: req.completed,
            author_id,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn list_posts(&self, author_id: i64, skip: u32) -> Result<Vec<Post>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .posts
            .iter()
            .filter(|p| p.author_id == author_id)
            .skip(skip as usize)
            .cloned()
            .collect())
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let tables = self.tables.lock().await;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn update_post(
        &self,
        id: i64,
        author_id: i64,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .posts
            .iter_mut()
            .find(|p| p.id == id && p.author_id == author_id)
            .map(|post| {
                req.apply_to(post);
                post.clone()
            }))
    }

    async fn delete_post(&self, id: i64, author_id: i64) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.posts.len();
        tables
            .posts
            .retain(|p| !(p.id == id && p.author_id == author_id));
        Ok(tables.posts.len() < before)
    }
}
