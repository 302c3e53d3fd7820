use crate::{
    error::{AppError, Result},
    models::{NewUser, RegisterUserRequest, User, UserRecord},
    password::PasswordHasher,
    repository::Repository,
};

/// register
///
/// Creates an active account with a hashed password and returns its public view.
/// Fails with Conflict when the username is taken. bcrypt runs on the blocking pool.
pub async fn register(
    repo: &dyn Repository,
    hasher: &PasswordHasher,
    req: RegisterUserRequest,
) -> Result<User> {
    if repo.get_user(&req.username).await?.is_some() {
        return Err(AppError::Conflict("Username already registered".to_string()));
    }

    let hasher = *hasher;
    let password = req.password;
    let hashed_password = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;
    let record = repo
        .create_user(NewUser {
            username: req.username,
            email: req.email,
            full_name: req.full_name,
            hashed_password,
        })
        .await?;

    tracing::info!(user_id = record.id, username = %record.username, "user registered");
    Ok(record.into())
}

/// authenticate
///
/// Returns the account if `password` matches its stored hash, `None` otherwise.
/// Unknown usernames and wrong passwords are indistinguishable to the caller.
pub async fn authenticate(
    repo: &dyn Repository,
    hasher: &PasswordHasher,
    username: &str,
    password: &str,
) -> Result<Option<UserRecord>> {
    let Some(user) = repo.get_user(username).await? else {
        return Ok(None);
    };

    let hasher = *hasher;
    let password = password.to_string();
    let hash = user.hashed_password.clone();
    let matches =
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await??;

    if matches {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}
