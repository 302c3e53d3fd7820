use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};

use crate::{
    error::{AppError, Result},
    models::User,
    repository::{DatabaseState, DbSession, Repository},
    token::TokenService,
};

/// AuthUser Extractor Result
///
/// The resolved, active account behind a request's bearer token.
/// Handlers use it to scope every post operation to its owner.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

/// resolve_active_user
///
/// The single authorization step: validates the token, loads the subject's account
/// and rejects disabled accounts.
///
/// - invalid token or unknown subject: Unauthorized
/// - `disabled = true`: InactiveUser
pub async fn resolve_active_user(
    tokens: &TokenService,
    repo: &dyn Repository,
    token: &str,
) -> Result<User> {
    let username = tokens.validate(token)?;

    let user = repo.get_user(&username).await?.ok_or_else(|| {
        tracing::debug!(%username, "token subject has no account");
        AppError::invalid_token()
    })?;

    if user.disabled {
        tracing::warn!(user_id = user.id, "rejected token of disabled account");
        return Err(AppError::InactiveUser);
    }

    Ok(user.into())
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
/// The scheme is matched case-insensitively.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// AuthUser Extractor Implementation
///
/// 1. Reuses an identity already resolved by the auth middleware for this request.
/// 2. Extracts the bearer token.
/// 3. Resolves it through [`resolve_active_user`] on the request's [`DbSession`].
///
/// Rejection: the [`AppError`] of the failing step (401 or 400).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    DatabaseState: FromRef<S>,
    TokenService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let token = bearer_token(parts)
            .ok_or_else(AppError::invalid_token)?
            .to_string();

        let tokens = TokenService::from_ref(state);
        let session = DbSession::from_request_parts(parts, state).await?;

        let user = resolve_active_user(&tokens, &*session, &token).await?;
        Ok(AuthUser(user))
    }
}
