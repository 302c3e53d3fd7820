//! Token service: issues and validates HS256 bearer tokens.

use crate::{
    config::{self, AppConfig},
    error::{AppError, Result},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Claims
///
/// Payload carried inside every access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the username the token was issued to. Tokens without one are rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiration time (unix seconds). Always set.
    pub exp: i64,
    /// Issued at (unix seconds).
    #[serde(default)]
    pub iat: i64,
}

/// TokenService
///
/// Holds the signing keys derived from the configured secret. One secret and one
/// algorithm for the lifetime of the process.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Falls back to 30 minutes if the configured lifetime is out of range;
    /// `AppConfig::load` already refuses such values.
    pub fn from_config(config: &AppConfig) -> Self {
        let ttl = config::access_token_ttl(config.access_token_ttl_minutes).unwrap_or_else(|| {
            tracing::warn!(
                minutes = config.access_token_ttl_minutes,
                "access token lifetime out of range, using 30 minutes"
            );
            Duration::minutes(30)
        });
        Self::new(&config.jwt_secret, ttl)
    }

    /// Issue a token for `subject` with the configured lifetime.
    pub fn issue(&self, subject: &str) -> Result<String> {
        self.issue_with_ttl(subject, self.ttl)
    }

    pub fn issue_with_ttl(&self, subject: &str, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let exp = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let claims = Claims {
            sub: Some(subject.to_string()),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// validate
    ///
    /// Returns the token's subject. Fails with "Could not validate credentials" on a bad
    /// signature, an undecodable payload, a missing subject, or `now >= exp`.
    pub fn validate(&self, token: &str) -> Result<String> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!("token rejected: {:?}", e.kind());
                AppError::invalid_token()
            })?
            .claims;

        // The library accepts exp == now; the token contract does not.
        if Utc::now().timestamp() >= claims.exp {
            return Err(AppError::invalid_token());
        }

        match claims.sub {
            Some(sub) if !sub.is_empty() => Ok(sub),
            _ => Err(AppError::invalid_token()),
        }
    }
}
