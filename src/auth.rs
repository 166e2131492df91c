//! Password hashing and login sessions.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use common::Principal;
use model::entities::account;
use sea_orm::{DbErr, EntityTrait};
use thiserror::Error;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::helpers::converters::account_to_principal;
use crate::schemas::AppState;

/// Stored in place of a hash for accounts that cannot log in with a password.
pub const UNUSABLE_PASSWORD: &str = "!";

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password must not be empty")]
    Empty,

    #[error("Failed to hash password: {0}")]
    Hash(String),
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Empty);
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a password against a stored hash. Unusable or malformed hashes never match.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    if password_hash.starts_with(UNUSABLE_PASSWORD) {
        return false;
    }

    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash cannot be parsed: {}", e);
            false
        }
    }
}

/// A login session kept in the session cache.
#[derive(Debug, Clone)]
pub struct Session {
    pub account_id: i32,
    pub created_at: DateTime<Utc>,
}

/// Open a session for `account` and return its token.
pub async fn start_session(state: &AppState, account: &account::Model) -> String {
    let token = Uuid::new_v4().simple().to_string();
    state
        .sessions
        .insert(
            token.clone(),
            Session {
                account_id: account.id,
                created_at: Utc::now(),
            },
        )
        .await;
    debug!("Started session for account {}", account.id);
    token
}

/// Close the session behind `token`. Returns whether one existed.
pub async fn end_session(state: &AppState, token: &str) -> bool {
    state.sessions.remove(token).await.is_some()
}

/// The token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve a session token to the principal it belongs to.
///
/// Sessions of accounts that were deactivated or removed in the meantime are dropped.
pub async fn principal_for_token(state: &AppState, token: &str) -> Result<Option<Principal>, DbErr> {
    let Some(session) = state.sessions.get(token).await else {
        trace!("Unknown session token");
        return Ok(None);
    };

    trace!("Session of account {} opened at {}", session.account_id, session.created_at);
    match account::Entity::find_by_id(session.account_id).one(&state.db).await? {
        Some(account) if account.is_active => Ok(Some(account_to_principal(&account))),
        _ => {
            debug!("Dropping session of unavailable account {}", session.account_id);
            state.sessions.invalidate(token).await;
            Ok(None)
        }
    }
}

/// The principal of the current request, `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Option<Principal>);

impl CurrentPrincipal {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentPrincipal {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(CurrentPrincipal(None));
        };

        match principal_for_token(state, token).await {
            Ok(principal) => Ok(CurrentPrincipal(principal)),
            Err(e) => {
                error!("Failed to resolve session: {}", e);
                Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to resolve session"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_unusable_and_malformed_hashes() {
        assert!(!verify_password("anything", UNUSABLE_PASSWORD));
        assert!(!verify_password("anything", "not-a-hash"));
        assert!(matches!(hash_password(""), Err(PasswordError::Empty)));
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
