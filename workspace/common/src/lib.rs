//! Common transport-layer types shared between the HTTP handlers, the views
//! and API clients.

mod access;

pub use access::{AccessDenied, AccessMode, AccessPolicy, Principal};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ===================== Accounts =====================

/// Public representation of an account. The password hash is never included.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct AccountDto {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// `first_name` and `last_name` joined with a space
    pub full_name: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    /// Canonical page of the account
    pub url: String,
}

// ===================== Sessions =====================

/// Credentials for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Issued session. Send the token as `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct SessionDto {
    pub token: String,
    pub account: AccountDto,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_shape() {
        let request: LoginRequest =
            serde_json::from_str(r#"{"username": "jane", "password": "secret"}"#).unwrap();
        assert_eq!(request.username, "jane");
        assert_eq!(request.password, "secret");
    }
}
