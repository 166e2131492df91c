//! Access control for the account views.
//!
//! Every place that decides whether a principal may see account data goes
//! through [`AccessPolicy::evaluate`], so the view gate and the collection
//! scoping can never disagree.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::warn;
use utoipa::ToSchema;

/// The authenticated entity associated with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Principal {
    /// Account ID
    pub id: i32,
    /// Account username
    pub username: String,
    /// Staff flag at the time the request was made
    pub is_staff: bool,
    /// Superuser flag at the time the request was made
    pub is_superuser: bool,
}

/// Which requests may see the account list and detail pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum AccessMode {
    /// Everybody, including anonymous requests.
    #[default]
    None,
    /// Any logged-in principal.
    Authenticated,
    /// Principals with the staff flag.
    Staff,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::None => "none",
            AccessMode::Authenticated => "authenticated",
            AccessMode::Staff => "staff",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown values fall back to [`AccessMode::None`]; an empty setting has
/// always meant "no restriction".
impl From<&str> for AccessMode {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "authenticated" => AccessMode::Authenticated,
            "staff" => AccessMode::Staff,
            "" | "none" => AccessMode::None,
            other => {
                warn!("Unknown access mode '{}', access is not restricted", other);
                AccessMode::None
            }
        }
    }
}

impl From<String> for AccessMode {
    fn from(value: String) -> Self {
        AccessMode::from(value.as_str())
    }
}

/// Why a request was turned away.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("Permission denied: you must login to access.")]
    LoginRequired,

    #[error("Permission denied: only staff users can access.")]
    StaffRequired,
}

impl AccessDenied {
    /// Machine readable code used in JSON error responses.
    pub fn code(&self) -> &'static str {
        match self {
            AccessDenied::LoginRequired => "LOGIN_REQUIRED",
            AccessDenied::StaffRequired => "STAFF_REQUIRED",
        }
    }
}

/// Decides whether a principal may proceed.
pub trait AccessPolicy: Send + Sync + fmt::Debug {
    fn evaluate(&self, principal: Option<&Principal>) -> Result<(), AccessDenied>;
}

impl AccessPolicy for AccessMode {
    fn evaluate(&self, principal: Option<&Principal>) -> Result<(), AccessDenied> {
        match (self, principal) {
            (AccessMode::None, _) => Ok(()),
            (AccessMode::Authenticated, None) => Err(AccessDenied::LoginRequired),
            (AccessMode::Authenticated, Some(_)) => Ok(()),
            (AccessMode::Staff, Some(p)) if p.is_staff => Ok(()),
            (AccessMode::Staff, _) => Err(AccessDenied::StaffRequired),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(is_staff: bool) -> Principal {
        Principal {
            id: 1,
            username: "jane".to_string(),
            is_staff,
            is_superuser: false,
        }
    }

    #[test]
    fn none_permits_everybody() {
        assert_eq!(AccessMode::None.evaluate(None), Ok(()));
        assert_eq!(AccessMode::None.evaluate(Some(&principal(false))), Ok(()));
        assert_eq!(AccessMode::None.evaluate(Some(&principal(true))), Ok(()));
    }

    #[test]
    fn authenticated_requires_a_principal() {
        let denied = AccessMode::Authenticated.evaluate(None).unwrap_err();
        assert_eq!(denied, AccessDenied::LoginRequired);
        assert!(denied.to_string().contains("must login"));
        assert_eq!(AccessMode::Authenticated.evaluate(Some(&principal(false))), Ok(()));
    }

    #[test]
    fn staff_requires_the_staff_flag() {
        let denied = AccessMode::Staff.evaluate(Some(&principal(false))).unwrap_err();
        assert_eq!(denied, AccessDenied::StaffRequired);
        assert!(denied.to_string().contains("only staff users"));
        assert_eq!(AccessMode::Staff.evaluate(None), Err(AccessDenied::StaffRequired));
        assert_eq!(AccessMode::Staff.evaluate(Some(&principal(true))), Ok(()));
    }

    #[test]
    fn parsing_is_lenient() {
        assert_eq!(AccessMode::from("staff"), AccessMode::Staff);
        assert_eq!(AccessMode::from(" Authenticated "), AccessMode::Authenticated);
        assert_eq!(AccessMode::from(""), AccessMode::None);
        assert_eq!(AccessMode::from("admins-only"), AccessMode::None);

        let mode: AccessMode = serde_json::from_str("\"staff\"").unwrap();
        assert_eq!(mode, AccessMode::Staff);
        assert_eq!(serde_json::to_string(&AccessMode::Authenticated).unwrap(), "\"authenticated\"");
    }
}
