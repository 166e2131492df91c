use common::{AccountDto, LoginRequest, SessionDto};
use model::mail::Mailer;
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::auth::Session;
use crate::config::Settings;
use crate::handlers::accounts::{CreateAccountRequest, EmailAccountRequest, UpdateAccountRequest};
use crate::templates::TemplateRenderer;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Login sessions keyed by token
    pub sessions: Cache<String, Session>,
    /// HTML templates
    pub templates: Arc<TemplateRenderer>,
    /// Outgoing mail
    pub mailer: Arc<dyn Mailer>,
    /// Runtime settings
    pub settings: Arc<Settings>,
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: &str) -> Self {
        Self {
            error: error.into(),
            code: code.to_string(),
            success: false,
        }
    }
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
    /// Open login sessions (approximate)
    pub sessions: u64,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::accounts::create_account,
        crate::handlers::accounts::get_accounts,
        crate::handlers::accounts::get_account,
        crate::handlers::accounts::update_account,
        crate::handlers::accounts::deactivate_account,
        crate::handlers::accounts::email_account,
    ),
    components(
        schemas(
            ApiResponse<AccountDto>,
            ApiResponse<Vec<AccountDto>>,
            ApiResponse<SessionDto>,
            ApiResponse<String>,
            ErrorResponse,
            HealthResponse,
            AccountDto,
            LoginRequest,
            SessionDto,
            CreateAccountRequest,
            UpdateAccountRequest,
            EmailAccountRequest,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Login sessions"),
        (name = "accounts", description = "Account management endpoints"),
    ),
    info(
        title = "userhub API",
        description = "User accounts with access-controlled listing and search",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
