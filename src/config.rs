use anyhow::Result;
use common::AccessMode;
use model::mail::LogMailer;
use moka::future::Cache;
use sea_orm::Database;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::schemas::AppState;
use crate::templates::TemplateRenderer;

/// Runtime settings.
///
/// Read from (lowest priority first) built-in defaults, an optional
/// `userhub.{toml,yaml,json}` file in the working directory and `USERHUB_*`
/// environment variables, e.g. `USERHUB_USERS_ACL_PERMISSION=staff`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Database URL
    pub database_url: String,
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Page size of list views; `None` disables pagination
    pub page_size: Option<u64>,
    /// Who may browse the account list and detail pages
    pub users_acl_permission: AccessMode,
    /// Idle lifetime of a login session in seconds
    pub session_ttl_secs: u64,
    /// Sender used when a message does not name one
    pub default_from_email: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://userhub.db?mode=rwc".to_string(),
            bind_address: "0.0.0.0:3000".to_string(),
            page_size: None,
            users_acl_permission: AccessMode::None,
            session_ttl_secs: 60 * 60 * 24 * 14,
            default_from_email: "webmaster@localhost".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the environment and the optional config file.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("userhub").required(false))
            .add_source(config::Environment::with_prefix("USERHUB"))
            .build()?
            .try_deserialize::<Settings>()?;

        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }
}

/// Initialize application state from settings
pub async fn initialize_app_state(settings: Settings) -> Result<AppState> {
    info!("Connecting to database: {}", settings.database_url);
    let db = Database::connect(&settings.database_url).await?;

    let sessions = Cache::builder()
        .max_capacity(10_000)
        .time_to_idle(Duration::from_secs(settings.session_ttl_secs))
        .build();

    let templates = TemplateRenderer::new()?;
    let mailer = LogMailer::new(settings.default_from_email.clone());

    info!(
        "Account views restricted to: {} (page size: {:?})",
        settings.users_acl_permission, settings.page_size
    );

    Ok(AppState {
        db,
        sessions,
        templates: Arc::new(templates),
        mailer: Arc::new(mailer),
        settings: Arc::new(settings),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.users_acl_permission, AccessMode::None);
        assert_eq!(settings.page_size, None);
        assert_eq!(settings.bind_address, "0.0.0.0:3000");
    }

    #[test]
    fn test_partial_source_keeps_defaults() {
        let settings = config::Config::builder()
            .set_override("users_acl_permission", "staff")
            .unwrap()
            .set_override("page_size", 25)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<Settings>()
            .unwrap();

        assert_eq!(settings.users_acl_permission, AccessMode::Staff);
        assert_eq!(settings.page_size, Some(25));
        assert_eq!(settings.default_from_email, "webmaster@localhost");
    }
}
