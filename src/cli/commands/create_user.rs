use anyhow::{Context, Result, bail};
use chrono::Utc;
use model::entities::account::{self, validate_username};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, Set};
use tracing::{debug, info, trace};

use crate::auth::hash_password;

/// Account to be created from the command line.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

pub async fn create_user(database_url: &str, user: NewUser) -> Result<()> {
    trace!("Entering create_user function");
    let db = Database::connect(database_url)
        .await
        .with_context(|| format!("Failed to connect to database '{}'", database_url))?;

    let created = insert_user(&db, user).await?;
    info!(
        "Created account {} (id {}, staff: {}, superuser: {})",
        created.username, created.id, created.is_staff, created.is_superuser
    );
    Ok(())
}

pub(crate) async fn insert_user<C: ConnectionTrait>(db: &C, user: NewUser) -> Result<account::Model> {
    if let Err(e) = validate_username(&user.username) {
        bail!("Invalid username '{}': {}", user.username, e);
    }
    let password = hash_password(&user.password)?;
    debug!("Password hashed for {}", user.username);

    let model = account::ActiveModel {
        username: Set(user.username.clone()),
        password: Set(password),
        email: Set(user.email),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        is_staff: Set(user.is_staff),
        is_superuser: Set(user.is_superuser),
        is_active: Set(true),
        last_login: Set(None),
        date_joined: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .with_context(|| format!("Failed to create account '{}'", user.username))?;

    Ok(model)
}
