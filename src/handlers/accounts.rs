use crate::auth::{CurrentPrincipal, hash_password};
use crate::helpers::converters::account_to_dto;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use crate::views::AccessGate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::Utc;
use common::{AccessDenied, AccessMode, AccessPolicy, AccountDto, Principal};
use model::entities::account::{self, validate_username};
use model::mail::MailError;
use sea_orm::{ActiveModelTrait, DbErr, EntityTrait, QueryOrder, Select, Set, SqlErr};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidateEmail, ValidationError};

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn validate_username_field(username: &str) -> Result<(), ValidationError> {
    validate_username(username).map_err(|e| {
        let mut error = ValidationError::new("username");
        error.message = Some(e.to_string().into());
        error
    })
}

fn validate_blank_or_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() || email.validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email"))
    }
}

/// Request body for creating a new account
#[derive(Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateAccountRequest {
    /// Username (must be unique; letters, digits and @/./+/-/_)
    #[validate(custom(function = "validate_username_field"))]
    pub username: String,
    /// Plain text password, stored hashed
    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: String,
    #[validate(length(max = 30))]
    pub first_name: Option<String>,
    #[validate(length(max = 30))]
    pub last_name: Option<String>,
    #[validate(custom(function = "validate_blank_or_email"))]
    pub email: Option<String>,
    /// Only superusers may set this
    pub is_staff: Option<bool>,
    /// Only superusers may set this
    pub is_superuser: Option<bool>,
}

/// Request body for updating an account
#[derive(Deserialize, Serialize, ToSchema, Validate, Default)]
pub struct UpdateAccountRequest {
    #[validate(custom(function = "validate_username_field"))]
    pub username: Option<String>,
    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: Option<String>,
    #[validate(length(max = 30))]
    pub first_name: Option<String>,
    #[validate(length(max = 30))]
    pub last_name: Option<String>,
    #[validate(custom(function = "validate_blank_or_email"))]
    pub email: Option<String>,
    /// Only superusers may set this
    pub is_staff: Option<bool>,
    /// Only superusers may set this
    pub is_superuser: Option<bool>,
    /// Only superusers may set this
    pub is_active: Option<bool>,
}

/// Request body for sending a message to an account
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct EmailAccountRequest {
    #[validate(length(min = 1, max = 255))]
    pub subject: String,
    pub message: String,
    /// Sender; defaults to the configured address
    #[validate(email)]
    pub from_email: Option<String>,
}

/// Query parameters for the account list
#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct AccountListQuery {
    /// Page number (1-based)
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    /// Page size
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
}

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (status, Json(ErrorResponse::new(error, code)))
}

fn denied(denied: AccessDenied) -> ApiError {
    let status = match denied {
        AccessDenied::LoginRequired => StatusCode::UNAUTHORIZED,
        AccessDenied::StaffRequired => StatusCode::FORBIDDEN,
    };
    api_error(status, denied.to_string(), denied.code())
}

fn database_error(context: &str, db_error: DbErr) -> ApiError {
    error!("{}: {}", context, db_error);
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Internal server error while {}", context.to_lowercase()),
        "DATABASE_ERROR",
    )
}

fn forbidden(message: &str) -> ApiError {
    api_error(StatusCode::FORBIDDEN, message, "PERMISSION_DENIED")
}

fn ok<T>(status: StatusCode, data: T, message: &str) -> ApiResult<T> {
    Ok((
        status,
        Json(ApiResponse {
            data,
            message: message.to_string(),
            success: true,
        }),
    ))
}

/// Accounts ordered by username, the base collection of every account view.
pub fn ordered_accounts() -> Select<account::Entity> {
    account::Entity::find().order_by_asc(account::Column::Username)
}

fn account_gate(state: &AppState) -> AccessGate {
    AccessGate::new(state.settings.users_acl_permission)
}

async fn find_account(state: &AppState, account_id: i32) -> Result<account::Model, ApiError> {
    match account::Entity::find_by_id(account_id).one(&state.db).await {
        Ok(Some(account)) => Ok(account),
        Ok(None) => {
            warn!("Account with ID {} not found", account_id);
            Err(api_error(
                StatusCode::NOT_FOUND,
                format!("Account {} not found", account_id),
                "ACCOUNT_NOT_FOUND",
            ))
        }
        Err(db_error) => Err(database_error("Looking up account", db_error)),
    }
}

/// Staff may manage other accounts, but privileged ones only as a superuser.
fn may_manage(actor: &Principal, target: &account::Model) -> bool {
    if actor.is_superuser {
        return true;
    }
    if actor.id == target.id {
        return true;
    }
    actor.is_staff && !target.is_staff && !target.is_superuser
}

fn is_unique_violation(db_error: &DbErr) -> bool {
    matches!(db_error.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Create a new account
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    tag = "accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created successfully", body = ApiResponse<AccountDto>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Privileged flags require a superuser", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, principal, request), fields(username = %request.username))]
pub async fn create_account(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Valid(Json(request)): Valid<Json<CreateAccountRequest>>,
) -> ApiResult<AccountDto> {
    trace!("Entering create_account function");

    let wants_privileges = request.is_staff.unwrap_or(false) || request.is_superuser.unwrap_or(false);
    if wants_privileges && !principal.principal().is_some_and(|p| p.is_superuser) {
        warn!("Refusing to create privileged account without superuser principal");
        return Err(forbidden("Only superusers can create staff or superuser accounts"));
    }

    let password = hash_password(&request.password).map_err(|e| {
        error!("{}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password", "PASSWORD_ERROR")
    })?;

    let new_account = account::ActiveModel {
        username: Set(request.username.clone()),
        password: Set(password),
        first_name: Set(request.first_name.unwrap_or_default()),
        last_name: Set(request.last_name.unwrap_or_default()),
        email: Set(request.email.unwrap_or_default()),
        is_staff: Set(request.is_staff.unwrap_or(false)),
        is_superuser: Set(request.is_superuser.unwrap_or(false)),
        is_active: Set(true),
        last_login: Set(None),
        date_joined: Set(Utc::now()),
        ..Default::default()
    };

    trace!("Attempting to insert new account into database");
    match new_account.insert(&state.db).await {
        Ok(model) => {
            info!("Account created successfully with ID: {}, username: {}", model.id, model.username);
            ok(StatusCode::CREATED, account_to_dto(&model), "Account created successfully")
        }
        Err(db_error) if is_unique_violation(&db_error) => {
            warn!("Username '{}' already exists", request.username);
            Err(api_error(
                StatusCode::CONFLICT,
                format!("Username '{}' already exists", request.username),
                "USERNAME_ALREADY_EXISTS",
            ))
        }
        Err(db_error) => Err(database_error("Creating account", db_error)),
    }
}

/// Get all accounts visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    tag = "accounts",
    params(AccountListQuery),
    responses(
        (status = 200, description = "Accounts retrieved successfully", body = ApiResponse<Vec<AccountDto>>),
        (status = 401, description = "Login required", body = ErrorResponse),
        (status = 403, description = "Staff required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, principal))]
pub async fn get_accounts(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Valid(Query(query)): Valid<Query<AccountListQuery>>,
) -> ApiResult<Vec<AccountDto>> {
    trace!("Entering get_accounts function");
    let gate = account_gate(&state);
    gate.check(principal.principal()).map_err(denied)?;

    let page = query.page.unwrap_or(1);
    let limit = query.limit.or(state.settings.page_size).unwrap_or(50);
    debug!("Fetching accounts - page: {}, limit: {}", page, limit);

    let Some(offset) = (page - 1).checked_mul(limit) else {
        debug!("Page {} lies beyond any result set", page);
        return ok(StatusCode::OK, Vec::new(), "Accounts retrieved successfully");
    };

    let collection = gate.scope(ordered_accounts(), principal.principal());
    match collection.fetch(&state.db, offset, Some(limit)).await {
        Ok(accounts) => {
            info!("Successfully retrieved {} accounts", accounts.len());
            let data = accounts.iter().map(account_to_dto).collect();
            ok(StatusCode::OK, data, "Accounts retrieved successfully")
        }
        Err(db_error) => Err(database_error("Retrieving accounts", db_error)),
    }
}

/// Get a specific account by ID
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{account_id}",
    tag = "accounts",
    params(
        ("account_id" = i32, Path, description = "Account ID"),
    ),
    responses(
        (status = 200, description = "Account retrieved successfully", body = ApiResponse<AccountDto>),
        (status = 401, description = "Login required", body = ErrorResponse),
        (status = 403, description = "Staff required", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, principal))]
pub async fn get_account(
    Path(account_id): Path<i32>,
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> ApiResult<AccountDto> {
    trace!("Entering get_account function for account_id: {}", account_id);
    account_gate(&state).check(principal.principal()).map_err(denied)?;

    let account = find_account(&state, account_id).await?;
    info!("Successfully retrieved account {}", account.username);
    ok(StatusCode::OK, account_to_dto(&account), "Account retrieved successfully")
}

/// Update an account's profile
///
/// Accounts may update themselves; staff may update anyone. Flags are
/// reserved for superusers.
#[utoipa::path(
    put,
    path = "/api/v1/accounts/{account_id}",
    tag = "accounts",
    params(
        ("account_id" = i32, Path, description = "Account ID"),
    ),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated successfully", body = ApiResponse<AccountDto>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Login required", body = ErrorResponse),
        (status = 403, description = "Not allowed to change this account", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, principal, request))]
pub async fn update_account(
    Path(account_id): Path<i32>,
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Valid(Json(request)): Valid<Json<UpdateAccountRequest>>,
) -> ApiResult<AccountDto> {
    trace!("Entering update_account function for account_id: {}", account_id);

    let actor: &Principal = principal
        .principal()
        .ok_or_else(|| denied(AccessDenied::LoginRequired))?;

    if actor.id != account_id && !actor.is_staff {
        warn!("{} may not change account {}", actor.username, account_id);
        return Err(forbidden("You can only change your own account"));
    }
    let changes_flags =
        request.is_staff.is_some() || request.is_superuser.is_some() || request.is_active.is_some();
    if changes_flags && !actor.is_superuser {
        warn!("{} may not change account flags", actor.username);
        return Err(forbidden("Only superusers can change account flags"));
    }

    let existing = find_account(&state, account_id).await?;
    if !may_manage(actor, &existing) {
        warn!("{} may not change privileged account {}", actor.username, existing.username);
        return Err(forbidden("Only superusers can change staff or superuser accounts"));
    }
    let mut active: account::ActiveModel = existing.into();
    let mut updated_fields = Vec::new();

    if let Some(username) = request.username {
        updated_fields.push(format!("username: {}", username));
        active.username = Set(username);
    }
    if let Some(password) = request.password {
        let hashed = hash_password(&password).map_err(|e| {
            error!("{}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password", "PASSWORD_ERROR")
        })?;
        updated_fields.push("password".to_string());
        active.password = Set(hashed);
    }
    if let Some(first_name) = request.first_name {
        updated_fields.push(format!("first_name: {}", first_name));
        active.first_name = Set(first_name);
    }
    if let Some(last_name) = request.last_name {
        updated_fields.push(format!("last_name: {}", last_name));
        active.last_name = Set(last_name);
    }
    if let Some(email) = request.email {
        updated_fields.push(format!("email: {}", email));
        active.email = Set(email);
    }
    if let Some(is_staff) = request.is_staff {
        updated_fields.push(format!("is_staff: {}", is_staff));
        active.is_staff = Set(is_staff);
    }
    if let Some(is_superuser) = request.is_superuser {
        updated_fields.push(format!("is_superuser: {}", is_superuser));
        active.is_superuser = Set(is_superuser);
    }
    if let Some(is_active) = request.is_active {
        updated_fields.push(format!("is_active: {}", is_active));
        active.is_active = Set(is_active);
    }

    if updated_fields.is_empty() {
        debug!("No fields to update for account ID: {}", account_id);
    } else {
        debug!("Updating fields: {}", updated_fields.join(", "));
    }

    match active.update(&state.db).await {
        Ok(updated) => {
            info!("Account with ID {} updated successfully", account_id);
            ok(StatusCode::OK, account_to_dto(&updated), "Account updated successfully")
        }
        Err(db_error) if is_unique_violation(&db_error) => Err(api_error(
            StatusCode::CONFLICT,
            "Username already exists",
            "USERNAME_ALREADY_EXISTS",
        )),
        Err(db_error) => Err(database_error("Updating account", db_error)),
    }
}

/// Deactivate an account
///
/// Accounts are never removed; this clears `is_active` so the account can
/// no longer log in.
#[utoipa::path(
    delete,
    path = "/api/v1/accounts/{account_id}",
    tag = "accounts",
    params(
        ("account_id" = i32, Path, description = "Account ID"),
    ),
    responses(
        (status = 200, description = "Account deactivated successfully", body = ApiResponse<AccountDto>),
        (status = 403, description = "Staff required", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, principal))]
pub async fn deactivate_account(
    Path(account_id): Path<i32>,
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> ApiResult<AccountDto> {
    trace!("Entering deactivate_account function for account_id: {}", account_id);
    AccessMode::Staff.evaluate(principal.principal()).map_err(denied)?;
    let actor: &Principal = principal
        .principal()
        .ok_or_else(|| denied(AccessDenied::LoginRequired))?;

    let existing = find_account(&state, account_id).await?;
    if !may_manage(actor, &existing) {
        warn!("{} may not deactivate privileged account {}", actor.username, existing.username);
        return Err(forbidden("Only superusers can deactivate staff or superuser accounts"));
    }
    if !existing.is_active {
        debug!("Account {} is already inactive", account_id);
        return ok(StatusCode::OK, account_to_dto(&existing), "Account already inactive");
    }

    let mut active: account::ActiveModel = existing.into();
    active.is_active = Set(false);
    match active.update(&state.db).await {
        Ok(updated) => {
            info!("Account with ID {} deactivated", account_id);
            ok(StatusCode::OK, account_to_dto(&updated), "Account deactivated successfully")
        }
        Err(db_error) => Err(database_error("Deactivating account", db_error)),
    }
}

/// Send an e-mail to an account
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{account_id}/email",
    tag = "accounts",
    params(
        ("account_id" = i32, Path, description = "Account ID"),
    ),
    request_body = EmailAccountRequest,
    responses(
        (status = 200, description = "Message sent", body = ApiResponse<String>),
        (status = 403, description = "Staff required", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 422, description = "Account has no e-mail address", body = ErrorResponse),
        (status = 502, description = "Mail delivery failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, principal, request))]
pub async fn email_account(
    Path(account_id): Path<i32>,
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Valid(Json(request)): Valid<Json<EmailAccountRequest>>,
) -> ApiResult<String> {
    trace!("Entering email_account function for account_id: {}", account_id);
    AccessMode::Staff.evaluate(principal.principal()).map_err(denied)?;

    let account = find_account(&state, account_id).await?;
    match account
        .email_user(
            state.mailer.as_ref(),
            &request.subject,
            &request.message,
            request.from_email.as_deref(),
        )
        .await
    {
        Ok(()) => {
            info!("Sent '{}' to account {}", request.subject, account.username);
            ok(StatusCode::OK, account.email.clone(), "Message sent")
        }
        Err(MailError::NoRecipients) => Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Account '{}' has no e-mail address", account.username),
            "ACCOUNT_HAS_NO_EMAIL",
        )),
        Err(e) => {
            error!("Failed to send mail to {}: {}", account.username, e);
            Err(api_error(StatusCode::BAD_GATEWAY, e.to_string(), "MAIL_ERROR"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(id: i32, is_staff: bool, is_superuser: bool) -> Principal {
        Principal {
            id,
            username: format!("user{}", id),
            is_staff,
            is_superuser,
        }
    }

    fn target(id: i32, is_staff: bool, is_superuser: bool) -> account::Model {
        account::Model {
            id,
            password: "!".to_string(),
            last_login: None,
            is_superuser,
            username: format!("user{}", id),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            is_staff,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_may_manage() {
        let staff = principal(1, true, false);
        assert!(may_manage(&staff, &target(2, false, false)));
        assert!(may_manage(&staff, &target(1, true, false)));
        assert!(!may_manage(&staff, &target(3, true, false)));
        assert!(!may_manage(&staff, &target(4, true, true)));

        let root = principal(5, true, true);
        assert!(may_manage(&root, &target(4, true, true)));

        let plain = principal(6, false, false);
        assert!(!may_manage(&plain, &target(2, false, false)));
    }
}
