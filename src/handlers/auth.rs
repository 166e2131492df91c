use crate::auth::{bearer_token, end_session, start_session, verify_password};
use crate::helpers::converters::account_to_dto;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use chrono::Utc;
use common::{LoginRequest, SessionDto};
use model::entities::account;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::{debug, error, info, instrument, trace, warn};

fn invalid_credentials() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new(
            "Please enter a correct username and password",
            "INVALID_CREDENTIALS",
        )),
    )
}

/// Log in with username and password
///
/// Returns a session token to send as `Authorization: Bearer <token>`.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<SessionDto>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Account is inactive", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<SessionDto>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering login function");

    let found = account::Entity::find()
        .filter(account::Column::Username.eq(request.username.as_str()))
        .one(&state.db)
        .await
        .map_err(|e| {
            error!("Failed to look up account: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Internal server error", "DATABASE_ERROR")),
            )
        })?;

    let Some(account) = found else {
        debug!("No account named {}", request.username);
        return Err(invalid_credentials());
    };
    if !verify_password(&request.password, &account.password) {
        warn!("Wrong password for {}", account.username);
        return Err(invalid_credentials());
    }
    if !account.is_active {
        warn!("Inactive account {} tried to log in", account.username);
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("This account is inactive", "ACCOUNT_INACTIVE")),
        ));
    }

    let mut active: account::ActiveModel = account.into();
    active.last_login = Set(Some(Utc::now()));
    let account = active.update(&state.db).await.map_err(|e| {
        error!("Failed to record last login: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Internal server error", "DATABASE_ERROR")),
        )
    })?;

    let token = start_session(&state, &account).await;
    info!("Account {} logged in", account.username);

    Ok(Json(ApiResponse {
        data: SessionDto {
            token,
            account: account_to_dto(&account),
        },
        message: "Logged in".to_string(),
        success: true,
    }))
}

/// End the current session
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<String>),
        (status = 401, description = "No session token given", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ErrorResponse>)> {
    let Some(token) = bearer_token(&headers) else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("No session token given", "LOGIN_REQUIRED")),
        ));
    };

    let existed = end_session(&state, token).await;
    debug!("Session existed: {}", existed);
    Ok(Json(ApiResponse {
        data: String::new(),
        message: "Logged out".to_string(),
        success: true,
    }))
}
