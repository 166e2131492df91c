use crate::schemas::{AppState, ErrorResponse, HealthResponse};
use axum::{extract::State, http::StatusCode, response::Json};
use tracing::{error, instrument, trace};

/// Health check endpoint
///
/// Reports the database connection and the number of open login sessions.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database is unreachable", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<ErrorResponse>)> {
    if let Err(e) = state.db.ping().await {
        error!("Database ping failed: {}", e);
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("Database is unreachable", "DATABASE_UNAVAILABLE")),
        ));
    }

    let sessions = state.sessions.entry_count();
    trace!("{} open sessions", sessions);

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: "connected".to_string(),
        sessions,
    }))
}
