use crate::handlers::{
    accounts::{
        create_account, deactivate_account, email_account, get_account, get_accounts,
        update_account,
    },
    auth::{login, logout},
    health::health_check,
    users::{user_detail, user_list, user_search, user_search_submit},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Sessions
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        // Account API
        .route("/api/v1/accounts", post(create_account).get(get_accounts))
        .route(
            "/api/v1/accounts/:account_id",
            get(get_account).put(update_account).delete(deactivate_account),
        )
        .route("/api/v1/accounts/:account_id/email", post(email_account))
        // HTML pages
        .route("/users/", get(user_list))
        .route("/users/search/", get(user_search).post(user_search_submit))
        .route("/users/:key/", get(user_detail))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
