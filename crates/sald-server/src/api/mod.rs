//! API routes
//!
//! Every route except `/health` sits behind the API-key middleware.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::{middleware, AppState};

pub mod collect;
pub mod logs;

/// Assemble the application router
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/logs/", get(logs::list_logs))
        .route("/logs/summary/by-country/", get(logs::summary_by_country))
        .route("/collect-logs/", post(collect::trigger_collection))
        .route("/collect-logs/status", get(collect::collection_status))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_api_key,
        ))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
        .merge(protected)
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> Result<Response, StatusCode> {
    // Check database connectivity
    match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}
