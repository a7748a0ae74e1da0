//! Collection trigger and status endpoints
//!
//! The manual trigger and the periodic scheduler share one status flag;
//! whichever starts first wins, the other is rejected rather than queued.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use sald_collector::{run_collection, CollectionStatus};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{AppError, AppResult, AppState};

/// Response for `GET /collect-logs/status`
#[derive(Debug, Serialize)]
pub struct CollectionStatusResponse {
    pub status: String,
}

/// `POST /collect-logs/` - manually trigger a collection run
///
/// Returns 202 once the run is started on a background task, 409 when a
/// run is already in progress.
#[tracing::instrument(skip(state))]
pub async fn trigger_collection(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    if state.status.get() == CollectionStatus::Running {
        return Err(AppError::Conflict(
            "Log collection is already running.".to_string(),
        ));
    }

    info!("Manual trigger for log collection received");
    let engine = state.engine.clone();
    let status = state.status.clone();
    tokio::spawn(async move {
        // Outcome and status transitions are handled inside; a lost race
        // against the scheduler is just a skipped trigger.
        let _ = run_collection(&engine, &status).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "Log collection process started in the background."
        })),
    ))
}

/// `GET /collect-logs/status` - current collection status
///
/// A terminal outcome (`finished`/`error`) is reported once, then the
/// flag returns to `idle` so pollers see the transition.
pub async fn collection_status(State(state): State<AppState>) -> Json<CollectionStatusResponse> {
    let observed = state.status.reset_if_terminal();
    Json(CollectionStatusResponse {
        status: observed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sald_collector::{
        config::CollectorConfig, engine::IngestionEngine, geo::GeoResolver, status::StatusHandle,
        store::PgLogStore,
    };
    use std::sync::Arc;

    fn test_state() -> AppState {
        let pool = sqlx::PgPool::connect_lazy("postgresql://localhost/sald_test").unwrap();
        let config = CollectorConfig::new("/nonexistent/logs", "/nonexistent/state.json");
        let engine = IngestionEngine::new(
            config,
            Arc::new(PgLogStore::new(pool.clone())),
            Arc::new(GeoResolver::disabled()),
        )
        .unwrap();

        AppState {
            db: pool,
            engine: Arc::new(engine),
            status: StatusHandle::new(),
            api_key: "test-key".to_string(),
        }
    }

    #[tokio::test]
    async fn test_trigger_rejected_while_running() {
        let state = test_state();
        assert!(state.status.try_begin());

        let result = trigger_collection(State(state.clone())).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(state.status.get(), CollectionStatus::Running);
    }

    #[tokio::test]
    async fn test_status_endpoint_reports_terminal_outcome_once() {
        let state = test_state();
        state.status.try_begin();
        state.status.finish();

        let Json(response) = collection_status(State(state.clone())).await;
        assert_eq!(response.status, "finished");

        let Json(response) = collection_status(State(state)).await;
        assert_eq!(response.status, "idle");
    }
}
