//! # Metrics HTTP Handlers
//!
//! Axum handlers for metrics endpoints.

use super::StatsResponse;
use crate::api::{ApiError, AppState};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

/// Handler for GET /metrics endpoint (Prometheus text format).
///
/// Always returns 200 with the Prometheus content type, even before anything
/// has been recorded.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let metrics = state.metrics_collector.render_metrics();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        metrics,
    )
}

/// Handler for GET /stats endpoint (JSON format).
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let sessions = state.store.count_sessions().await?;

    Ok(Json(StatsResponse {
        uptime_seconds: state.metrics_collector.uptime_seconds(),
        model: state.llm.settings().model.clone(),
        sessions,
    }))
}
