//! Health check endpoint handler.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health - Liveness only; does not touch the provider.
pub async fn handle() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
