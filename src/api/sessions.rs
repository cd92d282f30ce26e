//! Session and message history handlers.

use crate::api::{ApiError, AppState, MessageHistoryResponse, PageParams, SessionListResponse};
use crate::store::Session;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// POST /sessions
pub async fn create(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = state.store.create_session().await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /sessions
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<Json<SessionListResponse>, ApiError> {
    let (skip, limit) = params.resolve();
    let (sessions, total) = state.store.list_sessions(skip, limit).await?;

    Ok(Json(SessionListResponse {
        sessions,
        total,
        skip,
        limit,
    }))
}

/// GET /sessions/:id
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    state
        .store
        .get_session(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::session_not_found(id))
}

/// DELETE /sessions/:id
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_session(id).await? {
        tracing::info!(session_id = %id, "Session deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::session_not_found(id))
    }
}

/// GET /sessions/:id/messages
pub async fn messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<MessageHistoryResponse>, ApiError> {
    let (skip, limit) = params.resolve();
    let (messages, total) = state.store.list_messages(id, skip, limit).await?;

    Ok(Json(MessageHistoryResponse {
        messages,
        session_id: id,
        total,
        skip,
        limit,
    }))
}
