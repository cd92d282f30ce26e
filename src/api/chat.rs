//! Chat endpoint handler.

use crate::api::{ApiError, AppState, ChatRequest, ChatResponse};
use crate::llm::HistoryEntry;
use crate::logging::{fields::PREVIEW_CHARS, generate_request_id, preview};
use crate::store::Message;
use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::{debug, field, info, info_span, Instrument, Span};

/// POST /chat - Persist the user turn, generate a reply, persist it.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request_id = generate_request_id();
    let span = info_span!("chat", %request_id, session_id = field::Empty);

    respond(state, request).instrument(span).await.map(Json)
}

async fn respond(state: Arc<AppState>, request: ChatRequest) -> Result<ChatResponse, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty", "message"));
    }

    let session = match request.session_id {
        Some(id) => state
            .store
            .get_session(id)
            .await?
            .ok_or_else(|| ApiError::session_not_found(id))?,
        None => state.store.create_session().await?,
    };
    Span::current().record("session_id", field::display(session.id));

    // Read before writing the new turn; it is appended by the assembler instead
    let history: Vec<HistoryEntry> = state
        .store
        .recent_messages(session.id, state.config.history.limit)
        .await?
        .iter()
        .map(Message::to_history_entry)
        .collect();

    debug!(
        history_len = history.len(),
        message = %preview(&request.message, PREVIEW_CHARS),
        "Chat request"
    );

    state
        .store
        .create_message(session.id, "user", &request.message)
        .await?;

    let reply = state
        .llm
        .chat_with_history(&request.message, &history, None)
        .await?;

    state
        .store
        .create_message(session.id, "assistant", &reply)
        .await?;

    info!(reply_chars = reply.chars().count(), "Chat reply generated");

    Ok(ChatResponse {
        response: reply,
        session_id: session.id,
    })
}
