//! Request and response types for the chat API.

use crate::llm::{ErrorKind, LlmError};
use crate::store::{Message, Session, StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_LIMIT: usize = 100;
/// Largest page a client may request.
pub const MAX_PAGE_LIMIT: usize = 1000;

/// POST /chat request body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    pub message: String,
    /// Continue an existing session; a new one is created when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

/// POST /chat response body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: Uuid,
}

/// `?skip=&limit=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl PageParams {
    /// Resolve to `(skip, limit)`, applying defaults and the limit cap.
    pub fn resolve(&self) -> (usize, usize) {
        (
            self.skip.unwrap_or(0),
            self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT),
        )
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<Session>,
    pub total: u64,
    pub skip: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageHistoryResponse {
    pub messages: Vec<Message>,
    pub session_id: Uuid,
    pub total: u64,
    pub skip: usize,
    pub limit: usize,
}

/// API error response in OpenAI format.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

/// Error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    fn new(message: impl Into<String>, r#type: &str, code: &str) -> Self {
        Self {
            error: ApiErrorBody {
                message: message.into(),
                r#type: r#type.to_string(),
                param: None,
                code: Some(code.to_string()),
            },
        }
    }

    /// Create a bad request error (400) pointing at one request field.
    pub fn bad_request(message: &str, param: &str) -> Self {
        let mut error = Self::new(message, "invalid_request_error", "invalid_request");
        error.error.param = Some(param.to_string());
        error
    }

    /// Create a session not found error (404).
    pub fn session_not_found(id: Uuid) -> Self {
        Self::new(
            format!("Session '{}' not found", id),
            "invalid_request_error",
            "not_found",
        )
    }

    /// Create a generic internal error (500).
    pub fn internal(message: &str) -> Self {
        Self::new(message, "server_error", "internal_error")
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self.error.code.as_deref() {
            Some("invalid_request") => StatusCode::BAD_REQUEST,
            Some("not_found") => StatusCode::NOT_FOUND,
            Some("rate_limited") => StatusCode::TOO_MANY_REQUESTS,
            Some("connection_failed") => StatusCode::BAD_GATEWAY,
            Some("service_unavailable") => StatusCode::SERVICE_UNAVAILABLE,
            Some("timeout") => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        let (r#type, code) = match err.kind() {
            ErrorKind::RateLimited => ("rate_limit_error", "rate_limited"),
            ErrorKind::ConnectionFailed => ("server_error", "connection_failed"),
            ErrorKind::TimedOut => ("server_error", "timeout"),
            ErrorKind::ServiceUnavailable => ("server_error", "service_unavailable"),
            ErrorKind::InvalidRequest => ("invalid_request_error", "invalid_request"),
            ErrorKind::AuthenticationFailed => ("authentication_error", "authentication_failed"),
            ErrorKind::Unexpected => ("server_error", "internal_error"),
        };
        Self::new(err.to_string(), r#type, code)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SessionNotFound(id) => Self::session_not_found(id),
            StoreError::Backend(_) => Self::internal(&err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}
