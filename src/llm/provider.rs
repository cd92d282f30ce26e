//! Outbound generation provider abstraction and error classification.

use super::error::LlmError;
use super::prompt::ConversationTurn;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// A single chat-completion call as handed to a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ConversationTurn>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Provider-native failures.
///
/// Mirrors the error classes of OpenAI-compatible SDKs. These never leave
/// the `llm` module: [`classify`] translates them into [`LlmError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// 400
    #[error("bad request: {0}")]
    BadRequest(String),

    /// 401
    #[error("authentication error: {0}")]
    Authentication(String),

    /// 403
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// 404
    #[error("not found: {0}")]
    NotFound(String),

    /// 409
    #[error("conflict: {0}")]
    Conflict(String),

    /// 422
    #[error("unprocessable entity: {0}")]
    UnprocessableEntity(String),

    /// 429
    #[error("rate limit: {0}")]
    RateLimit(String),

    /// 5xx
    #[error("internal server error {status}: {message}")]
    InternalServer { status: u16, message: String },

    /// Any other non-success status
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    /// Could not reach the provider (DNS, refused, reset, ...)
    #[error("connection error: {0}")]
    Connection(String),

    /// Request exceeded its deadline
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// Response body did not match the expected format
    #[error("invalid response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Build the error for a non-success HTTP status.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 => ProviderError::BadRequest(message),
            401 => ProviderError::Authentication(message),
            403 => ProviderError::PermissionDenied(message),
            404 => ProviderError::NotFound(message),
            409 => ProviderError::Conflict(message),
            422 => ProviderError::UnprocessableEntity(message),
            429 => ProviderError::RateLimit(message),
            500..=599 => ProviderError::InternalServer { status, message },
            _ => ProviderError::Status { status, message },
        }
    }
}

/// Map a provider-native error into exactly one taxonomy kind.
pub fn classify(error: ProviderError) -> LlmError {
    match error {
        ProviderError::RateLimit(msg) => LlmError::RateLimited(msg),
        ProviderError::Connection(msg) => LlmError::ConnectionFailed(msg),
        ProviderError::Timeout(ms) => {
            LlmError::TimedOut(format!("no response after {}ms", ms))
        }
        ProviderError::BadRequest(msg) => LlmError::InvalidRequest(msg),
        ProviderError::Authentication(msg) => LlmError::AuthenticationFailed(msg),
        other @ (ProviderError::PermissionDenied(_)
        | ProviderError::NotFound(_)
        | ProviderError::Conflict(_)
        | ProviderError::UnprocessableEntity(_)
        | ProviderError::InternalServer { .. }
        | ProviderError::Status { .. }
        | ProviderError::Decode(_)) => LlmError::Unexpected(other.to_string()),
    }
}

/// Remote chat-completion endpoint.
///
/// Implementations perform exactly one outbound call per invocation and
/// enforce `request.timeout` themselves. Retry and circuit breaking are
/// layered on by [`GenerationClient`](super::GenerationClient).
#[async_trait]
pub trait ChatProvider: Send + Sync + 'static {
    /// Human-readable provider name for logs.
    fn name(&self) -> &str;

    /// Generate a reply for the given turns. Returns the raw provider text,
    /// which may be empty.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}
