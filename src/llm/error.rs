//! Error taxonomy for the LLM invocation layer.
//!
//! Every failure that crosses the [`GenerationClient`](super::GenerationClient)
//! boundary is one of these kinds. Provider-native errors are translated by
//! [`classify`](super::provider::classify) before they reach callers.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors surfaced by the LLM invocation layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Provider signaled quota or rate exhaustion.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Transport-level failure reaching the provider.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request exceeded the configured timeout.
    #[error("Request timed out: {0}")]
    TimedOut(String),

    /// Circuit breaker is open; the call was not attempted.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Provider rejected the request as malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Provider rejected the configured credential.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Anything else, wrapped with the original message.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Fieldless discriminant of [`LlmError`].
///
/// Used wherever only the category matters: breaker exclusion sets, the
/// retry predicate, metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    ConnectionFailed,
    TimedOut,
    ServiceUnavailable,
    InvalidRequest,
    AuthenticationFailed,
    Unexpected,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::RateLimited,
        ErrorKind::ConnectionFailed,
        ErrorKind::TimedOut,
        ErrorKind::ServiceUnavailable,
        ErrorKind::InvalidRequest,
        ErrorKind::AuthenticationFailed,
        ErrorKind::Unexpected,
    ];

    /// Stable snake_case label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::ConnectionFailed => "connection_failed",
            ErrorKind::TimedOut => "timed_out",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::AuthenticationFailed => "authentication_failed",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message returned when the breaker rejects a call.
pub const SERVICE_UNAVAILABLE_MESSAGE: &str =
    "LLM service is temporarily unavailable. Please try again later.";

impl LlmError {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LlmError::RateLimited(_) => ErrorKind::RateLimited,
            LlmError::ConnectionFailed(_) => ErrorKind::ConnectionFailed,
            LlmError::TimedOut(_) => ErrorKind::TimedOut,
            LlmError::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            LlmError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            LlmError::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
            LlmError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// The human-readable message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            LlmError::RateLimited(m)
            | LlmError::ConnectionFailed(m)
            | LlmError::TimedOut(m)
            | LlmError::ServiceUnavailable(m)
            | LlmError::InvalidRequest(m)
            | LlmError::AuthenticationFailed(m)
            | LlmError::Unexpected(m) => m,
        }
    }

    /// Breaker rejection, synthesized locally without calling the provider.
    pub fn circuit_open() -> Self {
        LlmError::ServiceUnavailable(SERVICE_UNAVAILABLE_MESSAGE.to_string())
    }

    /// Transient infrastructure failures: the default retry predicate.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ConnectionFailed | ErrorKind::RateLimited
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(
            LlmError::RateLimited("x".into()).kind(),
            ErrorKind::RateLimited
        );
        assert_eq!(
            LlmError::ConnectionFailed("x".into()).kind(),
            ErrorKind::ConnectionFailed
        );
        assert_eq!(LlmError::TimedOut("x".into()).kind(), ErrorKind::TimedOut);
        assert_eq!(
            LlmError::circuit_open().kind(),
            ErrorKind::ServiceUnavailable
        );
        assert_eq!(
            LlmError::InvalidRequest("x".into()).kind(),
            ErrorKind::InvalidRequest
        );
        assert_eq!(
            LlmError::AuthenticationFailed("x".into()).kind(),
            ErrorKind::AuthenticationFailed
        );
        assert_eq!(
            LlmError::Unexpected("x".into()).kind(),
            ErrorKind::Unexpected
        );
    }

    #[test]
    fn test_only_connection_and_rate_limit_are_transient() {
        let transient: Vec<_> = [
            LlmError::RateLimited("a".into()),
            LlmError::ConnectionFailed("b".into()),
            LlmError::TimedOut("c".into()),
            LlmError::circuit_open(),
            LlmError::InvalidRequest("d".into()),
            LlmError::AuthenticationFailed("e".into()),
            LlmError::Unexpected("f".into()),
        ]
        .iter()
        .filter(|e| e.is_transient())
        .map(LlmError::kind)
        .collect();

        assert_eq!(
            transient,
            vec![ErrorKind::RateLimited, ErrorKind::ConnectionFailed]
        );
    }

    #[test]
    fn test_display_keeps_original_message() {
        let err = LlmError::Unexpected("boom".to_string());
        assert_eq!(err.to_string(), "Unexpected error: boom");
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn test_kind_labels_are_unique() {
        let labels: std::collections::HashSet<_> =
            ErrorKind::ALL.iter().map(ErrorKind::as_str).collect();
        assert_eq!(labels.len(), ErrorKind::ALL.len());
    }
}
