use uuid::Uuid;

/// Errors that can occur during session store operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("storage backend failure: {0}")]
    Backend(String),
}
