//! Session Store module.
//!
//! Persistence seam for sessions and their messages. The HTTP layer only sees
//! the [`SessionStore`] trait; [`InMemoryStore`] is the bundled implementation.

mod error;
mod memory;
mod types;

pub use error::*;
pub use memory::InMemoryStore;
pub use types::*;

use async_trait::async_trait;
use uuid::Uuid;

/// Storage for sessions and their ordered messages.
///
/// Listing operations return the requested page together with the total
/// number of records, so callers can paginate without a second query.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Look up a session. `Ok(None)` means it does not exist.
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, StoreError>;

    async fn create_session(&self) -> Result<Session, StoreError>;

    /// Number of stored sessions.
    async fn count_sessions(&self) -> Result<u64, StoreError> {
        let (_, total) = self.list_sessions(0, 0).await?;
        Ok(total)
    }

    /// Sessions in creation order.
    async fn list_sessions(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<Session>, u64), StoreError>;

    /// Remove a session and all of its messages. Returns whether it existed.
    async fn delete_session(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Append a message to a session.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::SessionNotFound` if the session does not exist.
    async fn create_message(
        &self,
        session_id: Uuid,
        role: &str,
        content: &str,
    ) -> Result<Message, StoreError>;

    /// Messages of one session in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::SessionNotFound` if the session does not exist.
    async fn list_messages(
        &self,
        session_id: Uuid,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<Message>, u64), StoreError>;

    /// Look up a single message by id.
    async fn get_message(&self, id: Uuid) -> Result<Option<Message>, StoreError>;

    /// Replace a message's content. `Ok(None)` means it does not exist.
    async fn update_message(&self, id: Uuid, content: &str)
        -> Result<Option<Message>, StoreError>;

    /// Remove a single message. Returns whether it existed.
    async fn delete_message(&self, id: Uuid) -> Result<bool, StoreError>;

    /// The last `n` messages of a session, oldest first.
    async fn recent_messages(&self, session_id: Uuid, n: usize) -> Result<Vec<Message>, StoreError> {
        let (_, total) = self.list_messages(session_id, 0, 0).await?;
        let skip = usize::try_from(total).unwrap_or(usize::MAX).saturating_sub(n);
        let (messages, _) = self.list_messages(session_id, skip, n).await?;
        Ok(messages)
    }
}
