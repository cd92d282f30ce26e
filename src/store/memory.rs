use super::{Message, Session, SessionStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

struct SessionRecord {
    session: Session,
    /// Insertion order; timestamps alone can tie
    seq: u64,
    messages: Vec<Message>,
}

/// Process-local session store backed by a concurrent map.
///
/// Each session owns its message vector, so appends to one session never
/// contend with reads of another, and deleting a session drops its messages.
/// A secondary index maps message ids to their session for single-message
/// lookups. Readers copy the session id out of the index before touching the
/// session map, so no path holds an index entry while waiting on a session.
///
/// # Examples
///
/// ```
/// use memocha::store::{InMemoryStore, SessionStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = InMemoryStore::new();
/// let session = store.create_session().await.unwrap();
/// store.create_message(session.id, "user", "hello").await.unwrap();
///
/// let (messages, total) = store.list_messages(session.id, 0, 10).await.unwrap();
/// assert_eq!(total, 1);
/// assert_eq!(messages[0].content, "hello");
/// # }
/// ```
pub struct InMemoryStore {
    sessions: DashMap<Uuid, SessionRecord>,
    /// message id -> owning session id
    message_index: DashMap<Uuid, Uuid>,
    next_seq: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            message_index: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn session_of(&self, message_id: Uuid) -> Option<Uuid> {
        self.message_index.get(&message_id).map(|entry| *entry)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn page<T: Clone>(items: &[T], skip: usize, limit: usize) -> Vec<T> {
    items.iter().skip(skip).take(limit).cloned().collect()
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.get(&id).map(|record| record.session.clone()))
    }

    async fn create_session(&self) -> Result<Session, StoreError> {
        let session = Session::new();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.sessions.insert(
            session.id,
            SessionRecord {
                session: session.clone(),
                seq,
                messages: Vec::new(),
            },
        );
        tracing::debug!(session_id = %session.id, "Session created");
        Ok(session)
    }

    async fn count_sessions(&self) -> Result<u64, StoreError> {
        Ok(self.session_count() as u64)
    }

    async fn list_sessions(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<Session>, u64), StoreError> {
        let mut ordered: Vec<(u64, Session)> = self
            .sessions
            .iter()
            .map(|record| (record.seq, record.session.clone()))
            .collect();
        ordered.sort_by_key(|(seq, _)| *seq);

        let total = ordered.len() as u64;
        let sessions = ordered
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|(_, session)| session)
            .collect();
        Ok((sessions, total))
    }

    async fn delete_session(&self, id: Uuid) -> Result<bool, StoreError> {
        let removed = self.sessions.remove(&id);
        if let Some((_, record)) = &removed {
            for message in &record.messages {
                self.message_index.remove(&message.id);
            }
            tracing::debug!(
                session_id = %id,
                messages = record.messages.len(),
                "Session deleted"
            );
        }
        Ok(removed.is_some())
    }

    async fn create_message(
        &self,
        session_id: Uuid,
        role: &str,
        content: &str,
    ) -> Result<Message, StoreError> {
        let mut record = self
            .sessions
            .get_mut(&session_id)
            .ok_or(StoreError::SessionNotFound(session_id))?;

        let message = Message::new(session_id, role, content);
        self.message_index.insert(message.id, session_id);
        record.messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(
        &self,
        session_id: Uuid,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<Message>, u64), StoreError> {
        let record = self
            .sessions
            .get(&session_id)
            .ok_or(StoreError::SessionNotFound(session_id))?;

        Ok((
            page(&record.messages, skip, limit),
            record.messages.len() as u64,
        ))
    }

    async fn get_message(&self, id: Uuid) -> Result<Option<Message>, StoreError> {
        let Some(session_id) = self.session_of(id) else {
            return Ok(None);
        };
        Ok(self.sessions.get(&session_id).and_then(|record| {
            record.messages.iter().find(|m| m.id == id).cloned()
        }))
    }

    async fn update_message(
        &self,
        id: Uuid,
        content: &str,
    ) -> Result<Option<Message>, StoreError> {
        let Some(session_id) = self.session_of(id) else {
            return Ok(None);
        };
        let Some(mut record) = self.sessions.get_mut(&session_id) else {
            return Ok(None);
        };
        let updated = record.messages.iter_mut().find(|m| m.id == id).map(|m| {
            m.content = content.to_string();
            m.clone()
        });
        if updated.is_some() {
            tracing::debug!(session_id = %session_id, message_id = %id, "Message updated");
        }
        Ok(updated)
    }

    async fn delete_message(&self, id: Uuid) -> Result<bool, StoreError> {
        let Some((_, session_id)) = self.message_index.remove(&id) else {
            return Ok(false);
        };
        let Some(mut record) = self.sessions.get_mut(&session_id) else {
            return Ok(false);
        };
        let before = record.messages.len();
        record.messages.retain(|m| m.id != id);
        let removed = record.messages.len() != before;
        if removed {
            tracing::debug!(session_id = %session_id, message_id = %id, "Message deleted");
        }
        Ok(removed)
    }

    // One shard lock for the whole read, so a concurrent append can't shift the window
    async fn recent_messages(&self, session_id: Uuid, n: usize) -> Result<Vec<Message>, StoreError> {
        let record = self
            .sessions
            .get(&session_id)
            .ok_or(StoreError::SessionNotFound(session_id))?;

        let skip = record.messages.len().saturating_sub(n);
        Ok(page(&record.messages, skip, n))
    }
}
