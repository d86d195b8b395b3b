//! History store trait: per-session conversation logs.
//!
//! A store keeps one [`ConversationSession`] per [`SessionId`]. The session
//! identity is passed on every call; stores never share turns between
//! sessions.
//!
//! Persistence is best-effort: a backend that mirrors sessions to disk
//! updates its in-memory copy first, then writes through. A failed write is
//! logged and the in-memory result is still returned.

use async_trait::async_trait;

use crate::error::HistoryError;
use crate::message::{ChatTurn, ConversationSession, SessionId};

/// The core HistoryStore trait.
///
/// Implementations: in-memory, JSON file per session, none (no-op).
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The backend name (e.g., "memory", "file", "none").
    fn name(&self) -> &str;

    /// Append a turn to a session, creating the session if needed.
    /// Returns the turn as recorded (with its sequence number).
    async fn append(&self, session: &SessionId, turn: ChatTurn)
    -> Result<ChatTurn, HistoryError>;

    /// The last `n` turns of a session, oldest first.
    async fn recent(&self, session: &SessionId, n: usize) -> Result<Vec<ChatTurn>, HistoryError>;

    /// The full session, if it exists.
    async fn get(&self, session: &SessionId) -> Result<Option<ConversationSession>, HistoryError>;

    /// Reset a session to its initial state.
    async fn clear(&self, session: &SessionId) -> Result<(), HistoryError>;

    /// Number of sessions currently held.
    async fn count(&self) -> Result<usize, HistoryError>;
}
