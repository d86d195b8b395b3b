//! No-op history: every request starts from an empty context.

use async_trait::async_trait;
use dsatutor_core::error::HistoryError;
use dsatutor_core::history::HistoryStore;
use dsatutor_core::message::{ChatTurn, ConversationSession, SessionId};

/// A history store that records nothing.
pub struct NoopHistory;

#[async_trait]
impl HistoryStore for NoopHistory {
    fn name(&self) -> &str {
        "none"
    }

    async fn append(&self, _session: &SessionId, turn: ChatTurn) -> Result<ChatTurn, HistoryError> {
        Ok(turn)
    }

    async fn recent(&self, _session: &SessionId, _n: usize) -> Result<Vec<ChatTurn>, HistoryError> {
        Ok(Vec::new())
    }

    async fn get(&self, _session: &SessionId) -> Result<Option<ConversationSession>, HistoryError> {
        Ok(None)
    }

    async fn clear(&self, _session: &SessionId) -> Result<(), HistoryError> {
        Ok(())
    }

    async fn count(&self) -> Result<usize, HistoryError> {
        Ok(0)
    }
}
