//! In-memory history: useful for testing and ephemeral server sessions.

use async_trait::async_trait;
use dsatutor_core::error::HistoryError;
use dsatutor_core::history::HistoryStore;
use dsatutor_core::message::{ChatTurn, ConversationSession, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A history store that keeps every session in a process-local map.
pub struct InMemoryHistory {
    sessions: Arc<RwLock<HashMap<SessionId, ConversationSession>>>,
    welcome: Option<String>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            welcome: None,
        }
    }

    /// Seed new and cleared sessions with a welcome turn.
    pub fn with_welcome(mut self, welcome: Option<String>) -> Self {
        self.welcome = welcome;
        self
    }

    fn fresh(&self, id: &SessionId) -> ConversationSession {
        ConversationSession::seeded(id.clone(), self.welcome.as_deref())
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&self, session: &SessionId, turn: ChatTurn) -> Result<ChatTurn, HistoryError> {
        let mut sessions = self.sessions.write().await;
        let log = sessions
            .entry(session.clone())
            .or_insert_with(|| self.fresh(session));
        Ok(log.append(turn))
    }

    async fn recent(&self, session: &SessionId, n: usize) -> Result<Vec<ChatTurn>, HistoryError> {
        let sessions = self.sessions.read().await;
        Ok(match sessions.get(session) {
            Some(log) => log.recent(n),
            None => self.fresh(session).recent(n),
        })
    }

    async fn get(&self, session: &SessionId) -> Result<Option<ConversationSession>, HistoryError> {
        Ok(self.sessions.read().await.get(session).cloned())
    }

    async fn clear(&self, session: &SessionId) -> Result<(), HistoryError> {
        let mut sessions = self.sessions.write().await;
        if let Some(log) = sessions.get_mut(session) {
            log.reset(self.welcome.as_deref());
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize, HistoryError> {
        Ok(self.sessions.read().await.len())
    }
}
