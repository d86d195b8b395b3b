//! Bounded view over a session's history.

use dsatutor_core::message::ChatTurn;

/// The most recent turns of a conversation, oldest first.
///
/// Recomputed for every request and never written back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextWindow {
    turns: Vec<ChatTurn>,
}

impl ContextWindow {
    /// Keep the last `max_turns` entries of `turns`, preserving order.
    pub fn build(turns: &[ChatTurn], max_turns: usize) -> Self {
        let start = turns.len().saturating_sub(max_turns);
        Self {
            turns: turns[start..].to_vec(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn into_turns(self) -> Vec<ChatTurn> {
        self.turns
    }
}
