//! Chat turn and session domain types.
//!
//! These are the value objects that flow through the whole pipeline:
//! user types a message → a `ChatTurn` is recorded → the model answers →
//! another `ChatTurn` is appended to the same `ConversationSession`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Longest accepted caller-supplied session id, in bytes.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Stable identifier for a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    /// Accept an id supplied by a client or the command line.
    ///
    /// Surrounding whitespace is dropped; what remains must be 1 to
    /// [`MAX_SESSION_ID_LEN`] bytes.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() > MAX_SESSION_ID_LEN {
            return Err(Error::Validation(format!(
                "sessionId must be 1 to {MAX_SESSION_ID_LEN} characters"
            )));
        }
        Ok(Self::from(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The learner
    User,
    /// The tutor model (browser clients label it `ai`)
    #[serde(alias = "ai", alias = "model")]
    Assistant,
}

impl Role {
    /// Label used when a turn is rendered into prompt context.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// A single immutable entry in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,

    pub content: String,

    /// Position within the session, assigned on append (1-based).
    /// Zero means the turn has not been recorded yet.
    #[serde(default)]
    pub sequence: u64,

    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            sequence: 0,
            timestamp: Utc::now(),
        }
    }
}

/// An ordered, append-only log of turns owned by one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: SessionId,

    turns: Vec<ChatTurn>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    /// Create an empty session.
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a session, optionally opening with a canned welcome turn.
    pub fn seeded(id: SessionId, welcome: Option<&str>) -> Self {
        let mut session = Self::new(id);
        if let Some(text) = welcome {
            session.append(ChatTurn::assistant(text));
        }
        session
    }

    /// Rebuild a session from turns supplied by a client.
    ///
    /// Incoming sequence numbers are ignored and reassigned in order.
    pub fn from_turns(id: SessionId, turns: impl IntoIterator<Item = ChatTurn>) -> Self {
        let mut session = Self::new(id);
        for turn in turns {
            session.append(turn);
        }
        session
    }

    /// Record a turn, stamping it with the next sequence number.
    pub fn append(&mut self, mut turn: ChatTurn) -> ChatTurn {
        turn.sequence = self.last_sequence() + 1;
        self.updated_at = Utc::now();
        self.turns.push(turn.clone());
        turn
    }

    /// The last `n` turns, oldest first. Fewer if the session is shorter.
    pub fn recent(&self, n: usize) -> Vec<ChatTurn> {
        let start = self.turns.len().saturating_sub(n);
        self.turns[start..].to_vec()
    }

    /// Drop every turn, re-seeding the welcome turn if one is given.
    pub fn reset(&mut self, welcome: Option<&str>) {
        self.turns.clear();
        self.updated_at = Utc::now();
        if let Some(text) = welcome {
            self.append(ChatTurn::assistant(text));
        }
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

    pub fn last_sequence(&self) -> u64 {
        self.turns.last().map(|t| t.sequence).unwrap_or(0)
    }

    /// Check the invariants a persisted record must satisfy:
    /// non-empty content and strictly increasing sequence numbers.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut previous = 0;
        for turn in &self.turns {
            if turn.content.trim().is_empty() {
                return Err(format!("turn {} has empty content", turn.sequence));
            }
            if turn.sequence <= previous {
                return Err(format!(
                    "sequence {} does not follow {}",
                    turn.sequence, previous
                ));
            }
            previous = turn.sequence;
        }
        Ok(())
    }
}
