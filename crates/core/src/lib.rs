//! # DSA Tutor Core
//!
//! Domain types, traits, and error definitions for the DSA tutor chat
//! pipeline. This crate has **zero framework dependencies**: it defines the
//! model that the provider, history, agent and gateway crates implement
//! against.
//!
//! ## Layout
//!
//! - [`message`]: chat turns, roles, sessions
//! - [`prompt`]: the payload handed to a model
//! - [`provider`]: the model gateway trait
//! - [`history`]: the session history store trait
//! - [`error`]: error taxonomy shared by every crate

pub mod error;
pub mod history;
pub mod message;
pub mod prompt;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, HistoryError, ProviderError, Result};
pub use history::HistoryStore;
pub use message::{ChatTurn, ConversationSession, Role, SessionId};
pub use prompt::PromptPayload;
pub use provider::{Completion, Provider, ProviderRequest, Usage};
