//! The prompt payload handed to a model provider.
//!
//! A payload is built once per request by the assembler and consumed once by
//! the provider. Providers never look at the window directly; they ask the
//! payload for its rendered instruction block and the user message.

use serde::{Deserialize, Serialize};

use crate::message::{ChatTurn, Role};

/// Header placed above the serialized context window.
pub const CONTEXT_HEADER: &str = "**Previous Conversation Context:**";

/// Closing line of the instruction block; the user message follows it.
pub const ANSWER_CUE: &str = "Now, respond to the following question:";

/// Everything a model needs to answer one user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptPayload {
    /// Fixed persona / system instruction
    pub persona_instruction: String,

    /// Recent turns, oldest first
    pub context_window: Vec<ChatTurn>,

    /// The message to be answered
    pub user_message: String,

    /// Label for assistant turns in the rendered context
    #[serde(default = "default_assistant_label")]
    pub assistant_label: String,
}

fn default_assistant_label() -> String {
    "Assistant".into()
}

impl PromptPayload {
    /// Render the context window as one `Role: content` line per turn.
    ///
    /// Returns an empty string for an empty window.
    pub fn context_block(&self) -> String {
        if self.context_window.is_empty() {
            return String::new();
        }

        let mut block = format!("\n\n{CONTEXT_HEADER}\n");
        for turn in &self.context_window {
            let label = match turn.role {
                Role::User => turn.role.label(),
                Role::Assistant => self.assistant_label.as_str(),
            };
            block.push_str(label);
            block.push_str(": ");
            block.push_str(&turn.content);
            block.push('\n');
        }
        block
    }

    /// Persona, then context, then the answer cue.
    pub fn instruction(&self) -> String {
        format!(
            "{}{}\n\n{ANSWER_CUE}",
            self.persona_instruction,
            self.context_block()
        )
    }

    /// The two text parts sent to the model, in order.
    pub fn parts(&self) -> [String; 2] {
        [self.instruction(), self.user_message.clone()]
    }
}
