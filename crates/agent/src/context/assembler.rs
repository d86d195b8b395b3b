//! Prompt assembly: persona, context window and user message in one payload.
//!
//! # Determinism
//!
//! Assembly is a pure function of its inputs: identical persona, window and
//! message always produce an identical payload.

use dsatutor_config::TutorConfig;
use dsatutor_core::prompt::PromptPayload;

use crate::context::window::ContextWindow;

/// Builds [`PromptPayload`]s around a fixed persona instruction.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    persona: String,
    assistant_label: String,
}

impl PromptAssembler {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            assistant_label: "Assistant".into(),
        }
    }

    /// Label used for assistant turns in the rendered context.
    pub fn with_assistant_label(mut self, label: impl Into<String>) -> Self {
        self.assistant_label = label.into();
        self
    }

    pub fn from_config(tutor: &TutorConfig) -> Self {
        Self::new(&tutor.persona).with_assistant_label(&tutor.assistant_label)
    }

    pub fn assemble(&self, window: ContextWindow, user_message: &str) -> PromptPayload {
        PromptPayload {
            persona_instruction: self.persona.clone(),
            context_window: window.into_turns(),
            user_message: user_message.to_string(),
            assistant_label: self.assistant_label.clone(),
        }
    }
}
