//! The DSA tutor chat pipeline.
//!
//! Every user message takes the same path:
//!
//! 1. **Validate** the message (empty input never reaches the model)
//! 2. **Topic gate**: off-topic messages get a canned redirect, no model call
//! 3. **Context window**: the most recent turns of the session, oldest first
//! 4. **Assemble** persona + context + answer cue + message into a payload
//! 5. **Complete** via the configured provider, exactly once
//! 6. **Record** the user turn and the reply in the session history
//!
//! A failed model call records nothing, so a retry never duplicates turns.

pub mod context;
pub mod gate;
pub mod pipeline;

#[cfg(test)]
mod test_helpers;

pub use context::{ContextWindow, PromptAssembler};
pub use gate::{GateDecision, TopicGate};
pub use pipeline::{ChatPipeline, Reply};
