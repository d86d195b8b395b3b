//! Context assembly: which turns the model sees, and how they are rendered.

pub mod assembler;
pub mod window;

pub use assembler::PromptAssembler;
pub use window::ContextWindow;
