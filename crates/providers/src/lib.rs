//! Model provider implementations for the DSA tutor.
//!
//! All providers implement the `dsatutor_core::Provider` trait.
//! The router selects the correct provider based on configuration.

mod http;
pub mod gemini;
pub mod openai_compat;
pub mod router;

#[cfg(test)]
mod test_helpers;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::ProviderRouter;
