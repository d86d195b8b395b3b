//! Error types for the tutor domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// Message shown to end users whenever the model service fails.
pub const GATEWAY_FAILURE_MESSAGE: &str = "Failed to get response from AI";

/// The top-level error type for all tutor operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Input validation ---
    #[error("Validation error: {0}")]
    Validation(String),

    // --- Model gateway errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- History store errors ---
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Machine-readable kind for programmatic callers (HTTP JSON bodies).
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Provider(_) => "gateway",
            Error::History(_) => "persistence",
            Error::Config { .. } => "config",
            Error::Serialization(_) | Error::Internal(_) => "internal",
        }
    }

    /// A message that is safe to show to an end user.
    ///
    /// Validation messages pass through; everything else is reduced to a
    /// generic line so no internal detail leaks across the boundary.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(msg) => msg.clone(),
            Error::Provider(_) => GATEWAY_FAILURE_MESSAGE.to_string(),
            _ => "Something went wrong, please try again".to_string(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum HistoryError {
    #[error("Failed to persist session {session}: {reason}")]
    Persistence { session: String, reason: String },

    #[error("Discarded corrupt record for session {session}: {reason}")]
    Corrupt { session: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn gateway_errors_do_not_leak_detail() {
        let err = Error::Provider(ProviderError::Network("dns lookup for 10.0.0.7 failed".into()));
        assert_eq!(err.kind(), "gateway");
        assert_eq!(err.user_message(), GATEWAY_FAILURE_MESSAGE);
        assert!(!err.user_message().contains("10.0.0.7"));
    }

    #[test]
    fn validation_message_passes_through() {
        let err = Error::Validation("Question is required".into());
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.user_message(), "Question is required");
    }

    #[test]
    fn history_error_kind_is_persistence() {
        let err = Error::from(HistoryError::Persistence {
            session: "abc".into(),
            reason: "disk full".into(),
        });
        assert_eq!(err.kind(), "persistence");
        assert!(err.to_string().contains("disk full"));
    }
}
