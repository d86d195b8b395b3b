//! Session history stores for the DSA tutor.

pub mod file_backend;
pub mod in_memory;
pub mod noop;

use std::sync::Arc;

use dsatutor_config::AppConfig;
use dsatutor_core::history::HistoryStore;

pub use file_backend::FileHistory;
pub use in_memory::InMemoryHistory;
pub use noop::NoopHistory;

/// Build the history store named by `history.backend`.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn HistoryStore> {
    let welcome = config.tutor.welcome().map(str::to_string);
    match config.history.backend.as_str() {
        "none" => Arc::new(NoopHistory),
        "memory" => Arc::new(InMemoryHistory::new().with_welcome(welcome)),
        _ => Arc::new(
            FileHistory::new(config.history.resolved_directory()).with_welcome(welcome),
        ),
    }
}
