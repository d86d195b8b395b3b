//! File-based history backend: one JSON document per session.
//!
//! Storage location: `~/.dsatutor/history/<session>.json` by default.
//!
//! Sessions are loaded lazily on first access and flushed to disk on every
//! mutation. Reading a session that was never stored creates nothing. A record that fails to parse or validate is discarded with a
//! warning and the session starts over from the welcome seed. Write failures
//! are logged and never fail the request; the in-memory copy stays
//! authoritative for the life of the process.

use async_trait::async_trait;
use dsatutor_core::error::HistoryError;
use dsatutor_core::history::HistoryStore;
use dsatutor_core::message::{ChatTurn, ConversationSession, SessionId};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A history store that persists each session as a JSON file.
pub struct FileHistory {
    directory: PathBuf,
    sessions: Arc<RwLock<HashMap<SessionId, ConversationSession>>>,
    welcome: Option<String>,
}

impl FileHistory {
    /// Create a store rooted at `directory`. Nothing is touched on disk
    /// until the first write.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        debug!(path = %directory.display(), "File history backend ready");
        Self {
            directory,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            welcome: None,
        }
    }

    /// Seed new and cleared sessions with a welcome turn.
    pub fn with_welcome(mut self, welcome: Option<String>) -> Self {
        self.welcome = welcome;
        self
    }

    fn fresh(&self, id: &SessionId) -> ConversationSession {
        ConversationSession::seeded(id.clone(), self.welcome.as_deref())
    }

    fn path_for(&self, id: &SessionId) -> PathBuf {
        self.directory.join(format!("{}.json", file_stem(id)))
    }

    /// Read a session record from disk. Returns the session and whether it
    /// had to be replaced (so the caller rewrites the file).
    async fn load(&self, id: &SessionId) -> (ConversationSession, bool) {
        let path = self.path_for(id);
        let content = match tokio::fs::read(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return (self.fresh(id), false),
            Err(e) => {
                warn!(session = %id, path = %path.display(), error = %e, "Session history unreadable");
                return (self.fresh(id), false);
            }
        };

        let parsed = serde_json::from_slice::<ConversationSession>(&content)
            .map_err(|e| e.to_string())
            .and_then(|session| {
                if session.id != *id {
                    return Err(format!("record belongs to session {}", session.id));
                }
                session.validate().map(|()| session)
            });

        match parsed {
            Ok(session) => {
                debug!(session = %id, turns = session.len(), "Loaded session history");
                (session, false)
            }
            Err(reason) => {
                let err = HistoryError::Corrupt {
                    session: id.to_string(),
                    reason,
                };
                warn!(error = %err, path = %path.display(), "Discarding session history");
                (self.fresh(id), true)
            }
        }
    }

    /// Write one session to disk. Errors are logged, not returned.
    async fn flush(&self, session: &ConversationSession) {
        if let Err(err) = self.try_flush(session).await {
            warn!(error = %err, "Session history not persisted");
        }
    }

    async fn try_flush(&self, session: &ConversationSession) -> Result<(), HistoryError> {
        let persistence = |reason: String| HistoryError::Persistence {
            session: session.id.to_string(),
            reason,
        };

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| persistence(format!("create {}: {e}", self.directory.display())))?;

        let json = serde_json::to_string_pretty(session).map_err(|e| persistence(e.to_string()))?;

        // Write-then-rename so a crash never leaves a half-written record.
        let path = self.path_for(&session.id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| persistence(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| persistence(format!("rename to {}: {e}", path.display())))?;

        Ok(())
    }

    async fn on_disk(&self, id: &SessionId) -> bool {
        tokio::fs::try_exists(self.path_for(id))
            .await
            .unwrap_or(false)
    }

    /// Cached session, loading it from disk on first use.
    async fn cached<'a>(
        &self,
        sessions: &'a mut HashMap<SessionId, ConversationSession>,
        id: &SessionId,
    ) -> &'a mut ConversationSession {
        match sessions.entry(id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let (session, replaced) = self.load(id).await;
                if replaced {
                    self.flush(&session).await;
                }
                entry.insert(session)
            }
        }
    }
}

/// Encode a session id as a file stem. Alphanumerics and `-` pass through;
/// every other byte becomes `_xx` so distinct ids never share a file.
fn file_stem(id: &SessionId) -> String {
    let mut stem = String::with_capacity(id.as_str().len());
    for byte in id.as_str().bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("_{byte:02x}"));
        }
    }
    stem
}

#[async_trait]
impl HistoryStore for FileHistory {
    fn name(&self) -> &str {
        "file"
    }

    async fn append(&self, session: &SessionId, turn: ChatTurn) -> Result<ChatTurn, HistoryError> {
        let mut sessions = self.sessions.write().await;
        let log = self.cached(&mut sessions, session).await;
        let recorded = log.append(turn);
        self.flush(log).await;
        Ok(recorded)
    }

    async fn recent(&self, session: &SessionId, n: usize) -> Result<Vec<ChatTurn>, HistoryError> {
        {
            let sessions = self.sessions.read().await;
            if let Some(log) = sessions.get(session) {
                return Ok(log.recent(n));
            }
        }

        // Unknown sessions get the seeded view without being created.
        if !self.on_disk(session).await {
            return Ok(self.fresh(session).recent(n));
        }

        let mut sessions = self.sessions.write().await;
        Ok(self.cached(&mut sessions, session).await.recent(n))
    }

    async fn get(&self, session: &SessionId) -> Result<Option<ConversationSession>, HistoryError> {
        {
            let sessions = self.sessions.read().await;
            if let Some(log) = sessions.get(session) {
                return Ok(Some(log.clone()));
            }
        }

        if !self.on_disk(session).await {
            return Ok(None);
        }

        let mut sessions = self.sessions.write().await;
        Ok(Some(self.cached(&mut sessions, session).await.clone()))
    }

    async fn clear(&self, session: &SessionId) -> Result<(), HistoryError> {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(session) && !self.on_disk(session).await {
            return Ok(());
        }
        let log = self.cached(&mut sessions, session).await;
        log.reset(self.welcome.as_deref());
        self.flush(log).await;
        Ok(())
    }

    async fn count(&self) -> Result<usize, HistoryError> {
        let mut stems: HashSet<String> = self
            .sessions
            .read()
            .await
            .keys()
            .map(file_stem)
            .collect();

        if let Ok(mut dir) = tokio::fs::read_dir(&self.directory).await {
            while let Ok(Some(entry)) = dir.next_entry().await {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("json") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        stems.insert(stem.to_string());
                    }
                }
            }
        }

        Ok(stems.len())
    }
}
