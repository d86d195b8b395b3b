//! The chat pipeline implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use dsatutor_config::AppConfig;
use dsatutor_core::error::{Error, Result};
use dsatutor_core::history::HistoryStore;
use dsatutor_core::message::{ChatTurn, ConversationSession, SessionId};
use dsatutor_core::provider::{Completion, Provider, ProviderRequest};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::context::{ContextWindow, PromptAssembler};
use crate::gate::{GateDecision, TopicGate};

/// The answer to one user message.
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub text: String,

    /// True when the topic gate answered instead of the model
    pub redirected: bool,

    /// Model that produced the text, if one was called
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Orchestrates gate, context window, prompt assembly and the model call.
pub struct ChatPipeline {
    /// The model provider to use
    provider: Arc<dyn Provider>,

    /// Session history
    history: Arc<dyn HistoryStore>,

    gate: TopicGate,

    assembler: PromptAssembler,

    /// The model to request
    model: String,

    temperature: f32,

    max_tokens: Option<u32>,

    /// Number of recent turns sent as context
    max_turns: usize,

    /// One lock per session; held from reading history until the exchange
    /// is recorded, so requests on a session run one at a time.
    session_locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl ChatPipeline {
    pub fn new(
        provider: Arc<dyn Provider>,
        history: Arc<dyn HistoryStore>,
        gate: TopicGate,
        assembler: PromptAssembler,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            history,
            gate,
            assembler,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            max_turns: 10,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set how many recent turns are sent as context.
    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max;
        self
    }

    /// Build the provider and history store named in the config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let router = dsatutor_providers::router::build_from_config(config)?;
        let provider = router.default().ok_or_else(|| Error::Config {
            message: format!("provider '{}' is not available", config.default_provider),
        })?;
        let history = dsatutor_memory::build_from_config(config);
        Ok(Self::from_config_with(config, provider, history))
    }

    /// Use the config's gate, persona and generation settings around an
    /// explicit provider and history store.
    pub fn from_config_with(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        info!(
            provider = provider.name(),
            model = config.effective_model(),
            history = history.name(),
            "Chat pipeline ready"
        );

        Self::new(
            provider,
            history,
            TopicGate::from_config(&config.topic_gate),
            PromptAssembler::from_config(&config.tutor),
            config.effective_model(),
        )
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens)
        .with_max_turns(config.tutor.max_context_turns)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer a message within a server-held session.
    ///
    /// On success both the user turn and the reply are appended. A redirect
    /// is recorded the same way. A failed model call records nothing.
    /// Concurrent calls on the same session are answered in arrival order.
    pub async fn ask(&self, session: &SessionId, message: &str) -> Result<Reply> {
        let message = validate(message)?;

        let _guard = self.lock_session(session).await;
        info!(session = %session, chars = message.len(), "Processing message");

        if let GateDecision::Redirect { keyword, reply } = self.gate.classify(message) {
            info!(session = %session, keyword = %keyword, "Off-topic message redirected");
            self.record(session, ChatTurn::user(message)).await;
            self.record(session, ChatTurn::assistant(&reply)).await;
            return Ok(Reply {
                text: reply,
                redirected: true,
                model: None,
            });
        }

        let recent = match self.history.recent(session, self.max_turns).await {
            Ok(turns) => turns,
            Err(e) => {
                warn!(session = %session, error = %e, "History unavailable, answering without context");
                Vec::new()
            }
        };
        let window = ContextWindow::build(&recent, self.max_turns);

        let completion = self.complete(window, message).await?;

        self.record(session, ChatTurn::user(message)).await;
        self.record(session, ChatTurn::assistant(&completion.text)).await;

        Ok(Reply {
            text: completion.text,
            redirected: false,
            model: Some(completion.model),
        })
    }

    /// Answer a message against client-supplied history. Nothing is stored.
    pub async fn ask_with_history(&self, history: &[ChatTurn], message: &str) -> Result<Reply> {
        let message = validate(message)?;

        if let GateDecision::Redirect { keyword, reply } = self.gate.classify(message) {
            info!(keyword = %keyword, "Off-topic message redirected");
            return Ok(Reply {
                text: reply,
                redirected: true,
                model: None,
            });
        }

        let window = ContextWindow::build(history, self.max_turns);
        let completion = self.complete(window, message).await?;

        Ok(Reply {
            text: completion.text,
            redirected: false,
            model: Some(completion.model),
        })
    }

    /// The stored session, if any.
    pub async fn session(&self, session: &SessionId) -> Result<Option<ConversationSession>> {
        Ok(self.history.get(session).await?)
    }

    /// Reset a session to its initial state.
    pub async fn clear(&self, session: &SessionId) -> Result<()> {
        let _guard = self.lock_session(session).await;
        self.history.clear(session).await?;
        info!(session = %session, "Session cleared");
        Ok(())
    }

    /// Wait for exclusive use of a session. Locks nobody holds are dropped
    /// from the map on the way in.
    async fn lock_session(&self, session: &SessionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.session_locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(session.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// One model call: assemble the payload and send it.
    async fn complete(&self, window: ContextWindow, message: &str) -> Result<Completion> {
        let context_turns = window.len();
        let request = ProviderRequest {
            model: self.model.clone(),
            payload: self.assembler.assemble(window, message),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            provider = self.provider.name(),
            model = %self.model,
            context_turns,
            "Calling model"
        );

        let started = Instant::now();
        match self.provider.complete(request).await {
            Ok(completion) => {
                info!(
                    model = %completion.model,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    tokens = completion.usage.as_ref().map(|u| u.total_tokens),
                    "Model replied"
                );
                Ok(completion)
            }
            Err(e) => {
                error!(
                    provider = self.provider.name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Model call failed"
                );
                Err(e.into())
            }
        }
    }

    /// Append a turn; store failures are logged and never fail the request.
    async fn record(&self, session: &SessionId, turn: ChatTurn) {
        if let Err(e) = self.history.append(session, turn).await {
            warn!(session = %session, error = %e, "Failed to record turn");
        }
    }
}

fn validate(message: &str) -> Result<&str> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("Message must not be empty".into()));
    }
    Ok(trimmed)
}
