//! Configuration loading, validation, and management for the DSA tutor.
//!
//! Loads configuration from `~/.dsatutor/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default persona instruction for the tutor.
pub const DEFAULT_PERSONA: &str = concat!(
    "You are an impatient, blunt and highly knowledgeable DSA (Data Structures and Algorithms) instructor. ",
    "You remember earlier messages in this conversation, including personal details the user shared. ",
    "Keep responses concise (2-4 paragraphs max) and focus on the key concept. ",
    "Explain step by step and provide one well-commented code example in the language the user asks for ",
    "(recursive or iterative if they say so), and mention time and space complexity briefly. ",
    "Use bullet points and bold text for emphasis. ",
    "If asked something outside DSA, bluntly redirect the user back to DSA."
);

/// Default welcome turn seeded into new and cleared sessions.
pub const DEFAULT_WELCOME: &str = concat!(
    "**Hi! I'm your DSA tutor.**\n\n",
    "I'm here to help you learn Data Structures & Algorithms quickly, and I remember our conversation.\n\n",
    "**Ask me about:**\n",
    "• Algorithms (sorting, searching, DP)\n",
    "• Data Structures (arrays, trees, graphs)\n",
    "• Time Complexity & Big O\n\n",
    "**Try:** \"What is binary search?\""
);

/// Default canned reply for off-topic questions.
pub const DEFAULT_REDIRECT: &str = concat!(
    "**This is a DSA instructor, not a general chatbot!**\n\n",
    "I teach **Data Structures & Algorithms** only.\n\n",
    "**Ask me about:**\n",
    "• Binary search, quicksort, hash tables\n",
    "• Arrays, linked lists, trees, graphs\n",
    "• Big O notation, dynamic programming\n\n",
    "**Try:** \"What is binary search?\" or \"Explain quicksort\""
);

/// The root configuration structure.
///
/// Maps directly to `~/.dsatutor/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model service (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default model provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Timeout for a single model call, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Persona and context window settings
    #[serde(default)]
    pub tutor: TutorConfig,

    /// Off-topic filtering
    #[serde(default)]
    pub topic_gate: TopicGateConfig,

    /// Session history storage
    #[serde(default)]
    pub history: HistoryConfig,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_request_timeout_secs() -> u64 {
    30
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("tutor", &self.tutor)
            .field("topic_gate", &self.topic_gate)
            .field("history", &self.history)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorConfig {
    /// System instruction that sets tone and scope
    #[serde(default = "default_persona")]
    pub persona: String,

    /// How assistant turns are labelled in the prompt context
    #[serde(default = "default_assistant_label")]
    pub assistant_label: String,

    /// Canned welcome turn
    #[serde(default = "default_welcome")]
    pub welcome_message: String,

    /// Seed new and cleared sessions with the welcome turn
    #[serde(default = "default_true")]
    pub seed_welcome: bool,

    /// Number of recent turns sent as context
    #[serde(default = "default_max_context_turns")]
    pub max_context_turns: usize,
}

fn default_persona() -> String {
    DEFAULT_PERSONA.into()
}
fn default_assistant_label() -> String {
    "Assistant".into()
}
fn default_welcome() -> String {
    DEFAULT_WELCOME.into()
}
fn default_max_context_turns() -> usize {
    10
}
fn default_true() -> bool {
    true
}

impl TutorConfig {
    /// The welcome text, if seeding is enabled.
    pub fn welcome(&self) -> Option<&str> {
        self.seed_welcome.then_some(self.welcome_message.as_str())
    }
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
            assistant_label: default_assistant_label(),
            welcome_message: default_welcome(),
            seed_welcome: true,
            max_context_turns: default_max_context_turns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicGateConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Disallowed-topic keywords, matched case-insensitively
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// Reply returned instead of calling the model
    #[serde(default = "default_redirect")]
    pub redirect_message: String,

    /// Match keywords only as whole words. Off by default, so "sporty"
    /// still matches "sport".
    #[serde(default)]
    pub whole_word: bool,
}

fn default_keywords() -> Vec<String> {
    [
        "ronaldo", "football", "soccer", "sport", "movie", "music", "food", "weather", "politics",
    ]
    .iter()
    .map(|k| k.to_string())
    .collect()
}
fn default_redirect() -> String {
    DEFAULT_REDIRECT.into()
}

impl Default for TopicGateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keywords: default_keywords(),
            redirect_message: default_redirect(),
            whole_word: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// "memory", "file" or "none"
    #[serde(default = "default_history_backend")]
    pub backend: String,

    /// Directory for the file backend (defaults to `~/.dsatutor/history`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

fn default_history_backend() -> String {
    "file".into()
}

impl HistoryConfig {
    /// Resolved directory for file-backed sessions.
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("history"))
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: default_history_backend(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Browser origins allowed by CORS. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    5001
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.dsatutor/config.toml).
    ///
    /// Also checks environment variables:
    /// - `DSATUTOR_API_KEY` (highest priority), `GEMINI_API_KEY`, `OPENAI_API_KEY`
    /// - `DSATUTOR_PROVIDER`, `DSATUTOR_MODEL`
    /// - `PORT` for the gateway
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("DSATUTOR_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none() {
            self.api_key = non_empty("GEMINI_API_KEY").or_else(|| non_empty("OPENAI_API_KEY"));
        }

        if let Some(provider) = non_empty("DSATUTOR_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = non_empty("DSATUTOR_MODEL") {
            self.default_model = model;
        }

        if let Some(port) = non_empty("PORT") {
            match port.parse() {
                Ok(p) => self.gateway.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".dsatutor")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.tutor.max_context_turns == 0 {
            return Err(ConfigError::ValidationError(
                "tutor.max_context_turns must be at least 1".into(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be at least 1".into(),
            ));
        }

        if self.topic_gate.enabled
            && self.topic_gate.keywords.iter().all(|k| k.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "topic_gate.keywords must not be empty when the gate is enabled".into(),
            ));
        }

        if !matches!(self.history.backend.as_str(), "memory" | "file" | "none") {
            return Err(ConfigError::ValidationError(format!(
                "unknown history backend '{}' (expected memory, file or none)",
                self.history.backend
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Fail fast when no credential for the model service is configured.
    pub fn require_api_key(&self) -> Result<(), ConfigError> {
        if self.has_api_key() {
            Ok(())
        } else {
            Err(ConfigError::MissingApiKey {
                provider: self.default_provider.clone(),
            })
        }
    }

    /// The model to request: the default provider's own `default_model`
    /// if set, otherwise the top-level `default_model`.
    pub fn effective_model(&self) -> &str {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.default_model.as_deref())
            .unwrap_or(&self.default_model)
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            tutor: TutorConfig::default(),
            topic_gate: TopicGateConfig::default(),
            history: HistoryConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error(
        "No API key configured for provider '{provider}'. Set DSATUTOR_API_KEY or GEMINI_API_KEY"
    )]
    MissingApiKey { provider: String },
}
