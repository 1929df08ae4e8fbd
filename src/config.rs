//! Configuration System
//!
//! Layered configuration: built-in defaults, the user's global file, the
//! workspace `config/` directory, `CARECHAT__SECTION__KEY` environment
//! variables, and finally the provider key/URL variables the relay has always
//! honored (`OPENAI_API_KEY`, `GEMINI_URL`, `PORT`, ...).

use crate::logging::LoggingConfig;
use crate::provider::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use crate::provider::ProviderConfig;

mod env_overrides;
mod facade;
mod merge;
mod sources;

pub use env_overrides::{apply_env_overrides, apply_env_overrides_with};
pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarechatConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    /// Keyed by provider name: openai, gemini, grok, deepseek
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Reported by the health check
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            environment: default_environment(),
        }
    }
}

/// Storage paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Sled database directory, relative to the workspace unless absolute
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".carechat/store")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
        }
    }
}

impl StorageConfig {
    pub fn resolve_path(&self, workspace_root: &Path) -> PathBuf {
        if self.store_path.is_absolute() {
            self.store_path.clone()
        } else {
            workspace_root.join(&self.store_path)
        }
    }
}

/// Caps and request limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Remembered context strings per user
    #[serde(default = "default_context_capacity")]
    pub context_capacity: usize,

    /// Recent distinct questions remembered per user
    #[serde(default = "default_question_capacity")]
    pub question_capacity: usize,

    /// Stored interaction turns per user
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Turns forwarded to the provider when history is requested
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,

    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    #[serde(default = "default_max_contexts_per_request")]
    pub max_contexts_per_request: usize,

    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

fn default_context_capacity() -> usize {
    3
}

fn default_question_capacity() -> usize {
    3
}

fn default_history_capacity() -> usize {
    10
}

fn default_history_turns() -> usize {
    5
}

fn default_max_message_chars() -> usize {
    1000
}

fn default_max_contexts_per_request() -> usize {
    20
}

fn default_max_context_chars() -> usize {
    200
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            context_capacity: default_context_capacity(),
            question_capacity: default_question_capacity(),
            history_capacity: default_history_capacity(),
            history_turns: default_history_turns(),
            max_message_chars: default_max_message_chars(),
            max_contexts_per_request: default_max_contexts_per_request(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Provider(String, String),
    Server(String),
    Storage(String),
    Limits(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(name, msg) => write!(f, "Provider '{}': {}", name, msg),
            ValidationError::Server(msg) => write!(f, "Server: {}", msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Limits(msg) => write!(f, "Limits: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl LimitsConfig {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (name, value) in [
            ("context_capacity", self.context_capacity),
            ("question_capacity", self.question_capacity),
            ("history_capacity", self.history_capacity),
            ("max_message_chars", self.max_message_chars),
            ("max_context_chars", self.max_context_chars),
        ] {
            if value == 0 {
                errors.push(format!("{} must be at least 1", name));
            }
        }
        if self.history_turns > self.history_capacity {
            errors.push(format!(
                "history_turns ({}) cannot exceed history_capacity ({})",
                self.history_turns, self.history_capacity
            ));
        }
        errors
    }
}

impl CarechatConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (name, provider) in &self.providers {
            if name.parse::<ProviderKind>().is_err() {
                errors.push(ValidationError::Provider(
                    name.clone(),
                    "unknown provider (expected openai, gemini, grok, or deepseek)".to_string(),
                ));
            }
            if let Err(e) = provider.validate() {
                errors.push(ValidationError::Provider(name.clone(), e));
            }
        }

        if self.server.bind.trim().is_empty() {
            errors.push(ValidationError::Server("bind address cannot be empty".to_string()));
        }

        if self.storage.store_path.as_os_str().is_empty() {
            errors.push(ValidationError::Storage("Store path cannot be empty".to_string()));
        }

        errors.extend(self.limits.validate().into_iter().map(ValidationError::Limits));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Config for one provider kind, or defaults if the table has no entry.
    pub fn provider(&self, kind: ProviderKind) -> ProviderConfig {
        self.providers.get(kind.as_str()).cloned().unwrap_or_default()
    }
}
