//! Provider profiles: the closed set of supported providers and their config shape.

use crate::error::ApiError;
use crate::provider::{CompletionOptions, ModelProvider};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Whole-request timeout when `timeout_secs` is unset
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Supported LLM providers, selected per request by the `selectedApi` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Gemini,
    Grok,
    DeepSeek,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAI,
        ProviderKind::Gemini,
        ProviderKind::Grok,
        ProviderKind::DeepSeek,
    ];

    /// Wire name used in requests, responses, and config keys.
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Grok => "grok",
            ProviderKind::DeepSeek => "deepseek",
        }
    }

    /// Human-facing label.
    pub fn label(self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "OpenAI",
            ProviderKind::Gemini => "Gemini",
            ProviderKind::Grok => "Grok AI",
            ProviderKind::DeepSeek => "DeepSeek",
        }
    }

    /// Answer relayed when the provider produced nothing usable.
    pub fn fallback_answer(self) -> String {
        format!("No response from {}.", self.label())
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "gpt-4o-mini",
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::Grok => "grok-4",
            ProviderKind::DeepSeek => "deepseek-chat",
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "https://api.openai.com/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::Grok => "https://api.x.ai/v1",
            ProviderKind::DeepSeek => "https://api.deepseek.com",
        }
    }

    pub fn api_key_env_var(self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Grok => "GROK_API_KEY",
            ProviderKind::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }

    pub fn endpoint_env_var(self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "OPENAI_URL",
            ProviderKind::Gemini => "GEMINI_URL",
            ProviderKind::Grok => "GROK_URL",
            ProviderKind::DeepSeek => "DEEPSEEK_URL",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "openai" => Ok(ProviderKind::OpenAI),
            "gemini" => Ok(ProviderKind::Gemini),
            "grok" => Ok(ProviderKind::Grok),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            other => Err(ApiError::UnknownProvider(other.to_string())),
        }
    }
}

/// Per-provider configuration, keyed by provider name under `[providers.<name>]`.
///
/// Every field is optional: model and endpoint fall back to the provider
/// defaults, while a missing API key leaves the provider unconfigured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL (not the full completion URL)
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub default_options: CompletionOptions,

    /// Whole-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    /// Validate the static shape of the config.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                return Err("Model name cannot be empty".to_string());
            }
        }
        if let Some(endpoint) = &self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!(
                    "Endpoint must start with http:// or https://: {}",
                    endpoint
                ));
            }
        }
        if self.timeout_secs == Some(0) {
            return Err("timeout_secs must be at least 1".to_string());
        }
        if let Some(temperature) = self.default_options.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!("Temperature out of range 0.0-2.0: {}", temperature));
            }
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn model_or_default(&self, kind: ProviderKind) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| kind.default_model().to_string())
    }

    pub fn endpoint_or_default(&self, kind: ProviderKind) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| kind.default_endpoint().to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// Resolve into a concrete `ModelProvider`, requiring an API key.
    pub fn to_model_provider(&self, kind: ProviderKind) -> Result<ModelProvider, ApiError> {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ApiError::ProviderNotConfigured(format!(
                    "{} has no API key (set {} or providers.{}.api_key)",
                    kind.label(),
                    kind.api_key_env_var(),
                    kind
                ))
            })?;
        let model = self.model_or_default(kind);
        let base_url = self.endpoint_or_default(kind);

        Ok(match kind {
            ProviderKind::Gemini => ModelProvider::Gemini {
                model,
                api_key,
                base_url,
            },
            ProviderKind::OpenAI | ProviderKind::Grok | ProviderKind::DeepSeek => {
                ModelProvider::OpenAICompatible {
                    kind,
                    model,
                    api_key,
                    base_url,
                }
            }
        })
    }
}
