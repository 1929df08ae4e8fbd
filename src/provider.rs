//! Model Provider Abstraction
//!
//! One interface over the supported LLM providers. OpenAI, Grok, and DeepSeek
//! speak the OpenAI chat-completions dialect; Gemini has its own
//! `generateContent` shape. Each client turns a common message list into its
//! provider's request and squeezes the reply back into a `CompletionResponse`.

use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub mod profile;
pub mod prompt;

pub use profile::{ProviderConfig, ProviderKind};

/// Resolved provider: everything a client needs to make a call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelProvider {
    OpenAICompatible {
        kind: ProviderKind,
        model: String,
        api_key: String,
        base_url: String,
    },
    Gemini {
        model: String,
        api_key: String,
        base_url: String,
    },
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

/// Completion options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>, // 0.0-2.0
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

/// Token usage information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Normalized completion.
///
/// `content` is `None` when the provider answered but the text was missing
/// from the expected place in its response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// Model provider client trait
#[async_trait]
pub trait ModelProviderClient: Send + Sync {
    /// Generate a completion from a list of messages
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Options configured for this provider
    fn default_options(&self) -> CompletionOptions {
        CompletionOptions::default()
    }
}

// OpenAI-compatible API request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// Gemini request/response structures
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<GeminiUsage>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

// Helper function to map transport errors to ApiError
fn map_http_error(error: reqwest::Error) -> ApiError {
    if let Some(status) = error.status() {
        classify_status(status.as_u16(), &error.to_string())
    } else if error.is_timeout() {
        ApiError::ProviderRequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ApiError::ProviderRequestFailed(format!("Connection error: {}", error))
    } else {
        ApiError::ProviderError(format!("HTTP error: {}", error))
    }
}

/// Map a non-success HTTP status to the matching provider error.
pub fn classify_status(status: u16, detail: &str) -> ApiError {
    match status {
        401 | 403 => ApiError::ProviderAuthFailed(format!("Authentication failed: {}", detail)),
        429 => ApiError::ProviderRateLimit(format!("Rate limit exceeded: {}", detail)),
        404 => ApiError::ProviderModelNotFound(format!("Model not found: {}", detail)),
        _ => ApiError::ProviderRequestFailed(format!(
            "Request failed with status {}: {}",
            status, detail
        )),
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(classify_status(status, &error_text))
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn build_provider_http_client(request_timeout: Duration) -> Result<Client, ApiError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
        .map_err(|e| ApiError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}

/// OpenAI chat-completions client; also serves Grok and DeepSeek
pub struct OpenAICompatibleClient {
    client: Client,
    kind: ProviderKind,
    model: String,
    api_key: String,
    base_url: String,
    default_options: CompletionOptions,
}

impl OpenAICompatibleClient {
    pub fn new(
        client: Client,
        kind: ProviderKind,
        model: String,
        api_key: String,
        base_url: String,
    ) -> Self {
        Self {
            client,
            kind,
            model,
            api_key,
            base_url,
            default_options: CompletionOptions::default(),
        }
    }

    pub fn with_default_options(mut self, options: CompletionOptions) -> Self {
        self.default_options = options;
        self
    }
}

#[async_trait]
impl ModelProviderClient for OpenAICompatibleClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(provider = %self.kind, url = %url, "sending chat completion");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = error_for_status(response).await?;

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ProviderError(format!("Failed to parse response: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content);

        Ok(CompletionResponse {
            content,
            model: completion.model.unwrap_or_else(|| self.model.clone()),
            usage: completion.usage.map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            }),
        })
    }

    fn provider_name(&self) -> &str {
        self.kind.as_str()
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn default_options(&self) -> CompletionOptions {
        self.default_options.clone()
    }
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
    default_options: CompletionOptions,
}

impl GeminiClient {
    pub fn new(client: Client, model: String, api_key: String, base_url: String) -> Self {
        Self {
            client,
            model,
            api_key,
            base_url,
            default_options: CompletionOptions::default(),
        }
    }

    pub fn with_default_options(mut self, options: CompletionOptions) -> Self {
        self.default_options = options;
        self
    }
}

/// Gemini has no system role here: system text is folded into the last user
/// turn, and assistant turns become `model` turns.
fn to_gemini_contents(messages: Vec<ChatMessage>) -> Vec<GeminiContent> {
    let system: Vec<String> = messages
        .iter()
        .filter(|m| m.role == MessageRole::System)
        .map(|m| m.content.clone())
        .collect();

    let mut contents: Vec<GeminiContent> = messages
        .into_iter()
        .filter(|m| m.role != MessageRole::System)
        .map(|m| GeminiContent {
            role: Some(
                match m.role {
                    MessageRole::Assistant => "model",
                    _ => "user",
                }
                .to_string(),
            ),
            parts: vec![GeminiPart {
                text: Some(m.content),
            }],
        })
        .collect();

    if !system.is_empty() {
        let preamble = system.join("\n");
        let last_user = contents
            .iter_mut()
            .rev()
            .find(|c| c.role.as_deref() == Some("user"));
        match last_user {
            Some(content) => {
                if let Some(part) = content.parts.first_mut() {
                    let text = part.text.take().unwrap_or_default();
                    part.text = Some(format!("{}\n{}", preamble, text));
                }
            }
            None => contents.push(GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(preamble),
                }],
            }),
        }
    }

    contents
}

#[async_trait]
impl ModelProviderClient for GeminiClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError> {
        let generation_config = if options == CompletionOptions::default() {
            None
        } else {
            Some(GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
                top_p: options.top_p,
            })
        };
        let request = GenerateContentRequest {
            contents: to_gemini_contents(messages),
            generation_config,
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!(provider = "gemini", url = %url, "sending generateContent");
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = error_for_status(response).await?;

        let completion: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ProviderError(format!("Failed to parse response: {}", e)))?;

        let content = completion
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text);

        Ok(CompletionResponse {
            content,
            model: completion
                .model_version
                .unwrap_or_else(|| self.model.clone()),
            usage: completion.usage_metadata.map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_token_count,
                completion_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            }),
        })
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn default_options(&self) -> CompletionOptions {
        self.default_options.clone()
    }
}

/// Provider factory for creating provider clients
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(
        provider: &ModelProvider,
        options: CompletionOptions,
    ) -> Result<Arc<dyn ModelProviderClient>, ApiError> {
        let http = build_provider_http_client(Duration::from_secs(
            profile::DEFAULT_REQUEST_TIMEOUT_SECS,
        ))?;
        Self::create_client_with(http, provider, options)
    }

    /// Build a client on a shared `reqwest::Client`.
    pub fn create_client_with(
        http: Client,
        provider: &ModelProvider,
        options: CompletionOptions,
    ) -> Result<Arc<dyn ModelProviderClient>, ApiError> {
        match provider {
            ModelProvider::OpenAICompatible {
                kind,
                model,
                api_key,
                base_url,
            } => Ok(Arc::new(
                OpenAICompatibleClient::new(
                    http,
                    *kind,
                    model.clone(),
                    api_key.clone(),
                    base_url.clone(),
                )
                .with_default_options(options),
            )),
            ModelProvider::Gemini {
                model,
                api_key,
                base_url,
            } => Ok(Arc::new(
                GeminiClient::new(http, model.clone(), api_key.clone(), base_url.clone())
                    .with_default_options(options),
            )),
        }
    }
}

/// Resolves the client for a request's selected provider.
pub trait ProviderClientResolver: Send + Sync {
    fn client_for(&self, kind: ProviderKind) -> Result<Arc<dyn ModelProviderClient>, ApiError>;
}

/// Summary row for listing providers
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub kind: ProviderKind,
    pub model: String,
    pub endpoint: String,
    pub api_key_set: bool,
}

/// Provider registry: configuration plus one ready client per configured provider
pub struct ProviderRegistry {
    configs: HashMap<ProviderKind, ProviderConfig>,
    clients: HashMap<ProviderKind, Arc<dyn ModelProviderClient>>,
}

impl ProviderRegistry {
    /// Build from the `[providers]` table; unknown keys are skipped with a warning.
    pub fn from_config(config: &crate::config::CarechatConfig) -> Result<Self, ApiError> {
        let mut configs = HashMap::new();
        for (name, provider_config) in &config.providers {
            match name.parse::<ProviderKind>() {
                Ok(kind) => {
                    configs.insert(kind, provider_config.clone());
                }
                Err(_) => warn!(provider = %name, "ignoring unknown provider in config"),
            }
        }

        let mut clients = HashMap::new();
        for (kind, provider_config) in &configs {
            if !provider_config.has_api_key() {
                debug!(provider = %kind, "provider has no API key; leaving it unconfigured");
                continue;
            }
            let provider = provider_config.to_model_provider(*kind)?;
            let http = build_provider_http_client(provider_config.request_timeout())?;
            let client = ProviderFactory::create_client_with(
                http,
                &provider,
                provider_config.default_options.clone(),
            )?;
            clients.insert(*kind, client);
        }

        Ok(Self { configs, clients })
    }

    /// Registry with prebuilt clients (tests, embedding).
    pub fn with_clients(clients: HashMap<ProviderKind, Arc<dyn ModelProviderClient>>) -> Self {
        Self {
            configs: HashMap::new(),
            clients,
        }
    }

    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        self.clients.contains_key(&kind)
    }

    /// Status of every supported provider, in a stable order.
    pub fn list_all(&self) -> Vec<ProviderStatus> {
        ProviderKind::ALL
            .iter()
            .map(|kind| {
                let config = self.configs.get(kind).cloned().unwrap_or_default();
                ProviderStatus {
                    kind: *kind,
                    model: config.model_or_default(*kind),
                    endpoint: config.endpoint_or_default(*kind),
                    api_key_set: self.clients.contains_key(kind),
                }
            })
            .collect()
    }
}

impl ProviderClientResolver for ProviderRegistry {
    fn client_for(&self, kind: ProviderKind) -> Result<Arc<dyn ModelProviderClient>, ApiError> {
        self.clients.get(&kind).cloned().ok_or_else(|| {
            ApiError::ProviderNotConfigured(format!(
                "{} is not configured (set {})",
                kind.label(),
                kind.api_key_env_var()
            ))
        })
    }
}

// Mock provider for testing
#[cfg(test)]
pub struct MockProvider {
    responses: Vec<Result<Option<String>, String>>,
    current: std::sync::Mutex<usize>,
    seen: std::sync::Mutex<Vec<Vec<ChatMessage>>>,
    provider_name: String,
    model_name: String,
}

#[cfg(test)]
impl MockProvider {
    pub fn new(provider_name: &str, responses: Vec<Result<Option<String>, String>>) -> Self {
        Self {
            responses,
            current: std::sync::Mutex::new(0),
            seen: std::sync::Mutex::new(Vec::new()),
            provider_name: provider_name.to_string(),
            model_name: format!("{}-mock", provider_name),
        }
    }

    pub fn answering(provider_name: &str, answer: &str) -> Self {
        Self::new(provider_name, vec![Ok(Some(answer.to_string()))])
    }

    /// Message lists received so far, one entry per call.
    pub fn seen(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl ModelProviderClient for MockProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError> {
        self.seen.lock().unwrap().push(messages);
        let mut idx = self.current.lock().unwrap();
        let response = self
            .responses
            .get(*idx)
            .cloned()
            .unwrap_or_else(|| Ok(Some("Mock response".to_string())));
        *idx += 1;

        match response {
            Ok(content) => Ok(CompletionResponse {
                content,
                model: self.model_name.clone(),
                usage: None,
            }),
            Err(message) => Err(ApiError::ProviderRequestFailed(message)),
        }
    }

    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
