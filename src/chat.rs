//! Chat Orchestration
//!
//! Turns one browser request into exactly one provider call: validate, settle
//! the session and context list, optionally pull recent history, call the
//! selected provider, and normalize whatever comes back into an answer.

use crate::config::LimitsConfig;
use crate::error::ApiError;
use crate::provider::prompt::{build_messages, build_user_prompt};
use crate::provider::{ChatMessage, MessageRole, ProviderClientResolver, ProviderKind};
use crate::store::{
    BoundedList, ContextStore, HistoryRecord, HistoryStore, InteractionTurn, QuestionStore,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Incoming chat request body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// openai, gemini, grok, or deepseek; openai when absent
    #[serde(default)]
    pub selected_api: Option<String>,
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub include_history: bool,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Check the request against the configured limits.
    pub fn validate(&self, limits: &LimitsConfig) -> Result<(), ApiError> {
        let message = self.message.trim();
        if message.is_empty() {
            return Err(ApiError::InvalidRequest("\"message\" is required".to_string()));
        }
        if message.chars().count() > limits.max_message_chars {
            return Err(ApiError::InvalidRequest(format!(
                "\"message\" length must be less than or equal to {} characters long",
                limits.max_message_chars
            )));
        }
        if self.contexts.len() > limits.max_contexts_per_request {
            return Err(ApiError::InvalidRequest(format!(
                "at most {} contexts may be sent per request",
                limits.max_contexts_per_request
            )));
        }
        if let Some(context) = self
            .contexts
            .iter()
            .find(|c| c.trim().chars().count() > limits.max_context_chars)
        {
            return Err(ApiError::InvalidRequest(format!(
                "context \"{}...\" exceeds {} characters",
                context.chars().take(20).collect::<String>(),
                limits.max_context_chars
            )));
        }
        Ok(())
    }

    /// Selected provider, defaulting to OpenAI.
    pub fn provider_kind(&self) -> Result<ProviderKind, ApiError> {
        match self.selected_api.as_deref().map(str::trim) {
            None | Some("") => Ok(ProviderKind::OpenAI),
            Some(name) => name.parse(),
        }
    }

    fn user(&self) -> Option<&str> {
        self.user_id.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// One provider's normalized answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAnswer {
    pub answer: String,
    /// Milliseconds spent in the provider call
    pub response_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderAnswer {
    /// True when the text came from the provider rather than the fallback.
    pub fn is_answered(&self) -> bool {
        self.error.is_none() && self.model.is_some()
    }
}

/// Reply payload for `POST /api/chat/message`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub responses: BTreeMap<ProviderKind, ProviderAnswer>,
    pub session_id: String,
    pub contexts_used: Vec<String>,
}

/// Chat request handling over a provider resolver and the stores
#[derive(Clone)]
pub struct ChatService {
    providers: Arc<dyn ProviderClientResolver>,
    contexts: Arc<dyn ContextStore>,
    questions: Arc<dyn QuestionStore>,
    history: Arc<dyn HistoryStore>,
    limits: LimitsConfig,
}

impl ChatService {
    pub fn new(
        providers: Arc<dyn ProviderClientResolver>,
        contexts: Arc<dyn ContextStore>,
        questions: Arc<dyn QuestionStore>,
        history: Arc<dyn HistoryStore>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            providers,
            contexts,
            questions,
            history,
            limits,
        }
    }

    /// Handle one chat message end to end.
    ///
    /// Provider failures do not fail the request: the reply carries the
    /// provider's fallback answer and the error text instead.
    pub async fn send_message(&self, request: ChatRequest) -> Result<ChatReply, ApiError> {
        request.validate(&self.limits)?;
        let kind = request.provider_kind()?;
        let client = self.providers.client_for(kind)?;

        let session_id = request
            .session_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let user = request.user();
        let message = request.message.trim();

        let contexts_used = self.settle_contexts(user, &request.contexts)?;
        let history = match user {
            Some(user_id) if request.include_history => self.recent_messages(user_id)?,
            _ => Vec::new(),
        };

        let messages = build_messages(message, &contexts_used, &history);
        debug!(
            provider = %kind,
            session_id = %session_id,
            contexts = contexts_used.len(),
            history_messages = history.len(),
            "dispatching chat message"
        );

        let started = Instant::now();
        let result = client.complete(messages, client.default_options()).await;
        let response_time = started.elapsed().as_millis() as u64;

        let answer = match result {
            Ok(completion) => {
                if let Some(usage) = &completion.usage {
                    debug!(
                        provider = %kind,
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        total_tokens = usage.total_tokens,
                        "token usage"
                    );
                }
                match completion.content.filter(|c| !c.trim().is_empty()) {
                    Some(text) => ProviderAnswer {
                        answer: text,
                        response_time,
                        model: Some(completion.model),
                        error: None,
                    },
                    None => {
                        warn!(provider = %kind, "provider reply had no answer text");
                        ProviderAnswer {
                            answer: kind.fallback_answer(),
                            response_time,
                            model: None,
                            error: None,
                        }
                    }
                }
            }
            Err(e) => {
                warn!(provider = %kind, error = %e, "provider call failed");
                ProviderAnswer {
                    answer: kind.fallback_answer(),
                    response_time,
                    model: None,
                    error: Some(e.to_string()),
                }
            }
        };

        info!(
            provider = %kind,
            session_id = %session_id,
            response_time_ms = response_time,
            answered = answer.is_answered(),
            "chat message handled"
        );

        if let Some(user_id) = user {
            if let Err(e) = self
                .questions
                .record_question(user_id, message, self.limits.question_capacity)
            {
                warn!(user_id, error = %e, "failed to record question");
            }
        }

        if let (Some(user_id), true) = (user, answer.is_answered()) {
            let turn = InteractionTurn {
                session_id: session_id.clone(),
                provider: kind,
                question: message.to_string(),
                answer: answer.answer.clone(),
                response_time_ms: response_time,
                timestamp: Utc::now(),
            };
            // The answer is already in hand; a failed history write is logged, not returned.
            if let Err(e) = self
                .history
                .append_turn(user_id, turn, self.limits.history_capacity)
            {
                warn!(user_id, error = %e, "failed to record interaction turn");
            }
        }

        let mut responses = BTreeMap::new();
        responses.insert(kind, answer);
        Ok(ChatReply {
            responses,
            session_id,
            contexts_used,
        })
    }

    /// Contexts for this request: every request context (deduplicated, order
    /// kept) followed by the user's stored contexts not already named. The
    /// stored list itself is updated under the context cap.
    fn settle_contexts(
        &self,
        user: Option<&str>,
        requested: &[String],
    ) -> Result<Vec<String>, ApiError> {
        let mut used = BoundedList::new(requested.len());
        used.extend_front(requested);
        let mut used = used.into_items();

        let Some(user_id) = user else {
            return Ok(used);
        };
        let stored = self
            .contexts
            .get_contexts(user_id)?
            .map(|record| record.data.into_items())
            .unwrap_or_default();
        if !used.is_empty() {
            self.contexts
                .merge_contexts(user_id, requested, self.limits.context_capacity)?;
        }
        for item in stored {
            if !used.contains(&item) {
                used.push(item);
            }
        }
        Ok(used)
    }

    fn recent_messages(&self, user_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let Some(record) = self.history.get_history(user_id)? else {
            return Ok(Vec::new());
        };
        Ok(record
            .recent(self.limits.history_turns)
            .iter()
            .flat_map(|turn| {
                [
                    ChatMessage {
                        role: MessageRole::User,
                        content: build_user_prompt(&turn.question),
                    },
                    ChatMessage {
                        role: MessageRole::Assistant,
                        content: turn.answer.clone(),
                    },
                ]
            })
            .collect())
    }

    pub fn history(&self, user_id: &str) -> Result<Option<HistoryRecord>, ApiError> {
        let user_id = require_user_id(user_id)?;
        Ok(self.history.get_history(user_id)?)
    }

    /// The user's recent distinct questions, newest first.
    pub fn recent_questions(&self, user_id: &str) -> Result<Vec<String>, ApiError> {
        let user_id = require_user_id(user_id)?;
        Ok(self
            .questions
            .get_questions(user_id)?
            .map(|record| record.data.into_items())
            .unwrap_or_default())
    }

    pub fn contexts(&self, user_id: &str) -> Result<Vec<String>, ApiError> {
        let user_id = require_user_id(user_id)?;
        Ok(self
            .contexts
            .get_contexts(user_id)?
            .map(|record| record.data.into_items())
            .unwrap_or_default())
    }

    /// Returns whether the user had a context list.
    pub fn clear_contexts(&self, user_id: &str) -> Result<bool, ApiError> {
        let user_id = require_user_id(user_id)?;
        let existed = self.contexts.clear_contexts(user_id)?;
        info!(user_id, existed, "cleared contexts");
        Ok(existed)
    }
}

fn require_user_id(user_id: &str) -> Result<&str, ApiError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidRequest("User ID is required".to_string()));
    }
    Ok(trimmed)
}
