//! Prompt construction shared by every provider.

use crate::provider::{ChatMessage, MessageRole};

/// Fixed instruction sent as the system message.
pub const SYSTEM_PROMPT: &str = "You are a healthcare assistant.
Only respond to health-related questions.
Give helpful, clear, and simple information without giving strict instructions or commands.
If the question is not about health, reply:
\"I'm here to help only with health-related questions.\"";

/// System message, personalized with the patient's context when any is known.
pub fn build_system_message(contexts: &[String]) -> String {
    if contexts.is_empty() {
        return SYSTEM_PROMPT.to_string();
    }
    format!(
        "{}\n\nConsider the patient's context: {}. Provide personalized health information based on this context.",
        SYSTEM_PROMPT,
        contexts.join(", ")
    )
}

pub fn build_user_prompt(message: &str) -> String {
    format!("Patient Question: {}", message)
}

/// Full message list: system, prior turns (oldest first), then the question.
pub fn build_messages(
    message: &str,
    contexts: &[String],
    history: &[ChatMessage],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage {
        role: MessageRole::System,
        content: build_system_message(contexts),
    });
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage {
        role: MessageRole::User,
        content: build_user_prompt(message),
    });
    messages
}
