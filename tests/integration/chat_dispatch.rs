//! End-to-end dispatch through the real provider clients against a local fake API

use super::test_utils::{FakeProvider, TestApp};
use axum::http::StatusCode;
use carechat::chat::ChatRequest;
use carechat::config::{apply_env_overrides_with, CarechatConfig, LimitsConfig};
use carechat::provider::{ProviderConfig, ProviderKind, ProviderRegistry};
use serde_json::json;

fn config_for(kind: ProviderKind, endpoint: String) -> CarechatConfig {
    let mut config = CarechatConfig::default();
    config.providers.insert(
        kind.as_str().to_string(),
        ProviderConfig {
            api_key: Some("test-key".to_string()),
            endpoint: Some(endpoint),
            ..ProviderConfig::default()
        },
    );
    config
}

fn app_for(kind: ProviderKind, endpoint: String) -> TestApp {
    let config = config_for(kind, endpoint);
    let registry = ProviderRegistry::from_config(&config).unwrap();
    TestApp::with_registry(registry, LimitsConfig::default())
}

fn ask(message: &str, api: &str, user: Option<&str>, contexts: &[&str]) -> ChatRequest {
    ChatRequest {
        message: message.to_string(),
        selected_api: Some(api.to_string()),
        contexts: contexts.iter().map(|c| c.to_string()).collect(),
        user_id: user.map(str::to_string),
        ..ChatRequest::default()
    }
}

#[tokio::test]
async fn openai_request_shape_and_answer() {
    let fake = FakeProvider::start(StatusCode::OK, FakeProvider::openai_reply("Stay hydrated.")).await;
    let app = app_for(ProviderKind::OpenAI, fake.base_url("v1"));

    let reply = app
        .chat
        .send_message(ask("I feel dizzy", "openai", Some("u1"), &["age 70"]))
        .await
        .unwrap();

    let answer = &reply.responses[&ProviderKind::OpenAI];
    assert_eq!(answer.answer, "Stay hydrated.");
    assert_eq!(answer.model.as_deref(), Some("gpt-4o-mini-2024-07-18"));
    assert!(answer.error.is_none());
    assert_eq!(reply.contexts_used, vec!["age 70"]);

    let recorded = fake.recorded();
    assert_eq!(recorded.len(), 1);
    let request = &recorded[0];
    assert_eq!(request.path, "chat/completions");
    assert_eq!(request.authorization.as_deref(), Some("Bearer test-key"));
    assert_eq!(request.body["model"], "gpt-4o-mini");
    let messages = request.body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert!(messages[0]["content"]
        .as_str()
        .unwrap()
        .contains("Consider the patient's context: age 70."));
    assert_eq!(
        messages[1],
        json!({"role": "user", "content": "Patient Question: I feel dizzy"})
    );
}

#[tokio::test]
async fn grok_and_deepseek_use_their_default_models() {
    for (kind, model) in [
        (ProviderKind::Grok, "grok-4"),
        (ProviderKind::DeepSeek, "deepseek-chat"),
    ] {
        let fake = FakeProvider::start(StatusCode::OK, FakeProvider::openai_reply("ok")).await;
        let app = app_for(kind, fake.base_url("v1"));
        app.chat
            .send_message(ask("q", kind.as_str(), None, &[]))
            .await
            .unwrap();
        assert_eq!(fake.recorded()[0].body["model"], model);
    }
}

#[tokio::test]
async fn gemini_request_shape_and_answer() {
    let fake = FakeProvider::start(StatusCode::OK, FakeProvider::gemini_reply("Rest well.")).await;
    let app = app_for(ProviderKind::Gemini, fake.base_url("v1beta"));

    let reply = app
        .chat
        .send_message(ask("Sore throat?", "gemini", None, &["smoker"]))
        .await
        .unwrap();
    assert_eq!(reply.responses[&ProviderKind::Gemini].answer, "Rest well.");

    let request = &fake.recorded()[0];
    assert_eq!(request.path, "models/gemini-2.0-flash:generateContent");
    assert_eq!(request.query.get("key").map(String::as_str), Some("test-key"));
    assert!(request.authorization.is_none());

    let contents = request.body["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0]["role"], "user");
    let text = contents[0]["parts"][0]["text"].as_str().unwrap();
    // The question is sent even when contexts are present
    assert!(text.contains("Consider the patient's context: smoker."));
    assert!(text.ends_with("Patient Question: Sore throat?"));
}

#[tokio::test]
async fn auth_failure_becomes_fallback_with_error() {
    let fake = FakeProvider::start(
        StatusCode::UNAUTHORIZED,
        json!({"error": {"message": "Incorrect API key provided"}}),
    )
    .await;
    let app = app_for(ProviderKind::OpenAI, fake.base_url("v1"));

    let reply = app
        .chat
        .send_message(ask("q", "openai", Some("u1"), &[]))
        .await
        .unwrap();
    let answer = &reply.responses[&ProviderKind::OpenAI];
    assert_eq!(answer.answer, "No response from OpenAI.");
    let error = answer.error.as_deref().unwrap();
    assert!(error.starts_with("Provider authentication failed"));
    assert!(error.contains("Incorrect API key"));

    // Failed calls are not written to history
    assert!(app.chat.history("u1").unwrap().is_none());
}

#[tokio::test]
async fn empty_choices_become_fallback_without_error() {
    let fake = FakeProvider::start(StatusCode::OK, json!({"choices": []})).await;
    let app = app_for(ProviderKind::DeepSeek, fake.base_url("v1"));

    let reply = app
        .chat
        .send_message(ask("q", "deepseek", None, &[]))
        .await
        .unwrap();
    let answer = &reply.responses[&ProviderKind::DeepSeek];
    assert_eq!(answer.answer, "No response from DeepSeek.");
    assert!(answer.error.is_none());
}

#[tokio::test]
async fn unreachable_provider_becomes_fallback() {
    // Nothing listens on port 9 locally
    let app = app_for(ProviderKind::Grok, "http://127.0.0.1:9/v1".to_string());
    let reply = app
        .chat
        .send_message(ask("q", "grok", None, &[]))
        .await
        .unwrap();
    let answer = &reply.responses[&ProviderKind::Grok];
    assert_eq!(answer.answer, "No response from Grok AI.");
    assert!(answer.error.is_some());
}

#[tokio::test]
async fn history_is_forwarded_to_provider() {
    let fake = FakeProvider::start(StatusCode::OK, FakeProvider::openai_reply("noted")).await;
    let app = app_for(ProviderKind::OpenAI, fake.base_url("v1"));

    app.chat
        .send_message(ask("first question", "openai", Some("u9"), &[]))
        .await
        .unwrap();
    let mut second = ask("second question", "openai", Some("u9"), &[]);
    second.include_history = true;
    app.chat.send_message(second).await.unwrap();

    let recorded = fake.recorded();
    let messages = recorded[1].body["messages"].as_array().unwrap();
    let roles: Vec<&str> = messages.iter().map(|m| m["role"].as_str().unwrap()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    assert_eq!(messages[1]["content"], "Patient Question: first question");
    assert_eq!(messages[2]["content"], "noted");
}

#[tokio::test]
async fn full_url_variables_reach_the_right_path() {
    let openai = FakeProvider::start(StatusCode::OK, FakeProvider::openai_reply("fine")).await;
    let gemini = FakeProvider::start(StatusCode::OK, FakeProvider::gemini_reply("also fine")).await;
    let openai_url = format!("{}/chat/completions", openai.base_url("v1"));
    let gemini_url = format!(
        "{}/models/gemini-1.5-flash:generateContent?key=",
        gemini.base_url("v1beta")
    );
    let vars = [
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_URL", openai_url.as_str()),
        ("GEMINI_API_KEY", "g-test"),
        ("GEMINI_URL", gemini_url.as_str()),
    ];
    let config = apply_env_overrides_with(CarechatConfig::default(), |name| {
        vars.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    })
    .unwrap();
    let registry = ProviderRegistry::from_config(&config).unwrap();
    let app = TestApp::with_registry(registry, LimitsConfig::default());

    let reply = app.chat.send_message(ask("q", "openai", None, &[])).await.unwrap();
    assert_eq!(reply.responses[&ProviderKind::OpenAI].answer, "fine");
    assert_eq!(openai.recorded()[0].path, "chat/completions");

    let reply = app.chat.send_message(ask("q", "gemini", None, &[])).await.unwrap();
    assert_eq!(reply.responses[&ProviderKind::Gemini].answer, "also fine");
    let request = &gemini.recorded()[0];
    assert_eq!(request.path, "models/gemini-1.5-flash:generateContent");
    assert_eq!(request.query.get("key").map(String::as_str), Some("g-test"));
}
