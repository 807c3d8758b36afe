//! HTTP 后端集成测试
//!
//! 使用 wiremock 模拟三个提供方的接口，检查请求形状、默认模型、用量映射和错误归一化。

use std::time::Duration;

use serde_json::json;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

use marklens::error::AssistError;
use marklens::llm::{ProviderAdapter, ProviderConfig, ProviderKind, RequestGovernor, TokenUsage};

fn adapter_for(provider: &str, server: &MockServer) -> ProviderAdapter {
    let config = ProviderConfig::new(provider, "sk-test")
        .unwrap()
        .with_base_url(&server.uri());
    ProviderAdapter::new(config)
        .unwrap()
        .with_governor(RequestGovernor::new(Duration::ZERO))
}

#[tokio::test]
async fn test_openai_chat_completion() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/v1/chat/completions"))
        .and(matchers::header("authorization", "Bearer sk-test"))
        .and(matchers::body_partial_json(json!({
            "model": "gpt-4o-mini",
            "max_tokens": 1024,
            "messages": [{"role": "user", "content": "Say hi"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": " Hi! "}}],
            "usage": {"prompt_tokens": 9, "completion_tokens": 2, "total_tokens": 11}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = adapter_for("openai", &server).generate("Say hi").await.unwrap();

    assert_eq!(result.text, "Hi!");
    assert_eq!(result.provider, ProviderKind::OpenAi);
    assert_eq!(result.model, "gpt-4o-mini-2024-07-18");
    assert_eq!(
        result.usage,
        Some(TokenUsage {
            prompt_tokens: 9,
            completion_tokens: 2,
            total_tokens: 11
        })
    );
}

#[tokio::test]
async fn test_anthropic_messages() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/v1/messages"))
        .and(matchers::header("x-api-key", "sk-test"))
        .and(matchers::header("anthropic-version", "2023-06-01"))
        .and(matchers::body_partial_json(json!({"model": "claude-3-5-haiku-latest"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_01",
            "type": "message",
            "model": "claude-3-5-haiku-latest",
            "content": [
                {"type": "text", "text": "Bonjour"},
                {"type": "text", "text": " tout le monde"}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 4}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let raw = adapter_for("anthropic", &server).invoke("Translate").await.unwrap();

    assert_eq!(raw.content, "Bonjour tout le monde");
    let usage = raw.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 12);
    assert_eq!(usage.completion_tokens, 4);
    assert_eq!(usage.total_tokens, 16);
}

#[tokio::test]
async fn test_gemini_generate_content() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(matchers::header("x-goog-api-key", "sk-test"))
        .and(matchers::body_partial_json(json!({
            "generationConfig": {"maxOutputTokens": 1024}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Resumen."}]}}],
            "usageMetadata": {"promptTokenCount": 20, "candidatesTokenCount": 3, "totalTokenCount": 23},
            "modelVersion": "gemini-1.5-flash-002"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = adapter_for("gemini", &server).generate("Summarize").await.unwrap();

    assert_eq!(result.text, "Resumen.");
    assert_eq!(result.model, "gemini-1.5-flash-002");
    assert_eq!(result.usage.unwrap().total_tokens, 23);
}

#[tokio::test]
async fn test_explicit_model_is_sent() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/v1beta/models/gemini-1.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "ok"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::new("gemini", "sk-test")
        .unwrap()
        .with_model("gemini-1.5-pro")
        .with_base_url(&server.uri());
    let adapter = ProviderAdapter::new(config).unwrap();

    assert_eq!(adapter.resolve_model_name(), "gemini-1.5-pro");
    let result = adapter.generate("Hello there").await.unwrap();
    // 响应没有报告模型时使用请求的模型
    assert_eq!(result.model, "gemini-1.5-pro");
}

#[tokio::test]
async fn test_error_bodies_are_classified() {
    let cases = [
        (401, r#"{"error": {"type": "authentication_error", "message": "invalid x-api-key"}}"#),
        (429, r#"{"error": {"type": "rate_limit_error", "message": "Rate limit exceeded"}}"#),
        (429, r#"{"error": {"code": "insufficient_quota", "message": "You exceeded your current quota"}}"#),
        (500, "Internal Server Error"),
    ];

    for (status, body) in cases {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;

        let err = adapter_for("anthropic", &server)
            .generate("Hello there")
            .await
            .unwrap_err();

        match (status, body.contains("quota"), &err) {
            (401, _, AssistError::Credential(_)) => {}
            (429, false, AssistError::RateLimited(_)) => {}
            (429, true, AssistError::Quota(_)) => {}
            (500, _, AssistError::Upstream(msg)) => assert!(msg.contains("Internal Server Error")),
            _ => panic!("status {} classified as {:?}", status, err),
        }
    }
}

#[tokio::test]
async fn test_empty_completion_is_failure() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "   "}}]
        })))
        .mount(&server)
        .await;

    let err = adapter_for("openai", &server).generate("Hello there").await.unwrap_err();
    assert!(matches!(err, AssistError::EmptyResult));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let err = adapter_for("openai", &server)
        .with_timeout(Duration::from_millis(200))
        .generate("Hello there")
        .await
        .unwrap_err();

    match &err {
        AssistError::Timeout(limit) => assert_eq!(*limit, Duration::from_millis(200)),
        other => panic!("unexpected error: {:?}", other),
    }
    // 不足一秒的超时不会显示为 0 秒
    assert!(err.user_message().contains("200ms"));
}
