//! 请求节奏控制集成测试

use std::time::Duration;

use tokio::time::Instant;

use marklens::error::{AssistError, ProviderError};
use marklens::llm::{classify_error, classify_message, ProviderKind};

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::MockBackend;

#[tokio::test(start_paused = true)]
async fn test_sequential_dispatches_are_spaced() {
    let backend = MockBackend::new();
    let adapter = backend.paced_adapter("openai");

    let start = Instant::now();
    adapter.generate("first request").await.unwrap();
    let first = adapter.governor().last_dispatch().await.unwrap();
    adapter.generate("second request").await.unwrap();
    let second = adapter.governor().last_dispatch().await.unwrap();

    assert!(first - start < Duration::from_millis(1000));
    assert!(second - first >= Duration::from_millis(1000));
    assert_eq!(backend.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_are_queued() {
    let backend = MockBackend::new();
    let adapter = backend.paced_adapter("anthropic");

    let start = Instant::now();
    let (a, b, c) = tokio::join!(
        adapter.generate("one"),
        adapter.generate("two"),
        adapter.generate("three")
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert!(start.elapsed() >= Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn test_adapters_do_not_share_rate_state() {
    let backend = MockBackend::new();
    let openai = backend.paced_adapter("openai");
    let gemini = backend.paced_adapter("gemini");

    let start = Instant::now();
    openai.generate("first").await.unwrap();
    gemini.generate("second").await.unwrap();

    assert!(start.elapsed() < Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_input_does_not_consume_slot() {
    let backend = MockBackend::new();
    let adapter = backend.paced_adapter("openai");

    let err = adapter.generate("   ").await.unwrap_err();
    assert!(matches!(err, AssistError::Validation(_)));

    let err = adapter.generate(&"x".repeat(50_001)).await.unwrap_err();
    assert!(matches!(err, AssistError::Validation(_)));

    assert!(adapter.governor().last_dispatch().await.is_none());
    assert_eq!(backend.calls(), 0);

    let start = Instant::now();
    adapter.generate("valid request").await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(1000));
}

#[test]
fn test_error_classification_categories() {
    assert!(matches!(classify_message("rate limit exceeded"), AssistError::RateLimited(_)));
    assert!(matches!(classify_message("Invalid API key"), AssistError::Credential(_)));
    assert!(matches!(classify_message("quota exceeded for this month"), AssistError::Quota(_)));

    match classify_message("The server had an error while processing your request") {
        AssistError::Upstream(msg) => {
            assert_eq!(msg, "The server had an error while processing your request")
        }
        other => panic!("unexpected category: {:?}", other),
    }

    let network = ProviderError::Network("connection reset by peer".to_string());
    match classify_error(&network) {
        AssistError::Upstream(msg) => assert!(msg.contains("connection reset by peer")),
        other => panic!("unexpected category: {:?}", other),
    }
}

#[test]
fn test_default_models() {
    let backend = MockBackend::new();
    let expected = [
        ("openai", ProviderKind::OpenAi, "gpt-4o-mini"),
        ("anthropic", ProviderKind::Anthropic, "claude-3-5-haiku-latest"),
        ("gemini", ProviderKind::Gemini, "gemini-1.5-flash"),
    ];

    for (id, kind, model) in expected {
        let adapter = backend.adapter(id);
        assert_eq!(adapter.provider(), kind);
        assert_eq!(adapter.resolve_model_name(), model);
    }
}

#[tokio::test]
async fn test_default_model_is_sent_to_backend() {
    let backend = MockBackend::new();
    backend.adapter("anthropic").generate("hello there").await.unwrap();
    assert_eq!(backend.last_model().as_deref(), Some("claude-3-5-haiku-latest"));
}
