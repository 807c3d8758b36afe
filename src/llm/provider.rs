//! LLM 提供方抽象
//!
//! 三个聊天补全后端只在构造参数上不同（API key 字段名、默认模型、token 上限字段名），
//! `ProviderAdapter` 把这些差异隐藏在同一个调用形式之后。构造时不发起任何网络请求。

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::constants;
use crate::error::{AssistError, AssistResult, ProviderError};
use crate::llm::backends::build_backend;
use crate::llm::governor::{classify_error, RequestGovernor};

/// 支持的提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
}

/// 提供方的构造参数描述
#[derive(Debug, Clone, Copy)]
pub struct ProviderProfile {
    pub id: &'static str,
    pub display_name: &'static str,
    pub default_model: &'static str,
    pub api_key_field: &'static str,
    pub token_limit_field: &'static str,
    pub default_base_url: &'static str,
}

const OPENAI_PROFILE: ProviderProfile = ProviderProfile {
    id: "openai",
    display_name: "OpenAI",
    default_model: "gpt-4o-mini",
    api_key_field: "openAIApiKey",
    token_limit_field: "max_tokens",
    default_base_url: "https://api.openai.com",
};

const ANTHROPIC_PROFILE: ProviderProfile = ProviderProfile {
    id: "anthropic",
    display_name: "Anthropic",
    default_model: "claude-3-5-haiku-latest",
    api_key_field: "anthropicApiKey",
    token_limit_field: "max_tokens",
    default_base_url: "https://api.anthropic.com",
};

const GEMINI_PROFILE: ProviderProfile = ProviderProfile {
    id: "gemini",
    display_name: "Google Gemini",
    default_model: "gemini-1.5-flash",
    api_key_field: "apiKey",
    token_limit_field: "maxOutputTokens",
    default_base_url: "https://generativelanguage.googleapis.com",
};

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::OpenAi, ProviderKind::Anthropic, ProviderKind::Gemini];

    pub fn profile(&self) -> &'static ProviderProfile {
        match self {
            ProviderKind::OpenAi => &OPENAI_PROFILE,
            ProviderKind::Anthropic => &ANTHROPIC_PROFILE,
            ProviderKind::Gemini => &GEMINI_PROFILE,
        }
    }

    pub fn id(&self) -> &'static str {
        self.profile().id
    }

    pub fn default_model(&self) -> &'static str {
        self.profile().default_model
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = AssistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(AssistError::Validation(format!(
                "unsupported provider '{}', expected one of: openai, anthropic, gemini",
                other
            ))),
        }
    }
}

/// 提供方配置
#[derive(Clone)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ProviderConfig {
    /// 解析提供方标识并创建配置；不支持的提供方或空 key 立即失败
    pub fn new(provider: &str, api_key: &str) -> AssistResult<Self> {
        let config = Self {
            provider: provider.parse()?,
            api_key: api_key.trim().to_string(),
            model: None,
            base_url: None,
            temperature: constants::DEFAULT_TEMPERATURE,
            max_tokens: constants::DEFAULT_MAX_TOKENS,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    pub fn validate(&self) -> AssistResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(AssistError::Credential(format!(
                "{} must not be empty for provider {}",
                self.provider.profile().api_key_field,
                self.provider
            )));
        }

        if self.max_tokens == 0 {
            return Err(AssistError::Validation(format!(
                "{} must be greater than 0",
                self.provider.profile().token_limit_field
            )));
        }

        Ok(())
    }

    /// 显式配置的模型，否则为提供方默认模型
    pub fn resolve_model_name(&self) -> String {
        match self.model.as_deref().map(str::trim) {
            Some(model) if !model.is_empty() => model.to_string(),
            _ => self.provider.default_model().to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(self.provider.profile().default_base_url)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// 部分配置，用于 `ProviderAdapter::reconfigure`
#[derive(Debug, Clone, Default)]
pub struct ProviderConfigPatch {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    /// `Some(None)` 清除显式模型
    pub model: Option<Option<String>>,
    pub base_url: Option<Option<String>>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// token 用量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// 单轮请求
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// 后端返回的原始内容
#[derive(Debug, Clone, Default)]
pub struct RawCompletion {
    pub content: String,
    pub usage: Option<TokenUsage>,
    /// 后端报告的模型（如果有）
    pub model: Option<String>,
}

/// 一次成功生成的结果，`text` 去掉首尾空白后非空
#[derive(Debug, Clone)]
pub struct LlmResult {
    pub text: String,
    pub provider: ProviderKind,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// 聊天补全后端
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// 发送单轮请求
    async fn chat(&self, request: &ChatRequest) -> Result<RawCompletion, ProviderError>;
}

/// 根据配置构建后端
pub type BackendFactory = Arc<dyn Fn(&ProviderConfig) -> Arc<dyn ChatBackend> + Send + Sync>;

/// 提供方适配器
///
/// 每个实例拥有自己的 `RequestGovernor`，因此限流状态不会在适配器之间共享。
pub struct ProviderAdapter {
    config: ProviderConfig,
    backend: Arc<dyn ChatBackend>,
    factory: BackendFactory,
    governor: RequestGovernor,
    request_timeout: Duration,
}

impl ProviderAdapter {
    /// 使用内置的 HTTP 后端创建适配器
    pub fn new(config: ProviderConfig) -> AssistResult<Self> {
        Self::with_factory(config, Arc::new(build_backend))
    }

    /// 使用自定义后端工厂创建适配器（测试或代理场景）
    pub fn with_factory(config: ProviderConfig, factory: BackendFactory) -> AssistResult<Self> {
        config.validate()?;
        let backend = factory(&config);

        tracing::debug!(
            "创建提供方适配器: provider={}, model={}",
            config.provider,
            config.resolve_model_name()
        );

        Ok(Self {
            config,
            backend,
            factory,
            governor: RequestGovernor::default(),
            request_timeout: constants::DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// 替换请求节奏控制器
    pub fn with_governor(mut self, governor: RequestGovernor) -> Self {
        self.governor = governor;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn provider(&self) -> ProviderKind {
        self.config.provider
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn governor(&self) -> &RequestGovernor {
        &self.governor
    }

    /// 当前生效的模型名称，永远不为空
    pub fn resolve_model_name(&self) -> String {
        self.config.resolve_model_name()
    }

    /// 合并部分配置并重建后端；失败时保留原配置
    pub fn reconfigure(&mut self, patch: ProviderConfigPatch) -> AssistResult<()> {
        let mut next = self.config.clone();

        if let Some(provider) = patch.provider {
            next.provider = provider.parse()?;
        }
        if let Some(api_key) = patch.api_key {
            next.api_key = api_key.trim().to_string();
        }
        if let Some(model) = patch.model {
            next.model = model;
        }
        if let Some(base_url) = patch.base_url {
            next.base_url = base_url;
        }
        if let Some(temperature) = patch.temperature {
            next.temperature = temperature;
        }
        if let Some(max_tokens) = patch.max_tokens {
            next.max_tokens = max_tokens;
        }

        next.validate()?;

        self.backend = (self.factory)(&next);
        self.config = next;

        tracing::info!(
            "提供方已重新配置: provider={}, model={}",
            self.config.provider,
            self.resolve_model_name()
        );

        Ok(())
    }

    /// 发送单轮请求并返回原始内容，不经过校验、限流和错误归一化
    pub async fn invoke(&self, prompt: &str) -> Result<RawCompletion, ProviderError> {
        let request = ChatRequest {
            model: self.resolve_model_name(),
            prompt: prompt.to_string(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        self.backend.chat(&request).await
    }

    /// 经过节奏控制的生成
    ///
    /// 顺序：输入校验 → 限流等待 → 带超时的请求 → 错误归一化 → 空结果检查。
    /// 校验失败的请求不会占用限流时间槽。
    pub async fn generate(&self, prompt: &str) -> AssistResult<LlmResult> {
        self.governor.validate_input(prompt)?;
        self.governor.enforce_rate_limit().await;

        let model = self.resolve_model_name();
        tracing::info!(
            "发送请求: provider={}, model={}, chars={}",
            self.config.provider,
            model,
            prompt.chars().count()
        );

        let raw = match tokio::time::timeout(self.request_timeout, self.invoke(prompt)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!("后端请求失败 (status={:?}): {}", e.status(), e);
                return Err(classify_error(&e));
            }
            Err(_) => return Err(AssistError::Timeout(self.request_timeout)),
        };

        let text = raw.content.trim();
        if text.is_empty() {
            return Err(AssistError::EmptyResult);
        }

        if let Some(usage) = raw.usage {
            tracing::debug!(
                "token 用量: prompt={}, completion={}, total={}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }

        Ok(LlmResult {
            text: text.to_string(),
            provider: self.config.provider,
            model: raw.model.unwrap_or(model),
            usage: raw.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct EchoBackend {
        seen: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn chat(&self, request: &ChatRequest) -> Result<RawCompletion, ProviderError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(RawCompletion {
                content: format!("  echo: {}  ", request.prompt),
                usage: None,
                model: None,
            })
        }
    }

    fn echo_factory() -> BackendFactory {
        Arc::new(|_config: &ProviderConfig| -> Arc<dyn ChatBackend> {
            Arc::new(EchoBackend {
                seen: Mutex::new(Vec::new()),
            })
        })
    }

    #[test]
    fn test_unsupported_provider_fails_construction() {
        let err = ProviderConfig::new("cohere", "key").unwrap_err();
        assert!(matches!(err, AssistError::Validation(_)));
        assert!(err.to_string().contains("cohere"));
    }

    #[test]
    fn test_empty_credential_fails_construction() {
        let err = ProviderConfig::new("gemini", "   ").unwrap_err();
        assert!(matches!(err, AssistError::Credential(_)));
        assert!(err.to_string().contains("apiKey"));
    }

    #[test]
    fn test_default_models() {
        for kind in ProviderKind::ALL {
            let config = ProviderConfig::new(kind.id(), "key").unwrap();
            let adapter = ProviderAdapter::with_factory(config, echo_factory()).unwrap();
            assert_eq!(adapter.resolve_model_name(), kind.default_model());
            assert!(!adapter.resolve_model_name().is_empty());
        }
    }

    #[test]
    fn test_explicit_model_overrides_default() {
        let config = ProviderConfig::new("anthropic", "key")
            .unwrap()
            .with_model("claude-3-opus-latest");
        assert_eq!(config.resolve_model_name(), "claude-3-opus-latest");
    }

    #[test]
    fn test_reconfigure_merges_and_keeps_old_config_on_error() {
        let config = ProviderConfig::new("openai", "key").unwrap();
        let mut adapter = ProviderAdapter::with_factory(config, echo_factory()).unwrap();

        adapter
            .reconfigure(ProviderConfigPatch {
                provider: Some("gemini".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(adapter.provider(), ProviderKind::Gemini);
        assert_eq!(adapter.resolve_model_name(), "gemini-1.5-flash");
        assert_eq!(adapter.config().api_key, "key");

        let err = adapter.reconfigure(ProviderConfigPatch {
            provider: Some("nope".to_string()),
            model: Some(Some("x".to_string())),
            ..Default::default()
        });
        assert!(err.is_err());
        assert_eq!(adapter.provider(), ProviderKind::Gemini);
        assert!(adapter.config().model.is_none());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ProviderConfig::new("openai", "sk-secret").unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
    }

    #[tokio::test]
    async fn test_generate_trims_content() {
        let config = ProviderConfig::new("openai", "key").unwrap();
        let adapter = ProviderAdapter::with_factory(config, echo_factory())
            .unwrap()
            .with_governor(RequestGovernor::new(Duration::ZERO));

        let result = adapter.generate("hello").await.unwrap();
        assert_eq!(result.text, "echo: hello");
        assert_eq!(result.model, "gpt-4o-mini");
        assert_eq!(result.provider, ProviderKind::OpenAi);
    }
}
