//! LLM 模块
//!
//! - **provider**: 提供方配置、统一的适配器和后端 trait
//! - **backends**: OpenAI、Anthropic 和 Gemini 的 HTTP 后端
//! - **governor**: 输入校验、请求节奏控制和错误归一化
//! - **api**: 各提供方的请求与响应结构

pub mod api;
pub mod backends;
pub mod governor;
pub mod provider;

pub use backends::build_backend;
pub use governor::{classify_error, classify_message, RequestGovernor};
pub use provider::{
    BackendFactory, ChatBackend, ChatRequest, LlmResult, ProviderAdapter, ProviderConfig,
    ProviderConfigPatch, ProviderKind, ProviderProfile, RawCompletion, TokenUsage,
};
