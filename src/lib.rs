//! # MarkLens Library
//!
//! 为 GitHub 渲染后的 Markdown 内容提供按需翻译和摘要，语言处理交给可插拔的 LLM 提供方。
//!
//! ## 模块组织
//!
//! - `core` - 页面增强器，串联整个处理流程
//! - `parsers` - HTML 解析与 DOM 操作
//! - `pipeline` - 内容区域发现和文本清洗
//! - `llm` - 提供方适配器、HTTP 后端和请求节奏控制
//! - `tasks` - 翻译与摘要服务
//! - `render` - 控件注入与结果渲染
//! - `config` - 常量和配置加载
//! - `env` - 环境变量
//! - `error` - 错误类型

pub mod config;
pub mod core;
pub mod env;
pub mod error;
pub mod llm;
pub mod parsers;
pub mod pipeline;
pub mod render;
pub mod tasks;

// Re-export commonly used items for convenience
pub use crate::core::{ActionOptions, Enhancer};
pub use config::{ConfigManager, ExtensionSettings, PageScope};
pub use error::{AssistError, AssistResult, ErrorCategory, ProviderError, RegionId};
pub use llm::{LlmResult, ProviderAdapter, ProviderConfig, ProviderKind};
pub use pipeline::{ContentClassifier, ContentRegion, PageContext};
pub use render::{Action, ResultRenderer};
