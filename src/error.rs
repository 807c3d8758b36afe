//! 统一错误处理
//!
//! 提供结构化错误类型：校验类错误在任何网络请求之前产生，
//! 后端错误经 `RequestGovernor::classify_error` 归一化为稳定的类别。

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// 后端原始错误（未归一化）
///
/// 只由 `llm` 模块的后端客户端产生，上层不直接向用户展示。
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// 网络错误
    #[error("network error: {0}")]
    Network(String),

    /// 后端返回了非成功状态码
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// 响应解析失败
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl ProviderError {
    /// 返回 HTTP 状态码（如果有）
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// 区域标识，由 `Enhancer` 的区域表分配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub usize);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 处理流程中可能出现的错误
#[derive(Error, Debug, Clone)]
pub enum AssistError {
    /// 输入校验错误（空输入、超长输入、句数越界、不支持的 provider）
    #[error("invalid input: {0}")]
    Validation(String),

    /// 清洗后的文本没有可处理的内容
    #[error("nothing to process: {0}")]
    ContentUnusable(String),

    /// 后端限流
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// API key 无效或缺失
    #[error("credential rejected: {0}")]
    Credential(String),

    /// 配额或账单问题
    #[error("quota exceeded: {0}")]
    Quota(String),

    /// 其他后端错误，保留原始信息
    #[error("generation failed: {0}")]
    Upstream(String),

    /// 后端返回成功但内容为空
    #[error("the model returned an empty result")]
    EmptyResult,

    /// 请求超时
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// 同一区域已有请求在处理中
    #[error("region {0} already has a request in flight")]
    RegionBusy(RegionId),

    /// 区域不存在
    #[error("unknown region {0}")]
    UnknownRegion(RegionId),

    /// 批量处理中某一项失败
    #[error("batch aborted at item {index}: {source}")]
    BatchItem {
        index: usize,
        #[source]
        source: Box<AssistError>,
    },

    /// 配置错误
    #[error("configuration error: {0}")]
    Config(String),
}

impl AssistError {
    /// 检查错误是否可重试
    ///
    /// 只有限流错误允许在编排层重试，其他类别立即失败。
    pub fn is_retryable(&self) -> bool {
        matches!(self, AssistError::RateLimited(_))
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AssistError::Validation(_) => ErrorSeverity::Info,
            AssistError::ContentUnusable(_) => ErrorSeverity::Info,
            AssistError::RegionBusy(_) => ErrorSeverity::Info,
            AssistError::RateLimited(_) => ErrorSeverity::Warning,
            AssistError::Timeout(_) => ErrorSeverity::Warning,
            AssistError::EmptyResult => ErrorSeverity::Warning,
            AssistError::UnknownRegion(_) => ErrorSeverity::Warning,
            AssistError::Upstream(_) => ErrorSeverity::Error,
            AssistError::BatchItem { source, .. } => source.severity(),
            AssistError::Credential(_) => ErrorSeverity::Critical,
            AssistError::Quota(_) => ErrorSeverity::Critical,
            AssistError::Config(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            AssistError::Validation(_) => ErrorCategory::Validation,
            AssistError::ContentUnusable(_) => ErrorCategory::ContentUnusable,
            AssistError::RateLimited(_) => ErrorCategory::RateLimit,
            AssistError::Credential(_) => ErrorCategory::Credential,
            AssistError::Quota(_) => ErrorCategory::Quota,
            AssistError::Upstream(_) => ErrorCategory::Upstream,
            AssistError::EmptyResult => ErrorCategory::EmptyResult,
            AssistError::Timeout(_) => ErrorCategory::Timeout,
            AssistError::RegionBusy(_) | AssistError::UnknownRegion(_) => ErrorCategory::Region,
            AssistError::BatchItem { source, .. } => source.category(),
            AssistError::Config(_) => ErrorCategory::Configuration,
        }
    }

    /// 面向用户的提示文本（用于全局 toast）
    pub fn user_message(&self) -> String {
        match self {
            AssistError::Validation(msg) => format!("Invalid request: {}", msg),
            AssistError::ContentUnusable(_) => {
                "Nothing to process: this section has too little text.".to_string()
            }
            AssistError::RateLimited(_) => {
                "The provider is rate limiting requests. Please wait a moment and try again."
                    .to_string()
            }
            AssistError::Credential(_) => {
                "The API key was rejected. Check the key in your settings.".to_string()
            }
            AssistError::Quota(_) => {
                "Your provider quota is exhausted. Check your plan and billing details."
                    .to_string()
            }
            AssistError::Upstream(msg) => format!("Generation failed: {}", msg),
            AssistError::EmptyResult => "The model returned an empty response.".to_string(),
            AssistError::Timeout(limit) => {
                format!("The provider did not respond within {:?}.", limit)
            }
            AssistError::RegionBusy(_) => "This section is still being processed.".to_string(),
            AssistError::UnknownRegion(_) => "This section is no longer on the page.".to_string(),
            AssistError::BatchItem { index, source } => {
                format!("Item {} failed. {}", index + 1, source.user_message())
            }
            AssistError::Config(msg) => format!("Configuration problem: {}", msg),
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    ContentUnusable,
    RateLimit,
    Credential,
    Quota,
    Upstream,
    EmptyResult,
    Timeout,
    Region,
    Configuration,
}

impl From<std::io::Error> for AssistError {
    fn from(error: std::io::Error) -> Self {
        AssistError::Config(format!("IO错误: {}", error))
    }
}

impl From<toml::de::Error> for AssistError {
    fn from(error: toml::de::Error) -> Self {
        AssistError::Config(format!("TOML解析错误: {}", error))
    }
}

impl From<serde_json::Error> for AssistError {
    fn from(error: serde_json::Error) -> Self {
        AssistError::Config(format!("JSON解析错误: {}", error))
    }
}

/// 错误结果类型别名
pub type AssistResult<T> = Result<T, AssistError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 记录并返回错误
    pub fn log_error<T>(error: AssistError) -> AssistResult<T> {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("请求未执行: {}", error),
            ErrorSeverity::Warning => tracing::warn!("请求警告: {}", error),
            ErrorSeverity::Error => tracing::error!("请求错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("请求严重错误: {}", error),
        }

        Err(error)
    }

    /// 创建输入校验错误
    pub fn validation_error<T: fmt::Display>(msg: T) -> AssistError {
        AssistError::Validation(msg.to_string())
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> AssistError {
        AssistError::Config(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rate_limit_is_retryable() {
        assert!(AssistError::RateLimited("slow down".into()).is_retryable());
        assert!(!AssistError::Credential("bad key".into()).is_retryable());
        assert!(!AssistError::Quota("billing".into()).is_retryable());
        assert!(!AssistError::Upstream("boom".into()).is_retryable());
        assert!(!AssistError::EmptyResult.is_retryable());
        assert!(!AssistError::Validation("empty".into()).is_retryable());
    }

    #[test]
    fn test_batch_item_inherits_category() {
        let err = AssistError::BatchItem {
            index: 2,
            source: Box::new(AssistError::Quota("out of credits".into())),
        };
        assert_eq!(err.category(), ErrorCategory::Quota);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_message().starts_with("Item 3 failed."));
    }

    #[test]
    fn test_user_messages_are_distinct_per_category() {
        let credential = AssistError::Credential("x".into()).user_message();
        let quota = AssistError::Quota("x".into()).user_message();
        let rate = AssistError::RateLimited("x".into()).user_message();
        assert_ne!(credential, quota);
        assert_ne!(quota, rate);
        assert!(credential.contains("API key"));
    }

    #[test]
    fn test_content_unusable_message_is_action_neutral() {
        let message = AssistError::ContentUnusable("too short".into()).user_message();
        assert!(!message.contains("translat"));
        assert!(message.contains("too little text"));
    }

    #[test]
    fn test_timeout_message_keeps_sub_second_precision() {
        let err = AssistError::Timeout(Duration::from_millis(1500));
        assert!(err.user_message().contains("1.5s"));
        assert!(err.to_string().contains("1.5s"));
    }

    #[test]
    fn test_upstream_keeps_original_message() {
        let err = AssistError::Upstream("model overloaded".into());
        assert!(err.to_string().contains("model overloaded"));
        assert!(err.user_message().contains("model overloaded"));
    }

    #[test]
    fn test_provider_error_status() {
        let err = ProviderError::Api {
            status: 429,
            message: "Too Many Requests".into(),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(ProviderError::Network("reset".into()).status(), None);
    }
}
