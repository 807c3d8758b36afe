//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量读取。覆盖类变量没有默认值：
//! 未设置时 `get()` 返回错误，调用方据此保留文件中的设置。

use std::env;
use std::fmt;
use std::time::Duration;

use crate::config::PageScope;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "MARKLENS_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.trim().to_lowercase().as_str() {
                level @ ("trace" | "debug" | "info" | "warn" | "error") => Ok(level.to_string()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// LLM 提供方相关环境变量
pub mod provider {
    use super::*;

    /// 提供方标识
    pub struct Provider;
    impl EnvVar<String> for Provider {
        const NAME: &'static str = "MARKLENS_PROVIDER";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "LLM provider: openai, anthropic, gemini";

        fn parse(value: &str) -> EnvResult<String> {
            let name = value.trim().to_lowercase();
            if name.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Provider must not be empty".to_string(),
                });
            }
            Ok(name)
        }
    }

    /// API key
    pub struct ApiKey;
    impl EnvVar<String> for ApiKey {
        const NAME: &'static str = "MARKLENS_API_KEY";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "API key for the configured provider";

        fn parse(value: &str) -> EnvResult<String> {
            let key = value.trim();
            if key.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API key must not be empty".to_string(),
                });
            }
            Ok(key.to_string())
        }
    }

    /// 模型覆盖
    pub struct Model;
    impl EnvVar<String> for Model {
        const NAME: &'static str = "MARKLENS_MODEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Model override (provider default when unset)";

        fn parse(value: &str) -> EnvResult<String> {
            let model = value.trim();
            if model.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Model must not be empty".to_string(),
                });
            }
            Ok(model.to_string())
        }
    }

    /// API 地址覆盖
    pub struct BaseUrl;
    impl EnvVar<String> for BaseUrl {
        const NAME: &'static str = "MARKLENS_BASE_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Provider API base URL override";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.trim_end_matches('/').to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Base URL must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// 请求超时
    pub struct Timeout;
    impl EnvVar<Duration> for Timeout {
        const NAME: &'static str = "MARKLENS_TIMEOUT_SECS";
        const DEFAULT: Option<Duration> = None;
        const DESCRIPTION: &'static str = "Provider request timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds = parse_positive_u64(value, Self::NAME, 1, 600)?;
            Ok(Duration::from_secs(seconds))
        }
    }
}

/// 页面会话相关环境变量
pub mod session {
    use super::*;

    /// 默认目标语言
    pub struct TargetLang;
    impl EnvVar<String> for TargetLang {
        const NAME: &'static str = "MARKLENS_TARGET_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Default target language, e.g. Japanese";

        fn parse(value: &str) -> EnvResult<String> {
            let lang = value.trim();
            if lang.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Language must not be empty".to_string(),
                });
            }
            Ok(lang.to_string())
        }
    }

    /// 页面范围
    pub struct Scope;
    impl EnvVar<PageScope> for Scope {
        const NAME: &'static str = "MARKLENS_PAGE_SCOPE";
        const DEFAULT: Option<PageScope> = None;
        const DESCRIPTION: &'static str = "Eligible pages: all, blob_only";

        fn parse(value: &str) -> EnvResult<PageScope> {
            value.parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: format!("Invalid page scope '{}'. Use: all, blob_only", value),
            })
        }
    }
}

fn parse_positive_u64(value: &str, var_name: &str, min: u64, max: u64) -> EnvResult<u64> {
    let num: u64 = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is above maximum {}", num, max),
        });
    }

    Ok(num)
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables\n\n");

    let entries: &[(&str, &str)] = &[
        (core::LogLevel::NAME, core::LogLevel::DESCRIPTION),
        (core::NoColor::NAME, core::NoColor::DESCRIPTION),
        (provider::Provider::NAME, provider::Provider::DESCRIPTION),
        (provider::ApiKey::NAME, provider::ApiKey::DESCRIPTION),
        (provider::Model::NAME, provider::Model::DESCRIPTION),
        (provider::BaseUrl::NAME, provider::BaseUrl::DESCRIPTION),
        (provider::Timeout::NAME, provider::Timeout::DESCRIPTION),
        (session::TargetLang::NAME, session::TargetLang::DESCRIPTION),
        (session::Scope::NAME, session::Scope::DESCRIPTION),
    ];

    for (name, description) in entries {
        docs.push_str(&format!("- `{}`: {}\n", name, description));
    }

    docs
}
