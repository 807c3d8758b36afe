//! 设置管理器
//!
//! 提供统一的设置接口，支持文件配置、环境变量和默认值。
//! 设置只在启动时读取一次，之后以 `ProviderConfig` 和默认语言的形式交给核心流程。

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::error::helpers::config_error;
use crate::error::{AssistError, AssistResult};
use crate::llm::ProviderConfig;
use crate::tasks::PromptTemplate;

/// 页面范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageScope {
    /// 文件、issue、pull request 和 wiki 页面
    #[default]
    All,
    /// 仅文件（blob）页面
    BlobOnly,
}

impl std::str::FromStr for PageScope {
    type Err = AssistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(PageScope::All),
            "blob_only" | "blob-only" | "blob" => Ok(PageScope::BlobOnly),
            other => Err(AssistError::Config(format!("未知的页面范围: {}", other))),
        }
    }
}

/// 持久化设置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtensionSettings {
    // 提供方
    pub provider: String,
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,

    // 用户偏好
    pub default_language: String,
    pub summary_template: PromptTemplate,

    // 页面
    pub target_host: String,
    pub page_scope: PageScope,

    // 请求节奏
    pub request_timeout_secs: u64,
    pub min_request_interval_ms: u64,
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
    pub batch_delay_ms: u64,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key: String::new(),
            model: None,
            base_url: None,
            temperature: constants::DEFAULT_TEMPERATURE,
            max_tokens: constants::DEFAULT_MAX_TOKENS,

            default_language: constants::DEFAULT_LANGUAGE.to_string(),
            summary_template: PromptTemplate::Summary,

            target_host: constants::DEFAULT_TARGET_HOST.to_string(),
            page_scope: PageScope::All,

            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT.as_secs(),
            min_request_interval_ms: constants::MIN_REQUEST_INTERVAL.as_millis() as u64,
            max_retries: constants::DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: constants::RETRY_BASE_DELAY.as_millis() as u64,
            batch_delay_ms: constants::BATCH_DELAY.as_millis() as u64,
        }
    }
}

impl ExtensionSettings {
    /// 校验设置
    ///
    /// 不检查 provider 和 API key：它们在构造 `ProviderAdapter` 时校验。
    pub fn validate(&self) -> AssistResult<()> {
        if self.target_host.trim().is_empty() {
            return Err(AssistError::Config("目标站点不能为空".to_string()));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AssistError::Config(format!(
                "temperature 必须在 0.0 到 2.0 之间: {}",
                self.temperature
            )));
        }

        if self.max_tokens == 0 {
            return Err(AssistError::Config("max_tokens 不能为0".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(AssistError::Config("请求超时不能为0".to_string()));
        }

        if self.max_retries == 0 {
            return Err(AssistError::Config("最大尝试次数不能为0".to_string()));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{provider, session, EnvVar};

        if let Ok(name) = provider::Provider::get() {
            self.provider = name;
        }

        if let Ok(key) = provider::ApiKey::get() {
            self.api_key = key;
        }

        if let Ok(model) = provider::Model::get() {
            self.model = Some(model);
        }

        if let Ok(base_url) = provider::BaseUrl::get() {
            tracing::info!("环境变量覆盖 API 地址: {}", base_url);
            self.base_url = Some(base_url);
        }

        if let Ok(timeout) = provider::Timeout::get() {
            self.request_timeout_secs = timeout.as_secs();
        }

        if let Ok(lang) = session::TargetLang::get() {
            self.default_language = lang;
        }

        if let Ok(scope) = session::Scope::get() {
            self.page_scope = scope;
        }
    }

    /// 转换为提供方配置
    pub fn provider_config(&self) -> AssistResult<ProviderConfig> {
        let mut config = ProviderConfig::new(&self.provider, &self.api_key)?;
        config.model = self.model.clone().filter(|m| !m.trim().is_empty());
        config.base_url = self.base_url.clone();
        config.temperature = self.temperature;
        config.max_tokens = self.max_tokens;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    settings: ExtensionSettings,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new() -> AssistResult<Self> {
        let mut settings = Self::load_settings()?;
        settings.apply_env_overrides();
        settings.validate()?;

        Ok(Self { settings })
    }

    /// 从指定文件创建（仍然应用环境变量覆盖）
    pub fn from_file(path: &str) -> AssistResult<Self> {
        Self::load_dotenv();
        let mut settings = Self::load_from_file(path)?;
        settings.apply_env_overrides();
        settings.validate()?;

        Ok(Self { settings })
    }

    /// 获取设置
    pub fn settings(&self) -> &ExtensionSettings {
        &self.settings
    }

    pub fn into_settings(self) -> ExtensionSettings {
        self.settings
    }

    /// 从搜索路径加载设置
    fn load_settings() -> AssistResult<ExtensionSettings> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(ExtensionSettings::default())
    }

    /// 从指定文件加载设置
    fn load_from_file(path: &str) -> AssistResult<ExtensionSettings> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| config_error(format!("读取配置文件失败 {}: {}", path, e)))?;

        Self::parse_settings(path, &content)
    }

    /// 按扩展名解析：`.json` 为 JSON，其余按 TOML
    pub fn parse_settings(path: &str, content: &str) -> AssistResult<ExtensionSettings> {
        if path.ends_with(".json") {
            Ok(serde_json::from_str(content)?)
        } else {
            Ok(toml::from_str(content)?)
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> AssistResult<()> {
        let settings = ExtensionSettings::default();
        let content = toml::to_string_pretty(&settings)
            .map_err(|e| config_error(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)?;

        Ok(())
    }
}
