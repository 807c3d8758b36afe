//! 请求节奏控制与错误归一化

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::constants;
use crate::error::{AssistError, AssistResult, ProviderError};

/// 请求节奏控制器
///
/// 保证同一适配器发出的相邻请求间隔不小于 `min_interval`。等待期间持有锁，
/// 并发调用者因此按到达顺序依次放行。
#[derive(Debug)]
pub struct RequestGovernor {
    min_interval: Duration,
    max_input_chars: usize,
    last_dispatch: Mutex<Option<Instant>>,
}

impl Default for RequestGovernor {
    fn default() -> Self {
        Self::new(constants::MIN_REQUEST_INTERVAL)
    }
}

impl RequestGovernor {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            max_input_chars: constants::MAX_INPUT_CHARS,
            last_dispatch: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// 拒绝空白输入和超长输入
    pub fn validate_input(&self, text: &str) -> AssistResult<()> {
        if text.trim().is_empty() {
            return Err(AssistError::Validation("input text is empty".to_string()));
        }

        let chars = text.chars().count();
        if chars > self.max_input_chars {
            return Err(AssistError::Validation(format!(
                "input text is too long ({} characters, limit {})",
                chars, self.max_input_chars
            )));
        }

        Ok(())
    }

    /// 等待到下一个可用的发送时间点，并记录本次发送时间
    pub async fn enforce_rate_limit(&self) {
        let mut last = self.last_dispatch.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!("限流等待 {}ms", wait.as_millis());
                tokio::time::sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// 上一次放行的时间
    pub async fn last_dispatch(&self) -> Option<Instant> {
        *self.last_dispatch.lock().await
    }
}

/// 错误类别，只用于分类过程
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Quota,
    Credential,
    RateLimited,
    Upstream,
}

impl Kind {
    fn into_error(self, message: String) -> AssistError {
        match self {
            Kind::Quota => AssistError::Quota(message),
            Kind::Credential => AssistError::Credential(message),
            Kind::RateLimited => AssistError::RateLimited(message),
            Kind::Upstream => AssistError::Upstream(message),
        }
    }
}

/// 把后端错误归入用户可理解的类别
///
/// 有状态码时以状态码为准（401/403 为凭据错误，429 为限流），
/// 只有配额类关键词优先于状态码：配额耗尽同样以 429 返回，但重试没有意义。
pub fn classify_error(error: &ProviderError) -> AssistError {
    match error {
        ProviderError::Api { status, message } => {
            let kind = match (kind_of(message), *status) {
                (Kind::Quota, _) => Kind::Quota,
                (_, 401 | 403) => Kind::Credential,
                (_, 429) => Kind::RateLimited,
                (kind, _) => kind,
            };
            kind.into_error(format!("{} (status {})", message, status))
        }
        other => classify_message(&other.to_string()),
    }
}

/// 按消息内容分类；未识别的消息原样作为 `Upstream` 传递
pub fn classify_message(message: &str) -> AssistError {
    kind_of(message).into_error(message.to_string())
}

/// 只匹配关键词，不匹配裸数字：消息中的 token 数、端口或请求 id 可能恰好包含状态码
fn kind_of(message: &str) -> Kind {
    let lower = message.to_lowercase();

    if contains_any(&lower, &["quota", "billing", "insufficient_quota"]) {
        Kind::Quota
    } else if contains_any(
        &lower,
        &["api key", "api_key", "api-key", "unauthorized", "authentication", "permission denied"],
    ) {
        Kind::Credential
    } else if contains_any(&lower, &["rate limit", "rate_limit", "too many requests"]) {
        Kind::RateLimited
    } else {
        Kind::Upstream
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
