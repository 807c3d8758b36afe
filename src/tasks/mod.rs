//! 任务模块
//!
//! 翻译与摘要服务，以及摘要句数的启发式规则：
//! - **prompts**: 提示词模板
//! - **translate**: 翻译服务（单次 / 重试 / 批量）
//! - **summarize**: 摘要服务（单次 / 重试 / 批量）
//! - **heuristics**: 内容类型与默认句数

pub mod heuristics;
pub mod prompts;
pub mod summarize;
pub mod translate;

use std::future::Future;
use std::time::Duration;

use crate::config::{constants, ExtensionSettings};
use crate::error::{AssistError, AssistResult};

pub use heuristics::{suggest_sentence_count, ContentType};
pub use prompts::{summary_prompt, translation_prompt, PromptTemplate};
pub use summarize::Summarizer;
pub use translate::Translator;

/// 重试与批处理节奏
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 总尝试次数（含第一次）
    pub max_attempts: usize,
    /// 第 n 次重试前等待 `base_delay * n`
    pub base_delay: Duration,
    /// 批处理相邻两项之间的固定间隔
    pub batch_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: constants::DEFAULT_MAX_RETRIES,
            base_delay: constants::RETRY_BASE_DELAY,
            batch_delay: constants::BATCH_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &ExtensionSettings) -> Self {
        Self {
            max_attempts: settings.max_retries.max(1),
            base_delay: settings.retry_base_delay(),
            batch_delay: settings.batch_delay(),
        }
    }
}

/// 仅对限流错误重试，退避时间线性增长；其他错误立即返回
async fn retry_rate_limited<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> AssistResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AssistResult<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.base_delay * attempt as u32;
                tracing::warn!(
                    "请求被限流，{}ms 后进行第 {} 次重试: {}",
                    delay.as_millis(),
                    attempt + 1,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// 顺序处理批量输入，相邻两项之间等待固定间隔；任一项失败即中止并报告序号
async fn run_batch<'a, T, I, F, Fut>(
    delay: Duration,
    items: &'a [I],
    mut operation: F,
) -> AssistResult<Vec<T>>
where
    F: FnMut(&'a I) -> Fut,
    Fut: Future<Output = AssistResult<T>>,
{
    let mut results = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match operation(item).await {
            Ok(value) => results.push(value),
            Err(source) => {
                tracing::error!("批处理在第 {} 项失败: {}", index + 1, source);
                return Err(AssistError::BatchItem {
                    index,
                    source: Box::new(source),
                });
            }
        }
    }

    Ok(results)
}
