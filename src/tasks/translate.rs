//! 翻译服务

use crate::error::{AssistError, AssistResult};
use crate::llm::{LlmResult, ProviderAdapter};
use crate::pipeline::{is_valid_content, preprocess_for_translation};
use crate::tasks::prompts::translation_prompt;
use crate::tasks::{retry_rate_limited, run_batch, RetryPolicy};

/// 翻译服务
///
/// 借用适配器，因此所有翻译请求共享同一个限流状态。
pub struct Translator<'a> {
    adapter: &'a ProviderAdapter,
    policy: RetryPolicy,
}

impl<'a> Translator<'a> {
    pub fn new(adapter: &'a ProviderAdapter) -> Self {
        Self {
            adapter,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 翻译一段文本
    ///
    /// 空文本或空目标语言直接失败；清洗后内容不足时返回 `ContentUnusable`，
    /// 两种情况都不会发起网络请求。
    pub async fn translate(&self, text: &str, target_language: &str) -> AssistResult<LlmResult> {
        if text.trim().is_empty() {
            return Err(AssistError::Validation("text to translate is empty".to_string()));
        }
        let target_language = target_language.trim();
        if target_language.is_empty() {
            return Err(AssistError::Validation("target language is empty".to_string()));
        }

        let cleaned = preprocess_for_translation(text);
        if !is_valid_content(&cleaned) {
            return Err(AssistError::ContentUnusable(
                "the selected content has too little text to translate".to_string(),
            ));
        }

        tracing::debug!(
            "翻译到 {}: 原文 {} 字符，清洗后 {} 字符",
            target_language,
            text.chars().count(),
            cleaned.chars().count()
        );

        let result = self
            .adapter
            .generate(&translation_prompt(&cleaned, target_language))
            .await?;

        tracing::info!("翻译完成: {} 字符", result.text.chars().count());
        Ok(result)
    }

    /// 遇到限流时按线性退避重试
    pub async fn translate_with_retry(
        &self,
        text: &str,
        target_language: &str,
    ) -> AssistResult<LlmResult> {
        retry_rate_limited(&self.policy, || self.translate(text, target_language)).await
    }

    /// 顺序翻译多段文本，任一段失败即中止
    pub async fn translate_batch(
        &self,
        texts: &[&str],
        target_language: &str,
    ) -> AssistResult<Vec<LlmResult>> {
        run_batch(self.policy.batch_delay, texts, |text| {
            self.translate(text, target_language)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderConfig;

    fn adapter() -> ProviderAdapter {
        ProviderAdapter::new(ProviderConfig::new("openai", "sk-test").unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_arguments_fail_before_dispatch() {
        let adapter = adapter();
        let translator = Translator::new(&adapter);

        let err = translator.translate("   ", "French").await.unwrap_err();
        assert!(matches!(err, AssistError::Validation(_)));

        let err = translator.translate("Hello there, world", " ").await.unwrap_err();
        assert!(matches!(err, AssistError::Validation(_)));
        assert!(adapter.governor().last_dispatch().await.is_none());
    }

    #[tokio::test]
    async fn test_code_only_text_is_unusable() {
        let adapter = adapter();
        let translator = Translator::new(&adapter);

        let err = translator
            .translate("```rust\nfn main() {}\n```", "French")
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::ContentUnusable(_)));
        assert!(adapter.governor().last_dispatch().await.is_none());
    }
}
