//! 摘要服务

use crate::config::constants;
use crate::error::{AssistError, AssistResult};
use crate::llm::{LlmResult, ProviderAdapter};
use crate::pipeline::{is_valid_content, preprocess_for_summarization};
use crate::tasks::prompts::{summary_prompt, PromptTemplate};
use crate::tasks::{retry_rate_limited, run_batch, RetryPolicy};

/// 摘要服务
pub struct Summarizer<'a> {
    adapter: &'a ProviderAdapter,
    template: PromptTemplate,
    policy: RetryPolicy,
}

impl<'a> Summarizer<'a> {
    pub fn new(adapter: &'a ProviderAdapter) -> Self {
        Self {
            adapter,
            template: PromptTemplate::default(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 生成不超过 `max_sentences` 句的摘要
    ///
    /// `language` 缺省、为空或全是空白时使用 English。
    pub async fn summarize(
        &self,
        text: &str,
        max_sentences: usize,
        language: Option<&str>,
    ) -> AssistResult<LlmResult> {
        if !(constants::MIN_SUMMARY_SENTENCES..=constants::MAX_SUMMARY_SENTENCES)
            .contains(&max_sentences)
        {
            return Err(AssistError::Validation(format!(
                "sentence count must be between {} and {}, got {}",
                constants::MIN_SUMMARY_SENTENCES,
                constants::MAX_SUMMARY_SENTENCES,
                max_sentences
            )));
        }

        let language = resolve_language(language);

        let cleaned = preprocess_for_summarization(text);
        if !is_valid_content(&cleaned) {
            return Err(AssistError::ContentUnusable(
                "the selected content has too little text to summarize".to_string(),
            ));
        }

        tracing::debug!(
            "摘要: template={}, sentences={}, language={}, {} 字符",
            self.template,
            max_sentences,
            language,
            cleaned.chars().count()
        );

        let prompt = summary_prompt(self.template, &cleaned, max_sentences, language);
        let result = self.adapter.generate(&prompt).await?;

        tracing::info!("摘要完成: {} 字符", result.text.chars().count());
        Ok(result)
    }

    /// 遇到限流时按线性退避重试
    pub async fn summarize_with_retry(
        &self,
        text: &str,
        max_sentences: usize,
        language: Option<&str>,
    ) -> AssistResult<LlmResult> {
        retry_rate_limited(&self.policy, || self.summarize(text, max_sentences, language)).await
    }

    /// 顺序摘要多段文本，任一段失败即中止
    pub async fn summarize_batch(
        &self,
        texts: &[&str],
        max_sentences: usize,
        language: Option<&str>,
    ) -> AssistResult<Vec<LlmResult>> {
        run_batch(self.policy.batch_delay, texts, |text| {
            self.summarize(text, max_sentences, language)
        })
        .await
    }
}

fn resolve_language(language: Option<&str>) -> &str {
    match language.map(str::trim) {
        Some(lang) if !lang.is_empty() => lang,
        _ => constants::DEFAULT_LANGUAGE,
    }
}
