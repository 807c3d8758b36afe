//! 提示词构建

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AssistError;

/// 摘要任务使用的提示词模板
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTemplate {
    /// 普通摘要
    #[default]
    Summary,
    /// 对提示词本身做结构化分析，输出固定小节的 Markdown 报告
    PromptAnalysis,
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptTemplate::Summary => f.write_str("summary"),
            PromptTemplate::PromptAnalysis => f.write_str("prompt_analysis"),
        }
    }
}

impl FromStr for PromptTemplate {
    type Err = AssistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "summary" => Ok(PromptTemplate::Summary),
            "prompt_analysis" => Ok(PromptTemplate::PromptAnalysis),
            other => Err(AssistError::Validation(format!(
                "unknown summary template '{}'",
                other
            ))),
        }
    }
}

/// 翻译提示词
pub fn translation_prompt(text: &str, target_language: &str) -> String {
    format!(
        "Translate the following text to {}. Return only the translated text without any additional explanation or commentary.\n\n{}",
        target_language, text
    )
}

/// 摘要提示词，按模板选择措辞
pub fn summary_prompt(
    template: PromptTemplate,
    text: &str,
    max_sentences: usize,
    language: &str,
) -> String {
    match template {
        PromptTemplate::Summary => format!(
            "Summarize the following text in {} sentences or less, in {}. Be concise and focus on the main points only.\n\n{}",
            max_sentences, language, text
        ),
        PromptTemplate::PromptAnalysis => format!(
            "Analyze the following prompt and write a Markdown report in {language}. \
Use exactly these sections, keeping each to at most {max_sentences} sentences:\n\n\
## Purpose\n\
## Internal Structure and Information Flow\n\
## Behavioral Instructions or Constraints\n\n\
Prompt:\n\n{text}"
        ),
    }
}
