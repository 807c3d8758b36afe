//! 摘要句数启发式
//!
//! 根据内容类型和原文长度给出默认的摘要句数。纯函数，无状态。

use std::fmt;

use crate::config::constants;
use crate::pipeline::PageContext;

const SHORT_TEXT_CHARS: usize = 500;
const LONG_TEXT_CHARS: usize = 2000;
const MAX_SUGGESTED_SENTENCES: usize = 4;

/// 内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Documentation,
    Code,
    Article,
}

impl ContentType {
    /// 由页面类型和路径推断内容类型
    ///
    /// 标记语言文件和 wiki 视为文档，其他文件视为代码，issue 与 PR 视为文章。
    pub fn from_page(context: PageContext, path: &str) -> Self {
        match context {
            PageContext::Wiki => ContentType::Documentation,
            PageContext::Issue | PageContext::PullRequest => ContentType::Article,
            PageContext::Blob => {
                let extension = path
                    .rsplit('/')
                    .next()
                    .and_then(|file| file.rsplit_once('.'))
                    .map(|(_, ext)| ext.to_lowercase());

                match extension {
                    Some(ext) if constants::DOCUMENT_EXTENSIONS.contains(&ext.as_str()) => {
                        ContentType::Documentation
                    }
                    _ => ContentType::Code,
                }
            }
        }
    }

    pub fn baseline_sentences(&self) -> usize {
        match self {
            ContentType::Documentation => 3,
            ContentType::Code => 1,
            ContentType::Article => constants::DEFAULT_SUMMARY_SENTENCES,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentType::Documentation => "documentation",
            ContentType::Code => "code",
            ContentType::Article => "article",
        };
        f.write_str(name)
    }
}

/// 默认摘要句数
pub fn suggest_sentence_count(content_type: ContentType, text: &str) -> usize {
    let baseline = content_type.baseline_sentences();
    let length = text.chars().count();

    if length < SHORT_TEXT_CHARS {
        1
    } else if length > LONG_TEXT_CHARS {
        (baseline + 1).min(MAX_SUGGESTED_SENTENCES)
    } else {
        baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_from_page() {
        assert_eq!(
            ContentType::from_page(PageContext::Blob, "/a/b/blob/main/docs/Guide.MD"),
            ContentType::Documentation
        );
        assert_eq!(
            ContentType::from_page(PageContext::Blob, "/a/b/blob/main/src/lib.rs"),
            ContentType::Code
        );
        assert_eq!(
            ContentType::from_page(PageContext::Blob, "/a/b/blob/main/Makefile"),
            ContentType::Code
        );
        assert_eq!(
            ContentType::from_page(PageContext::Issue, "/a/b/issues/3"),
            ContentType::Article
        );
        assert_eq!(
            ContentType::from_page(PageContext::Wiki, "/a/b/wiki"),
            ContentType::Documentation
        );
    }

    #[test]
    fn test_suggest_sentence_count() {
        let medium = "x".repeat(1000);
        assert_eq!(suggest_sentence_count(ContentType::Documentation, &medium), 3);
        assert_eq!(suggest_sentence_count(ContentType::Code, &medium), 1);
        assert_eq!(suggest_sentence_count(ContentType::Article, &medium), 2);

        let short = "x".repeat(499);
        assert_eq!(suggest_sentence_count(ContentType::Documentation, &short), 1);

        let long = "x".repeat(2001);
        assert_eq!(suggest_sentence_count(ContentType::Documentation, &long), 4);
        assert_eq!(suggest_sentence_count(ContentType::Article, &long), 3);
        assert_eq!(suggest_sentence_count(ContentType::Code, &long), 2);
    }
}
