//! 内容管道模块
//!
//! 提供内容区域的发现和文本清洗：
//! - **classifier**: 页面资格判断与区域查找
//! - **sanitizer**: 纯文本提取、去代码以及任务相关的预处理

pub mod classifier;
pub mod sanitizer;

// 重新导出主要类型
pub use classifier::{has_controls, ContentClassifier, ContentRegion, PageContext};
pub use sanitizer::{
    extract_plain_text, is_valid_content, preprocess_for_summarization,
    preprocess_for_translation, sanitize_for_model, strip_code,
};
