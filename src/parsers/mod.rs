//! # 解析器模块
//!
//! 页面以 `RcDom` 表示，所有区域查找、文本提取和结果渲染都建立在这里的DOM操作之上。
//!
//! # 模块组织
//!
//! - `html` - HTML文档解析、DOM查询与修改、序列化

pub mod html;

// Re-export commonly used items for convenience
pub use html::{html_to_dom, parse_html, serialize_document};
