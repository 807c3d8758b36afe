//! HTML解析和处理模块
//!
//! - `utils`: 基础常量和工具函数
//! - `dom`: 基础DOM操作（查询、属性、插入、移除）
//! - `serializer`: 序列化功能

pub mod dom;
pub mod serializer;
pub mod utils;

pub use dom::{
    append_child, append_text, create_html_element, document_body, element_children,
    find_by_class, find_child_by_class, find_first_element, get_node_attr, get_node_name,
    get_parent_node, has_class, html_to_dom, insert_first_child, is_ancestor_or_self,
    parse_html, remove_node, set_node_attr, text_content,
};
pub use serializer::{serialize_document, serialize_node};
pub use utils::{is_one_of, WHITESPACES};
