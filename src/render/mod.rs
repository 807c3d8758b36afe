//! 渲染模块
//!
//! - **controls**: 区域操作按钮的注入与禁用
//! - **result**: 结果、加载提示和错误 toast

pub mod controls;
pub mod result;

pub use controls::{attach_controls, relabel_controls, set_controls_disabled, Action};
pub use result::ResultRenderer;
