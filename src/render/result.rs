//! 结果渲染
//!
//! 每个区域最多只有一个结果或加载节点：任何显示操作都先移除带有结果标记的旧节点，
//! 再把新节点插入为区域的第一个子节点。错误以全局 toast 的形式追加到 body。

use std::cell::RefCell;
use std::time::{Duration, Instant};

use markup5ever_rcdom::{Handle, RcDom};

use crate::config::constants;
use crate::parsers::html::{
    append_child, append_text, create_html_element, document_body, find_child_by_class,
    insert_first_child, remove_node,
};

const RESULT_HEADER_CLASS: &str = "marklens-result-header";
const RESULT_BODY_CLASS: &str = "marklens-result-body";

struct Toast {
    node: Handle,
    shown_at: Instant,
}

/// 结果渲染器
pub struct ResultRenderer {
    toast_timeout: Duration,
    toasts: RefCell<Vec<Toast>>,
}

impl Default for ResultRenderer {
    fn default() -> Self {
        Self::new(constants::TOAST_TIMEOUT)
    }
}

impl ResultRenderer {
    pub fn new(toast_timeout: Duration) -> Self {
        Self {
            toast_timeout,
            toasts: RefCell::new(Vec::new()),
        }
    }

    /// 在区域顶部显示加载提示
    pub fn show_loading(&self, dom: &RcDom, region: &Handle, message: &str) -> Handle {
        self.clear_result(dom, region);

        let node = create_html_element(
            dom,
            "div",
            &[constants::RESULT_CLASS, constants::LOADING_CLASS],
            &[("role", "status")],
        );
        append_text(dom, &node, message);
        insert_first_child(dom, region, &node);

        node
    }

    /// 在区域顶部显示结果：标题加保留空白的正文
    pub fn show_result(&self, dom: &RcDom, region: &Handle, content: &str, label: &str) -> Handle {
        self.clear_result(dom, region);

        let node = create_html_element(dom, "div", &[constants::RESULT_CLASS], &[]);

        let header = create_html_element(dom, "div", &[RESULT_HEADER_CLASS], &[]);
        append_text(dom, &header, label);
        append_child(dom, &node, &header);

        let body = create_html_element(
            dom,
            "div",
            &[RESULT_BODY_CLASS],
            &[("style", "white-space: pre-wrap")],
        );
        append_text(dom, &body, content);
        append_child(dom, &node, &body);

        insert_first_child(dom, region, &node);

        node
    }

    /// 移除区域内的结果或加载节点，返回移除的数量
    pub fn clear_result(&self, dom: &RcDom, region: &Handle) -> usize {
        let existing = find_child_by_class(region, constants::RESULT_CLASS);
        for node in &existing {
            remove_node(dom, node);
        }
        existing.len()
    }

    /// 显示全局错误提示，超时后由 `sweep_toasts` 移除
    pub fn show_error(&self, dom: &RcDom, message: &str) -> Handle {
        tracing::warn!("显示错误提示: {}", message);

        let node = create_html_element(dom, "div", &[constants::TOAST_CLASS], &[("role", "alert")]);
        append_text(dom, &node, message);

        let parent = document_body(dom).unwrap_or_else(|| dom.document.clone());
        append_child(dom, &parent, &node);

        self.toasts.borrow_mut().push(Toast {
            node: node.clone(),
            shown_at: Instant::now(),
        });

        node
    }

    /// 移除已经超时的 toast，返回移除的数量
    pub fn sweep_toasts(&self, dom: &RcDom, now: Instant) -> usize {
        let mut toasts = self.toasts.borrow_mut();
        let before = toasts.len();

        toasts.retain(|toast| {
            let expired = now.saturating_duration_since(toast.shown_at) >= self.toast_timeout;
            if expired {
                remove_node(dom, &toast.node);
            }
            !expired
        });

        before - toasts.len()
    }

    /// 当前仍在显示的 toast 数量
    pub fn active_toasts(&self) -> usize {
        self.toasts.borrow().len()
    }
}
