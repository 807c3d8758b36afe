//! 区域控件注入

use std::fmt;
use std::str::FromStr;

use markup5ever_rcdom::{Handle, RcDom};

use crate::config::constants;
use crate::error::{AssistError, RegionId};
use crate::parsers::html::{
    append_child, append_text, create_html_element, element_children, find_child_by_class,
    insert_first_child, set_node_attr,
};
use crate::pipeline::has_controls;

/// 用户可触发的区域操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Translate,
    Summarize,
}

impl Action {
    pub const ALL: [Action; 2] = [Action::Translate, Action::Summarize];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Translate => "translate",
            Action::Summarize => "summarize",
        }
    }

    /// 按钮文字
    pub fn label(&self) -> &'static str {
        match self {
            Action::Translate => "Translate",
            Action::Summarize => "Summarize",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AssistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "translate" => Ok(Action::Translate),
            "summarize" | "summarise" => Ok(Action::Summarize),
            other => Err(AssistError::Validation(format!("unknown action '{}'", other))),
        }
    }
}

/// 在区域顶部插入操作按钮
///
/// 已经带有控件的区域不做任何修改并返回 `None`。
pub fn attach_controls(dom: &RcDom, region: &Handle, id: RegionId) -> Option<Handle> {
    if has_controls(region) {
        return None;
    }

    let id_value = id.0.to_string();
    let controls = create_html_element(
        dom,
        "div",
        &[constants::CONTROLS_CLASS],
        &[(constants::REGION_ATTR, &id_value)],
    );

    for action in Action::ALL {
        let button = create_html_element(
            dom,
            "button",
            &[constants::BUTTON_CLASS],
            &[("type", "button"), (constants::ACTION_ATTR, action.as_str())],
        );
        append_text(dom, &button, action.label());
        append_child(dom, &controls, &button);
    }

    set_node_attr(region, constants::REGION_ATTR, Some(id_value));
    insert_first_child(dom, region, &controls);

    Some(controls)
}

/// 把区域及其控件上的区域编号改为 `id`
///
/// 重新导航后区域表会重建，已注入的控件仍带着旧编号，需要在重新登记时改写。
pub fn relabel_controls(region: &Handle, id: RegionId) {
    let id_value = id.0.to_string();

    set_node_attr(region, constants::REGION_ATTR, Some(id_value.clone()));
    for controls in find_child_by_class(region, constants::CONTROLS_CLASS) {
        set_node_attr(&controls, constants::REGION_ATTR, Some(id_value.clone()));
    }
}

/// 启用或禁用区域内的全部按钮
pub fn set_controls_disabled(region: &Handle, disabled: bool) {
    for controls in find_child_by_class(region, constants::CONTROLS_CLASS) {
        for button in element_children(&controls) {
            set_node_attr(&button, "disabled", disabled.then(String::new));
        }
    }
}
