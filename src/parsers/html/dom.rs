use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::tendril::{format_tendril, StrTendril, TendrilSink};
use html5ever::tree_builder::{create_element, NodeOrText, TreeSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::utils::WHITESPACES;

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> RcDom {
    let s: String = if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
        let (string, _, _) = encoding.decode(data);
        string.to_string()
    } else {
        String::from_utf8_lossy(data).to_string()
    };

    parse_html(&s)
}

/// 解析 HTML 字符串
pub fn parse_html(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 设置节点属性，`None` 表示删除该属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let mut i = 0;
        let mut found_existing_attr: bool = false;

        while i < attrs_mut.len() {
            if &attrs_mut[i].name.local == attr_name {
                found_existing_attr = true;

                if let Some(attr_value) = attr_value.as_deref() {
                    attrs_mut[i].value.clear();
                    attrs_mut[i].value.push_slice(attr_value);
                } else {
                    // Remove attr completely if attr_value is not defined
                    attrs_mut.remove(i);
                    continue;
                }
            }

            i += 1;
        }

        if !found_existing_attr {
            if let Some(attr_value) = attr_value {
                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                    value: format_tendril!("{}", attr_value),
                });
            }
        }
    };
}

/// 检查元素的 class 列表是否包含指定 class
pub fn has_class(node: &Handle, class_name: &str) -> bool {
    get_node_attr(node, "class")
        .map(|classes| {
            classes
                .split(WHITESPACES)
                .any(|candidate| candidate == class_name)
        })
        .unwrap_or(false)
}

/// 获取父节点（不破坏节点上的父引用）
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 元素类型的直接子节点
pub fn element_children(parent: &Handle) -> Vec<Handle> {
    parent
        .children
        .borrow()
        .iter()
        .filter(|child| matches!(child.data, NodeData::Element { .. }))
        .cloned()
        .collect()
}

/// 查找带有指定 class 的直接子元素
pub fn find_child_by_class(parent: &Handle, class_name: &str) -> Vec<Handle> {
    element_children(parent)
        .into_iter()
        .filter(|child| has_class(child, class_name))
        .collect()
}

/// 在子树中查找所有带有指定 class 的元素（包括根节点自身）
pub fn find_by_class(root: &Handle, class_name: &str) -> Vec<Handle> {
    let mut found = Vec::new();
    collect_by_class(root, class_name, &mut found);
    found
}

fn collect_by_class(node: &Handle, class_name: &str, found: &mut Vec<Handle>) {
    if has_class(node, class_name) {
        found.push(node.clone());
    }

    for child in node.children.borrow().iter() {
        collect_by_class(child, class_name, found);
    }
}

/// 查找第一个指定名称的元素（深度优先）
pub fn find_first_element(root: &Handle, node_name: &str) -> Option<Handle> {
    if get_node_name(root) == Some(node_name) {
        return Some(root.clone());
    }

    root.children
        .borrow()
        .iter()
        .find_map(|child| find_first_element(child, node_name))
}

/// 判断 `ancestor` 是否为 `node` 本身或其祖先
pub fn is_ancestor_or_self(ancestor: &Handle, node: &Handle) -> bool {
    let mut current = Some(node.clone());

    while let Some(candidate) = current {
        if Rc::ptr_eq(&candidate, ancestor) {
            return true;
        }
        current = get_parent_node(&candidate);
    }

    false
}

/// 拼接子树中所有文本节点的内容
pub fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    push_text(node, &mut text);
    text
}

fn push_text(node: &Handle, text: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        text.push_str(&contents.borrow());
    }

    for child in node.children.borrow().iter() {
        push_text(child, text);
    }
}

/// 创建元素，`classes` 会写入 class 属性
pub fn create_html_element(
    dom: &RcDom,
    tag: &str,
    classes: &[&str],
    attrs: &[(&str, &str)],
) -> Handle {
    let mut attributes: Vec<Attribute> = Vec::with_capacity(attrs.len() + 1);

    if !classes.is_empty() {
        attributes.push(Attribute {
            name: QualName::new(None, ns!(), LocalName::from("class")),
            value: format_tendril!("{}", classes.join(" ")),
        });
    }

    for (name, value) in attrs {
        attributes.push(Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*name)),
            value: format_tendril!("{}", value),
        });
    }

    create_element(
        dom,
        QualName::new(None, ns!(html), LocalName::from(tag)),
        attributes,
    )
}

/// 追加文本子节点
pub fn append_text(dom: &RcDom, parent: &Handle, text: &str) {
    dom.append(parent, NodeOrText::AppendText(StrTendril::from(text)));
}

/// 追加子节点
pub fn append_child(dom: &RcDom, parent: &Handle, child: &Handle) {
    dom.append(parent, NodeOrText::AppendNode(child.clone()));
}

/// 将节点插入为第一个子节点，原有子节点的相对顺序不变
pub fn insert_first_child(dom: &RcDom, parent: &Handle, child: &Handle) {
    let first = parent.children.borrow().first().cloned();

    match first {
        Some(first) => dom.append_before_sibling(&first, NodeOrText::AppendNode(child.clone())),
        None => dom.append(parent, NodeOrText::AppendNode(child.clone())),
    }
}

/// 从父节点上移除
pub fn remove_node(dom: &RcDom, node: &Handle) {
    dom.remove_from_parent(node);
}

/// 文档的 body 元素
pub fn document_body(dom: &RcDom) -> Option<Handle> {
    find_first_element(&dom.document, "body")
}
