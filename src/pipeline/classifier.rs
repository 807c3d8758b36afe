//! 内容分类模块
//!
//! 判断当前页面是否需要增强，以及页面中哪些元素是值得增强的渲染后 Markdown 内容。
//! 分类是当前DOM和URL的纯函数，唯一的状态是注入控件时留在DOM中的标记。

use std::fmt;

use markup5ever_rcdom::{Handle, NodeData};
use url::Url;

use crate::config::{constants, PageScope};
use crate::parsers::html::{find_child_by_class, get_node_name, get_parent_node, has_class};
use crate::pipeline::sanitizer::{extract_plain_text, is_valid_content};

/// 页面类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageContext {
    /// 文件页面 `/{owner}/{repo}/blob/...`
    Blob,
    /// `/{owner}/{repo}/issues/{n}`
    Issue,
    /// `/{owner}/{repo}/pull/{n}`
    PullRequest,
    /// `/{owner}/{repo}/wiki...`
    Wiki,
}

impl fmt::Display for PageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageContext::Blob => "blob",
            PageContext::Issue => "issue",
            PageContext::PullRequest => "pull request",
            PageContext::Wiki => "wiki",
        };
        f.write_str(name)
    }
}

/// 可增强的内容区域
#[derive(Clone)]
pub struct ContentRegion {
    /// 区域对应的DOM节点
    pub node: Handle,
    /// 发现时是否已经带有注入的控件
    pub has_controls: bool,
    /// 所在页面的类型
    pub context: PageContext,
}

impl ContentRegion {
    /// 重新检查区域是否仍然有效：仍挂在文档中，且文本满足最小长度要求
    pub fn is_valid(&self) -> bool {
        get_parent_node(&self.node).is_some() && is_valid_content(&extract_plain_text(&self.node))
    }
}

impl fmt::Debug for ContentRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentRegion")
            .field("tag", &get_node_name(&self.node))
            .field("has_controls", &self.has_controls)
            .field("context", &self.context)
            .finish()
    }
}

/// 内容分类器
#[derive(Debug, Clone)]
pub struct ContentClassifier {
    target_host: String,
    scope: PageScope,
}

impl ContentClassifier {
    pub fn new(target_host: &str, scope: PageScope) -> Self {
        Self {
            target_host: target_host.trim().to_lowercase(),
            scope,
        }
    }

    /// 根据URL判断页面类型；不是目标站点或不是支持的视图时返回 `None`
    pub fn classify_page(&self, url: &Url) -> Option<PageContext> {
        let host = url.host_str()?.to_lowercase();
        if host != self.target_host && host != format!("www.{}", self.target_host) {
            return None;
        }

        let segments: Vec<&str> = url
            .path_segments()?
            .filter(|segment| !segment.is_empty())
            .collect();

        // owner / repo / kind / ...
        if segments.len() < 3 {
            return None;
        }

        let context = match segments[2] {
            "blob" if segments.len() >= 5 => PageContext::Blob,
            "issues" if is_number(segments.get(3)) => PageContext::Issue,
            "pull" if is_number(segments.get(3)) => PageContext::PullRequest,
            "wiki" => PageContext::Wiki,
            _ => return None,
        };

        match self.scope {
            PageScope::All => Some(context),
            PageScope::BlobOnly if context == PageContext::Blob => Some(context),
            PageScope::BlobOnly => None,
        }
    }

    /// 页面是否需要增强
    pub fn is_page_eligible(&self, url: &Url) -> bool {
        self.classify_page(url).is_some()
    }

    /// 在子树中查找内容区域
    ///
    /// `root` 可以是整个文档，也可以是新插入的子树。匹配到的容器不再向下查找，
    /// 因此嵌套的容器不会产生重复区域。文本不足的容器被忽略。
    pub fn find_regions(&self, root: &Handle, context: PageContext) -> Vec<ContentRegion> {
        let mut regions = Vec::new();
        self.collect_regions(root, context, &mut regions);

        tracing::debug!("在 {} 页面中发现 {} 个内容区域", context, regions.len());
        regions
    }

    fn collect_regions(&self, node: &Handle, context: PageContext, regions: &mut Vec<ContentRegion>) {
        if let NodeData::Element { .. } = node.data {
            if matches_region_selector(node) {
                if is_valid_content(&extract_plain_text(node)) {
                    regions.push(ContentRegion {
                        node: node.clone(),
                        has_controls: has_controls(node),
                        context,
                    });
                }
                return;
            }
        }

        for child in node.children.borrow().iter() {
            self.collect_regions(child, context, regions);
        }
    }
}

/// 区域是否已经带有注入的控件
pub fn has_controls(node: &Handle) -> bool {
    !find_child_by_class(node, constants::CONTROLS_CLASS).is_empty()
}

fn matches_region_selector(node: &Handle) -> bool {
    let tag = get_node_name(node);

    constants::REGION_SELECTORS
        .iter()
        .any(|(selector_tag, class_name)| {
            selector_tag.map_or(true, |expected| tag == Some(expected)) && has_class(node, class_name)
        })
}

fn is_number(segment: Option<&&str>) -> bool {
    segment.map_or(false, |s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::parse_html;

    fn classifier() -> ContentClassifier {
        ContentClassifier::new("github.com", PageScope::All)
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_classify_supported_views() {
        let c = classifier();
        assert_eq!(
            c.classify_page(&url("https://github.com/rust-lang/rust/blob/master/README.md")),
            Some(PageContext::Blob)
        );
        assert_eq!(
            c.classify_page(&url("https://github.com/rust-lang/rust/issues/42")),
            Some(PageContext::Issue)
        );
        assert_eq!(
            c.classify_page(&url("https://github.com/rust-lang/rust/pull/7/files")),
            Some(PageContext::PullRequest)
        );
        assert_eq!(
            c.classify_page(&url("https://github.com/rust-lang/rust/wiki/Home")),
            Some(PageContext::Wiki)
        );
    }

    #[test]
    fn test_ineligible_pages() {
        let c = classifier();
        assert!(!c.is_page_eligible(&url("https://github.com/rust-lang/rust")));
        assert!(!c.is_page_eligible(&url("https://github.com/rust-lang/rust/issues")));
        assert!(!c.is_page_eligible(&url("https://github.com/rust-lang/rust/pulls")));
        assert!(!c.is_page_eligible(&url("https://gitlab.com/a/b/blob/main/README.md")));
        assert!(!c.is_page_eligible(&url("https://github.com/a/b/blob/main")));
    }

    #[test]
    fn test_blob_only_scope() {
        let c = ContentClassifier::new("github.com", PageScope::BlobOnly);
        assert!(c.is_page_eligible(&url("https://github.com/a/b/blob/main/docs/intro.md")));
        assert!(!c.is_page_eligible(&url("https://github.com/a/b/issues/1")));
    }

    #[test]
    fn test_find_regions_applies_validity() {
        let dom = parse_html(
            r#"<body>
                <article class="markdown-body"><p>A long enough paragraph of documentation.</p></article>
                <div class="comment-body">ok</div>
                <div class="other">Not a region at all, even though it is long.</div>
            </body>"#,
        );

        let regions = classifier().find_regions(&dom.document, PageContext::Blob);
        assert_eq!(regions.len(), 1);
        assert_eq!(get_node_name(&regions[0].node), Some("article"));
        assert!(!regions[0].has_controls);
    }

    #[test]
    fn test_nested_containers_yield_one_region() {
        let dom = parse_html(
            r#"<div class="comment-body markdown-body js-comment-body">
                <div class="markdown-body"><p>Nested rendered markdown content here.</p></div>
            </div>"#,
        );

        let regions = classifier().find_regions(&dom.document, PageContext::Issue);
        assert_eq!(regions.len(), 1);
        assert!(has_class(&regions[0].node, "comment-body"));
    }

    #[test]
    fn test_code_only_region_is_ignored() {
        let dom = parse_html(
            r#"<div class="markdown-body"><pre><code>let x = compute_everything();</code></pre></div>"#,
        );
        assert!(classifier()
            .find_regions(&dom.document, PageContext::Blob)
            .is_empty());
    }
}
