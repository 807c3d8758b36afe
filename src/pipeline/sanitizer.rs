//! 文本清洗模块
//!
//! 从区域中提取纯文本，并去除代码和格式噪声，使其可以安全、经济地发送给模型。
//! 代码永远不会进入提示词：围栏代码块、行内代码以及残留的 `<code>`/`<pre>` 标记都会被删除。
//!
//! 翻译和摘要的预处理不同：翻译把所有标记压平成自然文本，
//! 摘要只去掉链接地址，保留标题和强调标记作为文档结构信号。

use std::sync::OnceLock;

use markup5ever_rcdom::{Handle, NodeData};
use regex::{Captures, Regex};

use crate::config::constants;
use crate::parsers::html::{has_class, is_one_of};

/// 编译好的正则表达式
struct Patterns {
    fenced_code: Regex,
    inline_code: Regex,
    pre_markup: Regex,
    code_markup: Regex,
    blank_lines: Regex,
    space_runs: Regex,
    whitespace_runs: Regex,
    image: Regex,
    link: Regex,
    heading: Regex,
    strong_star: Regex,
    strong_underscore: Regex,
    em_star: Regex,
    em_underscore: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();

    PATTERNS.get_or_init(|| {
        let compile = |pattern: &str| Regex::new(pattern).expect("static pattern must compile");

        Patterns {
            fenced_code: compile(r"```[\s\S]*?```"),
            inline_code: compile(r"`[^`\n]+?`"),
            pre_markup: compile(r"(?is)<pre\b[^>]*>.*?</pre\s*>"),
            code_markup: compile(r"(?is)<code\b[^>]*>.*?</code\s*>"),
            blank_lines: compile(r"\n[ \t]*\n(?:[ \t]*\n)+"),
            space_runs: compile(r"[ \t]{2,}"),
            whitespace_runs: compile(r"\s+"),
            image: compile(r"!\[([^\]]*)\]\([^)]*\)"),
            link: compile(r"\[([^\]]+)\]\([^)]*\)"),
            heading: compile(r"(?m)^[ \t]*#{1,6}[ \t]+"),
            strong_star: compile(r"\*\*([^*\n]+)\*\*"),
            strong_underscore: compile(r"__([^_\n]+)__"),
            em_star: compile(r"\*([^*\s](?:[^*\n]*[^*\s])?)\*"),
            em_underscore: compile(r"\b_([^_\n]+)_\b"),
        }
    })
}

/// 提取区域的纯文本
///
/// 块级元素之间保留段落边界（空行），其余空白折叠为单个空格。
/// 注入的控件、结果节点以及 `code`/`pre` 等元素不参与提取。
pub fn extract_plain_text(region: &Handle) -> String {
    let mut raw = String::new();
    collect_text(region, &mut raw);
    normalize_whitespace(&raw)
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { name, .. } => {
            let tag = name.local.as_ref();

            if is_one_of(tag, constants::SKIP_ELEMENTS) || is_injected_node(node) {
                return;
            }

            let is_block = is_one_of(tag, constants::BLOCK_ELEMENTS);
            if is_block {
                out.push_str("\n\n");
            }

            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }

            if is_block {
                out.push_str("\n\n");
            }
        }
        NodeData::Document => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
        _ => {}
    }
}

fn is_injected_node(node: &Handle) -> bool {
    has_class(node, constants::CONTROLS_CLASS)
        || has_class(node, constants::RESULT_CLASS)
        || has_class(node, constants::TOAST_CLASS)
}

/// 含两个及以上换行的空白段落变为段落边界，其余空白段变为单个空格
fn normalize_whitespace(raw: &str) -> String {
    patterns()
        .whitespace_runs
        .replace_all(raw, |caps: &Captures| {
            if caps[0].matches('\n').count() >= 2 {
                "\n\n"
            } else {
                " "
            }
        })
        .trim()
        .to_string()
}

/// 删除代码：围栏代码块、行内代码、残留的 code/pre 标记
///
/// 删除后把多余的空行折叠为一个空行，折叠连续空格并去掉首尾空白。
pub fn strip_code(text: &str) -> String {
    let p = patterns();

    let without_fences = p.fenced_code.replace_all(text, "");
    let without_inline = p.inline_code.replace_all(&without_fences, "");
    let without_pre = p.pre_markup.replace_all(&without_inline, "");
    let without_code = p.code_markup.replace_all(&without_pre, "");

    tidy(&without_code)
}

fn tidy(text: &str) -> String {
    let p = patterns();
    let collapsed_lines = p.blank_lines.replace_all(text, "\n\n");
    let collapsed_spaces = p.space_runs.replace_all(&collapsed_lines, " ");
    collapsed_spaces.trim().to_string()
}

/// 发送给模型之前的标准清洗入口
pub fn sanitize_for_model(region: &Handle) -> String {
    strip_code(&extract_plain_text(region))
}

/// 链接只保留链接文字
fn flatten_links(text: &str) -> String {
    let p = patterns();
    let without_images = p.image.replace_all(text, "${1}");
    p.link.replace_all(&without_images, "${1}").into_owned()
}

/// 翻译预处理：去代码、链接转文字、去标题标记、去强调标记
pub fn preprocess_for_translation(text: &str) -> String {
    let p = patterns();

    let stripped = strip_code(text);
    let linked = flatten_links(&stripped);
    let unheaded = p.heading.replace_all(&linked, "");
    let unstrong = p.strong_star.replace_all(&unheaded, "${1}");
    let unstrong = p.strong_underscore.replace_all(&unstrong, "${1}");
    let unemph = p.em_star.replace_all(&unstrong, "${1}");
    let unemph = p.em_underscore.replace_all(&unemph, "${1}");

    tidy(&unemph)
}

/// 摘要预处理：去代码、链接转文字，保留标题和强调标记
pub fn preprocess_for_summarization(text: &str) -> String {
    tidy(&flatten_links(&strip_code(text)))
}

/// 发起网络请求前的内容检查
///
/// 去掉首尾空白后至少 10 个字符，且去掉空白和标点后至少 5 个字符。
pub fn is_valid_content(text: &str) -> bool {
    let trimmed = text.trim();

    if trimmed.chars().count() < constants::MIN_CONTENT_CHARS {
        return false;
    }

    let meaningful = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && !is_punctuation(*c))
        .count();

    meaningful >= constants::MIN_MEANINGFUL_CHARS
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || ('\u{2000}'..='\u{206F}').contains(&c) // General Punctuation
        || ('\u{3000}'..='\u{303F}').contains(&c) // CJK Symbols and Punctuation
        || ('\u{FF01}'..='\u{FF0F}').contains(&c)
        || ('\u{FF1A}'..='\u{FF20}').contains(&c)
        || matches!(c, '¡' | '¿' | '«' | '»' | '·')
}
