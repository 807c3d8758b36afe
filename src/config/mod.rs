//! 配置管理模块
//!
//! 提供常量、持久化设置（`ExtensionSettings`）以及从文件和环境变量加载设置的功能

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, ExtensionSettings, PageScope};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 输入限制
    pub const MAX_INPUT_CHARS: usize = 50_000;
    pub const MIN_CONTENT_CHARS: usize = 10;
    pub const MIN_MEANINGFUL_CHARS: usize = 5;

    // 摘要句数
    pub const MIN_SUMMARY_SENTENCES: usize = 1;
    pub const MAX_SUMMARY_SENTENCES: usize = 10;
    pub const DEFAULT_SUMMARY_SENTENCES: usize = 2;

    // 默认语言
    pub const DEFAULT_LANGUAGE: &str = "English";

    // 请求节奏
    pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(1000);
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
    pub const DEFAULT_MAX_RETRIES: usize = 3;
    pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);
    pub const BATCH_DELAY: Duration = Duration::from_millis(500);

    // 生成参数
    pub const DEFAULT_TEMPERATURE: f32 = 0.3;
    pub const DEFAULT_MAX_TOKENS: u32 = 1024;

    // 页面
    pub const DEFAULT_TARGET_HOST: &str = "github.com";
    pub const TOAST_TIMEOUT: Duration = Duration::from_secs(5);

    /// 渲染后的 Markdown 容器：`(标签, class)`，标签为 `None` 表示任意元素
    pub const REGION_SELECTORS: &[(Option<&str>, &str)] = &[
        (Some("article"), "markdown-body"),
        (None, "markdown-body"),
        (None, "comment-body"),
        (None, "js-comment-body"),
    ];

    // 注入节点的 class 与属性
    pub const CONTROLS_CLASS: &str = "marklens-controls";
    pub const BUTTON_CLASS: &str = "marklens-btn";
    pub const RESULT_CLASS: &str = "marklens-result";
    pub const LOADING_CLASS: &str = "marklens-loading";
    pub const TOAST_CLASS: &str = "marklens-toast";
    pub const REGION_ATTR: &str = "data-marklens-region";
    pub const ACTION_ATTR: &str = "data-marklens-action";

    /// 提取文本时整体跳过的元素
    pub const SKIP_ELEMENTS: &[&str] = &[
        "script", "style", "template", "noscript", "svg", "button", "textarea", "code", "pre",
    ];

    /// 会产生段落边界的块级元素
    pub const BLOCK_ELEMENTS: &[&str] = &[
        "p", "div", "section", "article", "header", "footer", "blockquote", "ul", "ol", "li",
        "table", "thead", "tbody", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "br", "dl",
        "dt", "dd", "details", "summary",
    ];

    /// 被视为文档的文件扩展名
    pub const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown", "mdx", "rst", "txt", "adoc"];

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "marklens.toml",
        ".marklens.toml",
        "marklens.json",
        "~/.config/marklens/config.toml",
        "/etc/marklens/config.toml",
    ];
}

/// 便利函数
pub fn config_file_exists() -> bool {
    constants::CONFIG_PATHS
        .iter()
        .any(|path| std::path::Path::new(shellexpand::tilde(path).as_ref()).exists())
}
