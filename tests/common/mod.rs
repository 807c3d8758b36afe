// 集成测试公共模块
//
// 提供脚本化的模拟后端、测试配置和 HTML 夹具

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use markup5ever_rcdom::{Handle, RcDom};

use marklens::config::ExtensionSettings;
use marklens::error::ProviderError;
use marklens::llm::{
    BackendFactory, ChatBackend, ChatRequest, ProviderAdapter, ProviderConfig, RawCompletion,
    RequestGovernor,
};
use marklens::parsers::html::find_by_class;
use marklens::parsers::parse_html;

pub const ISSUE_URL: &str = "https://github.com/octo/widgets/issues/42";
pub const BLOB_URL: &str = "https://github.com/octo/widgets/blob/main/README.md";

/// 有两条评论和一段过短内容的 issue 页面
pub const ISSUE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Widgets crash on start · Issue #42</title></head>
<body>
  <div class="js-discussion">
    <div class="timeline-comment">
      <div class="comment-body markdown-body js-comment-body">
        <p>The widget crashes as soon as the application starts.</p>
        <p>Steps: open the app, wait a second, see the crash.</p>
      </div>
    </div>
    <div class="timeline-comment">
      <div class="comment-body markdown-body js-comment-body">
        <p>I can reproduce this on <strong>version 2.1</strong> as well.</p>
        <pre><code>thread 'main' panicked at src/widget.rs:10</code></pre>
      </div>
    </div>
    <div class="timeline-comment">
      <div class="comment-body"><p>+1</p></div>
    </div>
  </div>
</body>
</html>"#;

/// 单个区域包裹任意文本的文件页面
pub fn blob_page(region_text: &str) -> String {
    format!(
        r#"<html><body><article class="markdown-body entry-content">{}</article></body></html>"#,
        region_text
    )
}

pub fn parse(html: &str) -> RcDom {
    parse_html(html)
}

pub fn regions(dom: &RcDom, class_name: &str) -> Vec<Handle> {
    find_by_class(&dom.document, class_name)
}

/// 测试用设置：有 API key，不限流，重试等待很短
pub fn test_settings() -> ExtensionSettings {
    ExtensionSettings {
        api_key: "sk-test".to_string(),
        min_request_interval_ms: 0,
        retry_base_delay_ms: 10,
        batch_delay_ms: 0,
        ..Default::default()
    }
}

/// 脚本化的模拟后端
///
/// 按顺序返回预设的回复，用完后返回 `fallback`；记录每次收到的请求。
#[derive(Clone)]
pub struct MockBackend {
    replies: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    delay: Duration,
    fallback: String,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
            fallback: "mock reply".to_string(),
        }
    }

    pub fn with_reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn with_failure(self, error: ProviderError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.prompt.clone())
            .collect()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts().pop()
    }

    pub fn last_model(&self) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|request| request.model.clone())
    }

    pub fn factory(&self) -> BackendFactory {
        let backend = self.clone();
        Arc::new(move |_config: &ProviderConfig| -> Arc<dyn ChatBackend> {
            Arc::new(backend.clone())
        })
    }

    /// 不限流的适配器
    pub fn adapter(&self, provider: &str) -> ProviderAdapter {
        self.paced_adapter(provider)
            .with_governor(RequestGovernor::new(Duration::ZERO))
    }

    /// 使用默认节奏（1000ms）的适配器
    pub fn paced_adapter(&self, provider: &str) -> ProviderAdapter {
        let config = ProviderConfig::new(provider, "sk-test").unwrap();
        ProviderAdapter::with_factory(config, self.factory()).unwrap()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<RawCompletion, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Ok(content)) => Ok(RawCompletion {
                content,
                ..Default::default()
            }),
            Some(Err(error)) => Err(error),
            None => Ok(RawCompletion {
                content: self.fallback.clone(),
                ..Default::default()
            }),
        }
    }
}
