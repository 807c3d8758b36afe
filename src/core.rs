//! 页面增强器
//!
//! `Enhancer` 负责一个页面会话内的全部流程：
//! 分类 → 注入控件 → 文本清洗 → 翻译或摘要 → 渲染结果。
//!
//! DOM 基于 `Rc`，因此增强器只能在单线程运行时中使用。

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use markup5ever_rcdom::{Handle, RcDom};
use tokio::sync::mpsc;
use url::Url;

use crate::config::ExtensionSettings;
use crate::error::{helpers, AssistError, AssistResult, RegionId};
use crate::llm::{LlmResult, ProviderAdapter, RequestGovernor};
use crate::parsers::html::is_ancestor_or_self;
use crate::pipeline::{sanitize_for_model, ContentClassifier, ContentRegion, PageContext};
use crate::render::{attach_controls, relabel_controls, set_controls_disabled, Action, ResultRenderer};
use crate::tasks::{suggest_sentence_count, ContentType, RetryPolicy, Summarizer, Translator};

/// 当前页面
#[derive(Debug, Clone)]
struct PageInfo {
    context: PageContext,
    path: String,
}

/// 单次操作的参数覆盖
#[derive(Debug, Clone, Default)]
pub struct ActionOptions {
    /// 目标语言，缺省使用配置中的默认语言
    pub language: Option<String>,
    /// 摘要句数，缺省由内容类型和长度推断
    pub max_sentences: Option<usize>,
}

/// 页面增强器
pub struct Enhancer {
    settings: ExtensionSettings,
    /// 提供方不可用时保存构建错误，在用户触发操作时报告
    adapter: AssistResult<ProviderAdapter>,
    classifier: ContentClassifier,
    renderer: ResultRenderer,
    page: RefCell<Option<PageInfo>>,
    regions: RefCell<Vec<ContentRegion>>,
    busy: RefCell<HashSet<RegionId>>,
}

impl Enhancer {
    /// 根据配置创建增强器
    ///
    /// 提供方配置无效（例如缺少 API key）不会阻止页面扫描，错误会在触发操作时以 toast 报告。
    pub fn new(settings: ExtensionSettings) -> AssistResult<Self> {
        settings.validate()?;

        let adapter = settings
            .provider_config()
            .and_then(ProviderAdapter::new)
            .inspect_err(|e| tracing::warn!("提供方不可用: {}", e));
        Ok(Self::build(settings, adapter))
    }

    /// 使用已有的适配器创建增强器；节奏和超时仍按配置设置
    pub fn with_adapter(settings: ExtensionSettings, adapter: ProviderAdapter) -> Self {
        Self::build(settings, Ok(adapter))
    }

    fn build(settings: ExtensionSettings, adapter: AssistResult<ProviderAdapter>) -> Self {
        let adapter = adapter.map(|adapter| {
            adapter
                .with_governor(RequestGovernor::new(settings.min_request_interval()))
                .with_timeout(settings.request_timeout())
        });
        let classifier = ContentClassifier::new(&settings.target_host, settings.page_scope);

        Self {
            settings,
            adapter,
            classifier,
            renderer: ResultRenderer::default(),
            page: RefCell::new(None),
            regions: RefCell::new(Vec::new()),
            busy: RefCell::new(HashSet::new()),
        }
    }

    pub fn settings(&self) -> &ExtensionSettings {
        &self.settings
    }

    pub fn adapter(&self) -> AssistResult<&ProviderAdapter> {
        self.adapter.as_ref().map_err(Clone::clone)
    }

    pub fn renderer(&self) -> &ResultRenderer {
        &self.renderer
    }

    /// 切换到新页面；之前登记的区域全部作废
    pub fn navigate(&self, url: &Url) -> Option<PageContext> {
        let context = self.classifier.classify_page(url);

        *self.page.borrow_mut() = context.map(|context| PageInfo {
            context,
            path: url.path().to_string(),
        });
        self.regions.borrow_mut().clear();

        match context {
            Some(context) => tracing::info!("页面类型: {} ({})", context, url),
            None => tracing::debug!("页面不需要增强: {}", url),
        }

        context
    }

    pub fn page_context(&self) -> Option<PageContext> {
        self.page.borrow().as_ref().map(|page| page.context)
    }

    /// 扫描整个文档，返回本次新登记的区域（新注入控件或沿用已有控件）
    pub fn scan(&self, dom: &RcDom) -> Vec<RegionId> {
        self.discover(dom, &dom.document)
    }

    /// 处理新插入的子树
    pub fn on_subtree_inserted(&self, dom: &RcDom, subtree: &Handle) -> Vec<RegionId> {
        self.discover(dom, subtree)
    }

    /// 取出通道中已有的全部插入事件并逐个处理，不等待新事件
    pub fn consume_mutations(&self, dom: &RcDom, receiver: &mut mpsc::Receiver<Handle>) -> Vec<RegionId> {
        let mut attached = Vec::new();
        let mut batches = 0;

        while let Ok(subtree) = receiver.try_recv() {
            attached.extend(self.on_subtree_inserted(dom, &subtree));
            batches += 1;
        }

        if batches > 0 {
            tracing::debug!("处理了 {} 个插入事件，新增 {} 个区域", batches, attached.len());
        }

        attached
    }

    fn discover(&self, dom: &RcDom, root: &Handle) -> Vec<RegionId> {
        let Some(context) = self.page_context() else {
            return Vec::new();
        };

        let mut attached = Vec::new();

        for found in self.classifier.find_regions(root, context) {
            let (id, registered) = match self.lookup(&found.node) {
                Some(id) => (id, false),
                None => {
                    // 已登记区域内部的容器不再单独成为区域
                    if self.is_inside_known_region(&found.node) {
                        continue;
                    }
                    let mut regions = self.regions.borrow_mut();
                    regions.push(found.clone());
                    (RegionId(regions.len() - 1), true)
                }
            };

            if attach_controls(dom, &found.node, id).is_some() {
                attached.push(id);
            } else if registered {
                // 导航前注入的控件带着上一轮的编号
                relabel_controls(&found.node, id);
                attached.push(id);
            }
        }

        if !attached.is_empty() {
            tracing::info!("为 {} 个区域注入了控件", attached.len());
        }

        attached
    }

    fn lookup(&self, node: &Handle) -> Option<RegionId> {
        self.regions
            .borrow()
            .iter()
            .position(|region| Rc::ptr_eq(&region.node, node))
            .map(RegionId)
    }

    fn is_inside_known_region(&self, node: &Handle) -> bool {
        self.regions
            .borrow()
            .iter()
            .any(|region| is_ancestor_or_self(&region.node, node))
    }

    /// 已登记的区域
    pub fn region(&self, id: RegionId) -> AssistResult<ContentRegion> {
        self.regions
            .borrow()
            .get(id.0)
            .cloned()
            .ok_or(AssistError::UnknownRegion(id))
    }

    pub fn region_count(&self) -> usize {
        self.regions.borrow().len()
    }

    pub fn is_busy(&self, id: RegionId) -> bool {
        self.busy.borrow().contains(&id)
    }

    /// 使用默认参数执行区域操作
    pub async fn run_action(&self, dom: &RcDom, id: RegionId, action: Action) -> AssistResult<LlmResult> {
        self.run_action_with(dom, id, action, &ActionOptions::default())
            .await
    }

    /// 执行区域操作
    ///
    /// 成功时结果显示在区域顶部；失败时移除加载提示并显示全局 toast。
    /// 同一区域已有请求在进行时直接返回 `RegionBusy`，不改动该区域。
    pub async fn run_action_with(
        &self,
        dom: &RcDom,
        id: RegionId,
        action: Action,
        options: &ActionOptions,
    ) -> AssistResult<LlmResult> {
        let region = match self.region(id) {
            Ok(region) => region,
            Err(e) => return self.report(dom, e),
        };

        let Some(_guard) = BusyGuard::acquire(&self.busy, id, &region.node) else {
            return self.report(dom, AssistError::RegionBusy(id));
        };

        // 1. 区域可能已被页面移除或清空
        if !region.is_valid() {
            return self.report(
                dom,
                AssistError::ContentUnusable(format!("region {} no longer has usable text", id)),
            );
        }

        // 2. 加载提示
        let loading_message = match action {
            Action::Translate => "Translating...",
            Action::Summarize => "Summarizing...",
        };
        self.renderer.show_loading(dom, &region.node, loading_message);

        // 3. 清洗并执行任务
        let text = sanitize_for_model(&region.node);
        let outcome = self.execute(action, &text, options).await;

        // 4. 渲染
        match outcome {
            Ok((result, label)) => {
                self.renderer.show_result(dom, &region.node, &result.text, &label);
                tracing::info!("区域 {} 的 {} 已完成 (model={})", id, action, result.model);
                Ok(result)
            }
            Err(e) => {
                self.renderer.clear_result(dom, &region.node);
                self.report(dom, e)
            }
        }
    }

    async fn execute(
        &self,
        action: Action,
        text: &str,
        options: &ActionOptions,
    ) -> AssistResult<(LlmResult, String)> {
        let adapter = self.adapter()?;
        let policy = RetryPolicy::from_settings(&self.settings);
        let language = options
            .language
            .as_deref()
            .filter(|lang| !lang.trim().is_empty())
            .unwrap_or(&self.settings.default_language);

        match action {
            Action::Translate => {
                let result = Translator::new(adapter)
                    .with_policy(policy)
                    .translate_with_retry(text, language)
                    .await?;
                Ok((result, format!("Translation ({})", language.trim())))
            }
            Action::Summarize => {
                let max_sentences = match options.max_sentences {
                    Some(n) => n,
                    None => suggest_sentence_count(self.content_type(), text),
                };
                let result = Summarizer::new(adapter)
                    .with_template(self.settings.summary_template)
                    .with_policy(policy)
                    .summarize_with_retry(text, max_sentences, Some(language))
                    .await?;
                Ok((result, "Summary".to_string()))
            }
        }
    }

    fn content_type(&self) -> ContentType {
        match self.page.borrow().as_ref() {
            Some(page) => ContentType::from_page(page.context, &page.path),
            None => ContentType::Article,
        }
    }

    fn report<T>(&self, dom: &RcDom, error: AssistError) -> AssistResult<T> {
        self.renderer.show_error(dom, &error.user_message());
        helpers::log_error(error)
    }
}

/// 区域忙标记；存在期间区域的按钮处于禁用状态
struct BusyGuard<'a> {
    busy: &'a RefCell<HashSet<RegionId>>,
    id: RegionId,
    node: Handle,
}

impl<'a> BusyGuard<'a> {
    fn acquire(busy: &'a RefCell<HashSet<RegionId>>, id: RegionId, node: &Handle) -> Option<Self> {
        if !busy.borrow_mut().insert(id) {
            return None;
        }
        set_controls_disabled(node, true);

        Some(Self {
            busy,
            id,
            node: node.clone(),
        })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.borrow_mut().remove(&self.id);
        set_controls_disabled(&self.node, false);
    }
}
