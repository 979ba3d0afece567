//! 片段翻译服务
//!
//! 把管道的各个部件串成一次完整的往返：
//!
//! ```text
//! Collecting -> Embedded -> AwaitingBackend -> Decoded -> Reassembled
//!                                  |
//!                                  +-> Failed (返回原文)
//! ```
//!
//! 错误按最小单位收敛：单个变量无法解析只跳过该变量，单个片段包缺少标记只让该包
//! 保持原文，后端失败则整页原样返回。
//!
//! ## 使用示例
//!
//! ```rust
//! use fragment_translator::translation::core::{BackendRequest, BackendResponse, FragmentService};
//! use fragment_translator::translation::TranslationConfig;
//!
//! let service = FragmentService::new(TranslationConfig::default()).unwrap();
//! let backend = |req: &BackendRequest| -> fragment_translator::translation::TranslationResult<BackendResponse> {
//!     Ok(BackendResponse::Content(req.html_document.clone()))
//! };
//!
//! let outcome = service.translate_json(r#"{"title":"Cart"}"#, "cart", "/", &backend);
//! assert_eq!(outcome.content, r#"{"title":"Cart"}"#);
//! ```

use std::ops::Range;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::parsers::js::{encode_for_script, splice, FragmentOverride, ScriptLocator, ScriptMatch};
use crate::translation::config::{constants, TranslationConfig};
use crate::translation::core::backend::{BackendRequest, BackendResponse, TranslationBackend};
use crate::translation::error::{helpers, TranslationError, TranslationResult};
use crate::translation::pipeline::extractor::{FragmentBundle, FragmentExtractor};
use crate::translation::pipeline::filters::LeafFilter;
use crate::translation::pipeline::markers::{MarkerCodec, TranslatedBundles, TranslatedMap};
use crate::translation::pipeline::matcher::{Disposition, MatchMode, Rule};
use crate::translation::pipeline::path::KeyPath;
use crate::translation::pipeline::reassembler::{rebuild_with_report, RebuildReport};
use crate::translation::pipeline::rules::{RuleSet, RuleSetBuilder};
use crate::translation::pipeline::source::{patch_script_source, patch_source};

/// 一次管道调用的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Collecting,
    Embedded,
    AwaitingBackend,
    Decoded,
    Reassembled,
    /// 后端或编解码失败，已返回原文
    Failed,
    /// 翻译被禁用或没有任何可翻译内容，未调用后端
    Skipped,
}

impl PipelineState {
    /// 状态机允许的转换
    pub fn can_advance_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Collecting, Embedded)
                | (Collecting, Skipped)
                | (Collecting, Failed)
                | (Embedded, AwaitingBackend)
                | (Embedded, Failed)
                | (AwaitingBackend, Decoded)
                | (AwaitingBackend, Failed)
                | (Decoded, Reassembled)
                | (Decoded, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Reassembled | PipelineState::Failed | PipelineState::Skipped
        )
    }
}

/// 单个片段包的处理结果
#[derive(Debug, Clone, Default)]
pub struct BundleOutcome {
    pub name: String,
    pub fragments: usize,
    pub report: RebuildReport,
    /// 该包回退为原文的原因
    pub error: Option<TranslationError>,
}

impl BundleOutcome {
    pub fn fell_back(&self) -> bool {
        self.error.is_some()
    }
}

/// 一次管道调用的结果
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub content: String,
    pub state: PipelineState,
    pub bundles: Vec<BundleOutcome>,
    /// 整体失败的原因
    pub error: Option<TranslationError>,
}

impl PipelineOutcome {
    fn unchanged(original: &str, state: PipelineState, error: Option<TranslationError>) -> Self {
        Self {
            content: original.to_string(),
            state,
            bundles: Vec::new(),
            error,
        }
    }

    /// 是否至少写入了一个译文叶子
    pub fn translated_leaves(&self) -> usize {
        self.bundles.iter().map(|b| b.report.applied).sum()
    }

    pub fn is_fallback(&self) -> bool {
        self.state == PipelineState::Failed
    }
}

/// 记录状态转换
struct Pipeline {
    state: PipelineState,
    started: Instant,
}

impl Pipeline {
    fn start() -> Self {
        Self {
            state: PipelineState::Collecting,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: PipelineState) {
        if !self.state.can_advance_to(next) {
            tracing::error!("非法的管道状态转换 {:?} -> {:?}", self.state, next);
        }
        tracing::trace!("管道状态 {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// 一个脚本变量定位目标及其判定范围
struct ScriptTarget {
    locator: ScriptLocator,
    rules: RuleSet,
    filter: LeafFilter,
    default_disposition: Disposition,
}

/// 一个脚本变量的写回内容
struct ScriptRewrite {
    name: String,
    target: usize,
    original: String,
    /// `None` 表示写回原始字面量
    updated: Option<String>,
}

/// 在页面中找到的一个片段包
struct Located {
    target: usize,
    found: ScriptMatch,
    bundle: FragmentBundle,
}

/// 片段翻译服务
pub struct FragmentService {
    config: TranslationConfig,
    rules: RuleSet,
    filter: LeafFilter,
    targets: Vec<ScriptTarget>,
    stats: ServiceStats,
}

impl FragmentService {
    /// 按配置创建服务
    ///
    /// 非法的规则和脚本定位正则只会被记录并跳过，不会让服务创建失败。
    pub fn new(config: TranslationConfig) -> TranslationResult<Self> {
        config.validate()?;

        let (rules, rejected) = config.build_rules();
        for error in rejected {
            helpers::log_error(error);
        }

        let overrides: Vec<_> = config
            .fragment_overrides()
            .map(|(fragment, filter)| (fragment.clone(), LeafFilter::new(filter.clone())))
            .collect();

        Ok(Self::from_parts(config, rules, overrides))
    }

    /// 使用已组装的规则集和片段覆盖创建服务
    pub fn from_parts(
        config: TranslationConfig,
        rules: RuleSet,
        overrides: Vec<(FragmentOverride, LeafFilter)>,
    ) -> Self {
        let mut targets = Vec::with_capacity(overrides.len());
        for (spec, filter) in overrides {
            match Self::build_target(&config, &rules, spec, filter) {
                Ok(target) => targets.push(target),
                Err(e) => {
                    helpers::log_error(e);
                }
            }
        }

        tracing::info!(
            "片段翻译服务就绪: {} 条规则, {} 个脚本变量, 目标语言 {}",
            rules.len(),
            targets.len(),
            config.target_lang
        );

        Self {
            filter: LeafFilter::new(config.filter.clone()),
            config,
            rules,
            targets,
            stats: ServiceStats::default(),
        }
    }

    fn build_target(
        config: &TranslationConfig,
        rules: &RuleSet,
        spec: FragmentOverride,
        filter: LeafFilter,
    ) -> TranslationResult<ScriptTarget> {
        let default_disposition = spec.default_disposition(config.default_disposition);
        let rules = match &spec.key {
            Some(key) => RuleSetBuilder::new()
                .rule(Rule::new(key.clone(), MatchMode::Exact, Disposition::Allow)?)
                .build(),
            None => rules.clone(),
        };

        Ok(ScriptTarget {
            locator: ScriptLocator::new(spec)?,
            rules,
            filter,
            default_disposition,
        })
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn get_stats(&self) -> &ServiceStats {
        &self.stats
    }

    /// 名称对应的判定范围：脚本变量自己的规则，或全局规则
    fn scope(&self, name: &str) -> (&RuleSet, &LeafFilter, Disposition) {
        let base = name
            .split(constants::REPEATED_NAME_SEPARATOR)
            .next()
            .unwrap_or(name);

        match self.targets.iter().find(|t| t.locator.name() == base) {
            Some(target) => (&target.rules, &target.filter, target.default_disposition),
            None => (&self.rules, &self.filter, self.config.default_disposition),
        }
    }

    /// 按名称对应的规则提取一个 JSON 值
    pub fn extract_value(&self, name: &str, value: &Value) -> FragmentBundle {
        let (rules, filter, default_disposition) = self.scope(name);
        FragmentExtractor::new(rules, filter, default_disposition).extract(name, value)
    }

    /// 快速判断某个名称下的路径是否允许翻译
    pub fn is_allowed(&self, path: &str, name: &str) -> bool {
        let (rules, _, default_disposition) = self.scope(name);
        rules.decide(&KeyPath::parse(path)).resolve(default_disposition) == Disposition::Allow
    }

    /// 在页面中找到所有命名 JSON 变量并提取片段包
    pub fn find_fragments(&self, html: &str) -> Vec<FragmentBundle> {
        self.collect(html).into_iter().map(|l| l.bundle).collect()
    }

    fn collect(&self, html: &str) -> Vec<Located> {
        let mut located = Vec::new();

        for (index, target) in self.targets.iter().enumerate() {
            for found in target.locator.locate(html) {
                let value = match found.parse() {
                    Ok(value) => value,
                    Err(e) => {
                        self.stats.inc_invalid_variables();
                        helpers::log_error(e);
                        continue;
                    }
                };

                let bundle = FragmentExtractor::new(
                    &target.rules,
                    &target.filter,
                    target.default_disposition,
                )
                .extract(&found.name, &value);

                located.push(Located {
                    target: index,
                    found,
                    bundle,
                });
            }
        }

        self.stats.add_bundles(located.len());
        self.stats
            .add_fragments(located.iter().map(|l| l.bundle.len()).sum());
        located
    }

    /// 单个 JSON 值的标记 HTML 片段
    pub fn to_html_fragments(&self, name: &str, value: &Value) -> TranslationResult<String> {
        MarkerCodec::embed(&self.extract_value(name, value))
    }

    /// 从译文 HTML 中解码所有片段包
    pub fn from_translated_html(&self, html: &str) -> TranslatedBundles {
        MarkerCodec::decode(html)
    }

    /// 把译文回填到片段包
    pub fn apply_translated(&self, bundle: &FragmentBundle, translated: &TranslatedMap) -> Value {
        let (value, report) = rebuild_with_report(bundle, translated);
        self.stats.add_leaves_translated(report.applied);
        value
    }

    fn request(&self, html_document: String, path_context: &str) -> BackendRequest {
        BackendRequest {
            html_document,
            target_language: self.config.target_lang.clone(),
            source_language: self.config.source_lang.clone(),
            path_context: path_context.to_string(),
            timeout: self.config.timeout(),
        }
    }

    /// 调用后端；跳转与错误都视为失败
    fn call_backend(
        &self,
        backend: &dyn TranslationBackend,
        request: &BackendRequest,
    ) -> TranslationResult<String> {
        match backend.translate(request)? {
            BackendResponse::Content(content) => Ok(content),
            BackendResponse::Redirect(url) => Err(TranslationError::BackendRedirect(url)),
        }
    }

    fn fail(&self, pipeline: &mut Pipeline, original: &str, error: TranslationError) -> PipelineOutcome {
        pipeline.advance(PipelineState::Failed);
        self.stats.inc_fallbacks();
        if error.is_backend_failure() {
            self.stats.inc_backend_failures();
        }
        let error = helpers::log_error(error);
        tracing::warn!("翻译回退为原文");
        self.stats.add_processing_time(pipeline.started.elapsed());
        PipelineOutcome::unchanged(original, PipelineState::Failed, Some(error))
    }

    /// 翻译服务端渲染页面，连同其中的脚本变量
    ///
    /// 页面与所有片段包合并为一个文档，只调用一次后端。
    pub fn translate_html(
        &self,
        html: &str,
        path_context: &str,
        backend: &dyn TranslationBackend,
    ) -> PipelineOutcome {
        let mut pipeline = Pipeline::start();
        self.stats.inc_pages();

        if !self.config.enabled {
            tracing::debug!("翻译已禁用，页面原样返回");
            pipeline.advance(PipelineState::Skipped);
            return PipelineOutcome::unchanged(html, PipelineState::Skipped, None);
        }

        let located = self.collect(html);
        let bundles: Vec<FragmentBundle> = located.iter().map(|l| l.bundle.clone()).collect();
        tracing::debug!(
            "页面 '{}': {} 个片段包, {} 个片段",
            path_context,
            bundles.len(),
            bundles.iter().map(FragmentBundle::len).sum::<usize>()
        );

        let outbound = if bundles.iter().all(FragmentBundle::is_empty) {
            html.to_string()
        } else {
            match MarkerCodec::embed_into_document(html, &bundles) {
                Ok(document) => document,
                Err(e) => return self.fail(&mut pipeline, html, e),
            }
        };
        pipeline.advance(PipelineState::Embedded);

        pipeline.advance(PipelineState::AwaitingBackend);
        let translated = match self.call_backend(backend, &self.request(outbound, path_context)) {
            Ok(content) => content,
            Err(e) => return self.fail(&mut pipeline, html, e),
        };

        let decoded = match MarkerCodec::decode_and_strip(&translated) {
            Ok(decoded) => decoded,
            Err(e) => return self.fail(&mut pipeline, html, e),
        };
        pipeline.advance(PipelineState::Decoded);

        let page = decoded.html.unwrap_or(translated);
        let mut outcomes = Vec::with_capacity(located.len());
        let mut rewrites = Vec::with_capacity(located.len());

        for item in &located {
            let (outcome, updated) = self.rebuild_script(item, &decoded.translations);
            rewrites.push(ScriptRewrite {
                name: item.found.name.clone(),
                target: item.target,
                original: item.found.json.clone(),
                updated,
            });
            outcomes.push(outcome);
        }

        let content = self.rewrite_scripts(&page, &rewrites, &mut outcomes);
        pipeline.advance(PipelineState::Reassembled);

        let outcome = PipelineOutcome {
            content,
            state: pipeline.state,
            bundles: outcomes,
            error: None,
        };

        self.stats.add_processing_time(pipeline.started.elapsed());
        tracing::info!(
            "页面 '{}' 翻译完成: {} 个片段包, {} 个叶子已翻译",
            path_context,
            outcome.bundles.len(),
            outcome.translated_leaves()
        );
        outcome
    }

    /// 回填单个脚本变量；值有变化时返回新的 JSON 文本
    fn rebuild_script(
        &self,
        item: &Located,
        translations: &TranslatedBundles,
    ) -> (BundleOutcome, Option<String>) {
        let bundle = &item.bundle;
        let mut outcome = BundleOutcome {
            name: bundle.name.clone(),
            fragments: bundle.len(),
            ..BundleOutcome::default()
        };

        if let Err(e) = MarkerCodec::check_bundle(bundle, translations) {
            self.stats.inc_decode_mismatches();
            outcome.error = Some(helpers::log_error(e));
            return (outcome, None);
        }

        let empty = TranslatedMap::new();
        let translated = translations.get(&bundle.name).unwrap_or(&empty);
        let (value, report) = rebuild_with_report(bundle, translated);
        self.stats.add_leaves_translated(report.applied);
        outcome.report = report;

        if value == bundle.original {
            return (outcome, None);
        }

        let encoded = patch_script_source(&item.found.json, &value).or_else(|e| {
            tracing::debug!("脚本变量 '{}' 无法按原文回写，改为完整序列化: {}", bundle.name, e);
            encode_for_script(&value)
        });
        match encoded {
            Ok(text) => (outcome, Some(text)),
            Err(e) => {
                outcome.error = Some(helpers::log_error(e));
                (outcome, None)
            }
        }
    }

    /// 在译文页面中重新定位脚本变量并写回
    ///
    /// 没有变化的变量写回原始字面量，后端对脚本内容的改动不会保留。
    fn rewrite_scripts(
        &self,
        page: &str,
        rewrites: &[ScriptRewrite],
        outcomes: &mut [BundleOutcome],
    ) -> String {
        if rewrites.is_empty() {
            return page.to_string();
        }

        let mut replacements: Vec<(Range<usize>, String)> = Vec::with_capacity(rewrites.len());

        for (index, target) in self.targets.iter().enumerate() {
            let found = target.locator.locate(page);

            for rewrite in rewrites.iter().filter(|r| r.target == index) {
                let Some(current) = found.iter().find(|m| m.name == rewrite.name) else {
                    tracing::warn!("译文页面中找不到脚本变量 '{}'，保持原样", rewrite.name);
                    if let Some(outcome) = outcomes.iter_mut().find(|o| o.name == rewrite.name) {
                        outcome.error.get_or_insert(TranslationError::StructuralMismatch {
                            name: rewrite.name.clone(),
                            path: KeyPath::root().to_string(),
                        });
                    }
                    continue;
                };

                match &rewrite.updated {
                    Some(json) => replacements.push(target.locator.replacement(current, json)),
                    None if current.json != rewrite.original => {
                        replacements.push((current.json_range.clone(), rewrite.original.clone()))
                    }
                    None => {}
                }
            }
        }

        splice(page, replacements)
    }

    /// 翻译 AJAX/API 返回的 JSON
    ///
    /// 使用名称对应的规则；没有可翻译叶子时不调用后端。
    pub fn translate_json(
        &self,
        body: &str,
        name: &str,
        path_context: &str,
        backend: &dyn TranslationBackend,
    ) -> PipelineOutcome {
        let mut pipeline = Pipeline::start();
        self.stats.inc_json_documents();

        if !self.config.enabled {
            pipeline.advance(PipelineState::Skipped);
            return PipelineOutcome::unchanged(body, PipelineState::Skipped, None);
        }

        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                self.stats.inc_invalid_variables();
                return self.fail(&mut pipeline, body, helpers::invalid_json(name, e));
            }
        };

        let bundle = self.extract_value(name, &value);
        self.stats.add_bundles(1);
        self.stats.add_fragments(bundle.len());

        if bundle.is_empty() {
            tracing::debug!("JSON '{}' 没有可翻译的叶子", name);
            pipeline.advance(PipelineState::Skipped);
            return PipelineOutcome {
                bundles: vec![BundleOutcome {
                    name: bundle.name.clone(),
                    ..BundleOutcome::default()
                }],
                ..PipelineOutcome::unchanged(body, PipelineState::Skipped, None)
            };
        }

        let outbound = match MarkerCodec::synthetic_document(std::slice::from_ref(&bundle)) {
            Ok(document) => document,
            Err(e) => return self.fail(&mut pipeline, body, e),
        };
        pipeline.advance(PipelineState::Embedded);

        pipeline.advance(PipelineState::AwaitingBackend);
        let translated = match self.call_backend(backend, &self.request(outbound, path_context)) {
            Ok(content) => content,
            Err(e) => return self.fail(&mut pipeline, body, e),
        };

        let decoded = MarkerCodec::decode(&translated);
        pipeline.advance(PipelineState::Decoded);

        let mut outcome = BundleOutcome {
            name: bundle.name.clone(),
            fragments: bundle.len(),
            ..BundleOutcome::default()
        };

        let content = match MarkerCodec::check_bundle(&bundle, &decoded) {
            Err(e) => {
                self.stats.inc_decode_mismatches();
                outcome.error = Some(helpers::log_error(e));
                body.to_string()
            }
            Ok(()) => {
                let empty = TranslatedMap::new();
                let translated = decoded.get(&bundle.name).unwrap_or(&empty);
                let (value, report) = rebuild_with_report(&bundle, translated);
                self.stats.add_leaves_translated(report.applied);

                let content = if value == bundle.original {
                    body.to_string()
                } else {
                    match patch_source(body, &value) {
                        Ok(json) => json,
                        Err(e) => {
                            outcome.error = Some(helpers::log_error(e));
                            body.to_string()
                        }
                    }
                };
                outcome.report = report;
                content
            }
        };
        pipeline.advance(PipelineState::Reassembled);
        self.stats.add_processing_time(pipeline.started.elapsed());

        PipelineOutcome {
            content,
            state: pipeline.state,
            bundles: vec![outcome],
            error: None,
        }
    }
}

/// 服务统计信息
#[derive(Debug, Default)]
pub struct ServiceStats {
    /// 处理的页面数量
    pub pages_processed: AtomicUsize,
    /// 处理的 JSON 文档数量
    pub json_documents_processed: AtomicUsize,
    pub bundles_extracted: AtomicUsize,
    pub fragments_extracted: AtomicUsize,
    /// 写入了译文的叶子数量
    pub leaves_translated: AtomicUsize,
    /// 无法解析而跳过的变量数量
    pub invalid_variables: AtomicUsize,
    pub decode_mismatches: AtomicUsize,
    /// 整体回退为原文的次数
    pub fallbacks: AtomicUsize,
    pub backend_failures: AtomicUsize,
    /// 总处理时间，以微秒为单位存储
    pub processing_time: AtomicU64,
}

impl ServiceStats {
    pub fn inc_pages(&self) {
        self.pages_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_json_documents(&self) {
        self.json_documents_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bundles(&self, count: usize) {
        self.bundles_extracted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_fragments(&self, count: usize) {
        self.fragments_extracted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_leaves_translated(&self, count: usize) {
        self.leaves_translated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_invalid_variables(&self) {
        self.invalid_variables.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_decode_mismatches(&self) {
        self.decode_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fallbacks(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_backend_failures(&self) {
        self.backend_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// 添加处理时间
    pub fn add_processing_time(&self, duration: Duration) {
        self.processing_time
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// 获取统计快照
    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        ServiceStatsSnapshot {
            pages_processed: self.pages_processed.load(Ordering::Relaxed),
            json_documents_processed: self.json_documents_processed.load(Ordering::Relaxed),
            bundles_extracted: self.bundles_extracted.load(Ordering::Relaxed),
            fragments_extracted: self.fragments_extracted.load(Ordering::Relaxed),
            leaves_translated: self.leaves_translated.load(Ordering::Relaxed),
            invalid_variables: self.invalid_variables.load(Ordering::Relaxed),
            decode_mismatches: self.decode_mismatches.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            backend_failures: self.backend_failures.load(Ordering::Relaxed),
            processing_time: Duration::from_micros(self.processing_time.load(Ordering::Relaxed)),
        }
    }

    /// 重置所有统计计数器
    pub fn reset(&mut self) {
        *self = Default::default();
    }
}

/// 统计信息快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceStatsSnapshot {
    pub pages_processed: usize,
    pub json_documents_processed: usize,
    pub bundles_extracted: usize,
    pub fragments_extracted: usize,
    pub leaves_translated: usize,
    pub invalid_variables: usize,
    pub decode_mismatches: usize,
    pub fallbacks: usize,
    pub backend_failures: usize,
    pub processing_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::config::IntegrationConfig;
    use crate::translation::pipeline::rules::RuleSpec;

    fn service() -> FragmentService {
        let config = TranslationConfig {
            integrations: vec![IntegrationConfig {
                name: "shop".to_string(),
                rules: vec![RuleSpec::new("sku", MatchMode::Exact, Disposition::Deny)],
                fragments: vec![
                    FragmentOverride::new("cart_params"),
                    FragmentOverride::new("search_params").with_key("placeholder"),
                ],
                filter: None,
            }],
            ..TranslationConfig::default()
        };
        FragmentService::new(config).unwrap()
    }

    fn echo(req: &BackendRequest) -> TranslationResult<BackendResponse> {
        Ok(BackendResponse::Content(req.html_document.clone()))
    }

    #[test]
    fn test_state_machine_edges() {
        use PipelineState::*;
        assert!(Collecting.can_advance_to(Embedded));
        assert!(AwaitingBackend.can_advance_to(Failed));
        assert!(Decoded.can_advance_to(Reassembled));
        assert!(!Reassembled.can_advance_to(Failed));
        assert!(!Collecting.can_advance_to(Decoded));
        assert!(Failed.is_terminal());
    }

    #[test]
    fn test_is_allowed() {
        let service = service();
        assert!(service.is_allowed("items.0.name", "cart_params"));
        assert!(!service.is_allowed("items.0.sku", "cart_params"));
        assert!(!service.is_allowed("items.0.sku", "unknown"));

        assert!(service.is_allowed("labels.placeholder", "search_params"));
        assert!(!service.is_allowed("labels.title", "search_params"));
        assert!(!service.is_allowed("labels.title", "search_params#2"));
    }

    #[test]
    fn test_find_fragments() {
        let html = r#"<script>var cart_params = {"items":[{"name":"Red Shirt","sku":"RS-1"}]};</script>
<script>var search_params = {"placeholder":"Search","title":"Find"};</script>"#;
        let bundles = service().find_fragments(html);
        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[0].name, "cart_params");
        assert_eq!(bundles[0].fragments[0].path.as_str(), "items.0.name");
        assert_eq!(bundles[1].len(), 1);
        assert_eq!(bundles[1].fragments[0].value, "Search");
    }

    #[test]
    fn test_echo_backend_keeps_page_scripts() {
        let html = "<html><head></head><body><script>var cart_params = {\"title\":\"Cart\"};</script></body></html>";
        let service = service();
        let outcome = service.translate_html(html, "/", &echo);

        assert_eq!(outcome.state, PipelineState::Reassembled);
        assert!(outcome.content.contains("var cart_params = {\"title\":\"Cart\"};"));
        assert!(!outcome.content.contains("data-fragment"));
        assert_eq!(service.get_stats().snapshot().pages_processed, 1);
    }

    #[test]
    fn test_translated_marker_is_written_back() {
        let html = "<html><head></head><body><script>var cart_params = {\"title\":\"Cart\",\"sku\":\"C-1\"};</script></body></html>";
        let backend = |req: &BackendRequest| -> TranslationResult<BackendResponse> {
            Ok(BackendResponse::Content(req.html_document.replace(">Cart<", ">Panier<")))
        };
        let outcome = service().translate_html(html, "/fr/", &backend);

        assert_eq!(outcome.state, PipelineState::Reassembled);
        assert!(outcome
            .content
            .contains("var cart_params = {\"title\":\"Panier\",\"sku\":\"C-1\"};"));
        assert_eq!(outcome.translated_leaves(), 1);
        assert!(!outcome.bundles[0].fell_back());
    }

    #[test]
    fn test_disabled_service_skips() {
        let service = FragmentService::new(TranslationConfig {
            enabled: false,
            ..TranslationConfig::default()
        })
        .unwrap();
        let failing = |_: &BackendRequest| -> TranslationResult<BackendResponse> {
            panic!("backend must not be called")
        };
        let outcome = service.translate_html("<p>Hi</p>", "/", &failing);
        assert_eq!(outcome.state, PipelineState::Skipped);
        assert_eq!(outcome.content, "<p>Hi</p>");
    }

    #[test]
    fn test_json_without_leaves_skips_backend() {
        let failing = |_: &BackendRequest| -> TranslationResult<BackendResponse> {
            panic!("backend must not be called")
        };
        let outcome = service().translate_json(r#"{"id": 7, "sku": "A-1"}"#, "cart", "/", &failing);
        assert_eq!(outcome.state, PipelineState::Skipped);
        assert_eq!(outcome.content, r#"{"id": 7, "sku": "A-1"}"#);
    }

    #[test]
    fn test_invalid_json_body_falls_back() {
        let outcome = service().translate_json("{oops", "cart", "/", &echo);
        assert_eq!(outcome.state, PipelineState::Failed);
        assert_eq!(outcome.content, "{oops");
        assert!(matches!(outcome.error, Some(TranslationError::InvalidJson { .. })));
    }

    #[test]
    fn test_stats_snapshot_and_reset() {
        let mut stats = ServiceStats::default();
        stats.inc_pages();
        stats.add_fragments(3);
        stats.add_processing_time(Duration::from_millis(2));
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.pages_processed, 1);
        assert_eq!(snapshot.fragments_extracted, 3);
        assert_eq!(snapshot.processing_time, Duration::from_millis(2));

        stats.reset();
        assert_eq!(stats.snapshot(), ServiceStatsSnapshot::default());
    }
}
