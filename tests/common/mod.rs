// 集成测试公共模块
//
// 提供测试页面、可编程的翻译后端和断言助手

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use fragment_translator::parsers::js::FragmentOverride;
use fragment_translator::translation::core::{
    BackendRequest, BackendResponse, FragmentService, TranslationBackend,
};
use fragment_translator::translation::error::{TranslationError, TranslationResult};
use fragment_translator::translation::pipeline::{Disposition, MatchMode, RuleSpec};
use fragment_translator::translation::{IntegrationConfig, TranslationConfig};

/// 购物车页面：两个脚本变量，一个可见段落
pub const SHOP_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Shop</title></head>
<body>
<p>Welcome to the shop</p>
<script>
var cart_params = {"items":[{"name":"Red Shirt","sku":"RS-1","price":19.5}],"checkout_url":"https://shop.example/checkout","labels":{"empty":"Your cart is empty"}};
</script>
<script>var search_params = {"placeholder":"Search products","min_chars":3,"i18n":"{\"no_results\":\"No results\"}"};</script>
</body></html>"#;

/// 模板写回的页面
pub const TEMPLATE_PAGE: &str = r#"<html><head></head><body><script>window.checkout = JSON.parse('{"button":"Pay now","currency":"EUR"}');</script></body></html>"#;

/// 英法词典
pub const DICTIONARY: &[(&str, &str)] = &[
    ("Welcome to the shop", "Bienvenue dans la boutique"),
    ("Red Shirt", "Chemise rouge"),
    ("Your cart is empty", "Votre panier est vide"),
    ("Search products", "Rechercher des produits"),
    ("No results", "Aucun résultat"),
    ("Pay now", "Payer maintenant"),
];

/// 测试配置：一个商店集成
pub fn shop_config() -> TranslationConfig {
    TranslationConfig {
        target_lang: "fr".to_string(),
        source_lang: "en".to_string(),
        integrations: vec![
            IntegrationConfig {
                name: "shop".to_string(),
                rules: vec![
                    RuleSpec::new("sku", MatchMode::Exact, Disposition::Deny),
                    RuleSpec::new(r".*_url", MatchMode::RegexFull, Disposition::Deny),
                ],
                fragments: vec![FragmentOverride::new("cart_params")],
                filter: None,
            },
            IntegrationConfig {
                name: "search".to_string(),
                rules: Vec::new(),
                fragments: vec![FragmentOverride::new("search_params")],
                filter: None,
            },
            IntegrationConfig {
                name: "payment".to_string(),
                rules: vec![RuleSpec::new("currency", MatchMode::Exact, Disposition::Deny)],
                fragments: vec![FragmentOverride::new("checkout")
                    .with_match(r"JSON\.parse\('(?P<json>\{.*?\})'\)")
                    .with_replacement("JSON.parse('%json%')")],
                filter: None,
            },
        ],
        ..TranslationConfig::default()
    }
}

pub fn shop_service() -> FragmentService {
    FragmentService::new(shop_config()).expect("shop config is valid")
}

/// 按词典替换标记文本的后端，记录调用次数与最后一次请求
#[derive(Default)]
pub struct DictionaryBackend {
    pub calls: AtomicUsize,
    pub last_request: Mutex<Option<BackendRequest>>,
}

impl DictionaryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_document(&self) -> String {
        self.last_request
            .lock()
            .unwrap()
            .as_ref()
            .map(|r| r.html_document.clone())
            .unwrap_or_default()
    }
}

impl TranslationBackend for DictionaryBackend {
    fn translate(&self, request: &BackendRequest) -> TranslationResult<BackendResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        Ok(BackendResponse::Content(translate_text_nodes(&request.html_document)))
    }
}

/// 只替换完整文本节点 `>text<`，脚本内容不受影响
pub fn translate_text_nodes(html: &str) -> String {
    DICTIONARY.iter().fold(html.to_string(), |doc, (en, fr)| {
        doc.replace(&format!(">{en}<"), &format!(">{fr}<"))
    })
}

pub fn unavailable_backend(_: &BackendRequest) -> TranslationResult<BackendResponse> {
    Err(TranslationError::BackendUnavailable("connection refused".to_string()))
}

pub fn timeout_backend(_: &BackendRequest) -> TranslationResult<BackendResponse> {
    Err(TranslationError::BackendTimeout("30s".to_string()))
}

pub fn redirect_backend(_: &BackendRequest) -> TranslationResult<BackendResponse> {
    Ok(BackendResponse::Redirect("/fr/".to_string()))
}

/// 翻译文本但丢掉所有标记标识
pub fn marker_dropping_backend(request: &BackendRequest) -> TranslationResult<BackendResponse> {
    let translated = translate_text_nodes(&request.html_document);
    Ok(BackendResponse::Content(translated.replace("data-fragment=\"", "data-lost=\"")))
}

/// 截取脚本变量赋值中的 JSON 文本
pub fn script_json<'a>(html: &'a str, variable: &str) -> Option<&'a str> {
    let start = html.find(&format!("var {variable} = "))? + variable.len() + 7;
    let end = start + html[start..].find("};")? + 1;
    Some(&html[start..end])
}

/// 断言 JSON 文本合法并返回解析结果
pub fn assert_valid_json(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap_or_else(|e| panic!("invalid JSON {text:?}: {e}"))
}
