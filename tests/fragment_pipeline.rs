//! 片段翻译管道集成测试
//!
//! 覆盖公开入口：查找片段、生成标记片段、解码译文、回填与整页翻译

mod common;

use fragment_translator::translation::core::PipelineState;
use fragment_translator::translation::pipeline::{
    rebuild, Disposition, KeyPath, MarkerCodec, MatchMode, RuleSet, RuleSpec, TranslatedMap,
};
use serde_json::json;

use common::{
    assert_valid_json, script_json, shop_service, DictionaryBackend, SHOP_PAGE, TEMPLATE_PAGE,
};

#[test]
fn test_sku_scenario_through_public_api() {
    let service = shop_service();
    let original = json!({"items":[{"name":"Red Shirt","sku":"RS-1"}]});

    let bundle = service.extract_value("cart", &original);
    assert_eq!(bundle.len(), 1);
    assert_eq!(bundle.fragments[0].path, KeyPath::parse("items.0.name"));
    assert_eq!(bundle.fragments[0].value, "Red Shirt");
    assert!(bundle.denied.contains(&KeyPath::parse("items.0.sku")));

    let mut translated = TranslatedMap::new();
    translated.insert(KeyPath::parse("items.0.name"), "Chemise rouge".to_string());

    assert_eq!(
        service.apply_translated(&bundle, &translated),
        json!({"items":[{"name":"Chemise rouge","sku":"RS-1"}]})
    );
}

#[test]
fn test_find_fragments_on_shop_page() {
    let bundles = shop_service().find_fragments(SHOP_PAGE);
    let names: Vec<&str> = bundles.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["cart_params", "search_params"]);

    let cart = &bundles[0];
    let paths: Vec<&str> = cart.fragments.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["items.0.name", "labels.empty"]);
    assert!(cart.denied.contains(&KeyPath::parse("checkout_url")));
    assert!(!cart.contains_path(&KeyPath::parse("items.0.sku")));

    let search = &bundles[1];
    assert!(search.contains_path(&KeyPath::parse("placeholder")));
    assert!(search.contains_path(&KeyPath::parse("i18n.no_results")));
}

#[test]
fn test_translate_shop_page() {
    let service = shop_service();
    let backend = DictionaryBackend::new();

    let outcome = service.translate_html(SHOP_PAGE, "/fr/cart", &backend);
    assert_eq!(outcome.state, PipelineState::Reassembled);
    assert!(outcome.error.is_none());
    assert_eq!(backend.calls(), 1, "all bundles share one backend round trip");

    let outbound = backend.last_document();
    assert!(outbound.contains("data-fragment-markers"));
    assert!(outbound.contains(">Red Shirt<"));
    assert!(outbound.contains(">No results<"));

    let page = &outcome.content;
    assert!(page.contains("Bienvenue dans la boutique"));
    assert!(!page.contains("data-fragment"));

    let cart = assert_valid_json(script_json(page, "cart_params").unwrap());
    assert_eq!(
        cart,
        json!({
            "items":[{"name":"Chemise rouge","sku":"RS-1","price":19.5}],
            "checkout_url":"https://shop.example/checkout",
            "labels":{"empty":"Votre panier est vide"}
        })
    );

    let search = assert_valid_json(script_json(page, "search_params").unwrap());
    assert_eq!(search["placeholder"], "Rechercher des produits");
    assert_eq!(search["min_chars"], 3);
    let nested = assert_valid_json(search["i18n"].as_str().unwrap());
    assert_eq!(nested, json!({"no_results": "Aucun résultat"}));

    assert_eq!(outcome.translated_leaves(), 4);
    assert!(outcome.bundles.iter().all(|b| !b.fell_back()));
}

#[test]
fn test_replacement_template_is_used() {
    let outcome = shop_service().translate_html(TEMPLATE_PAGE, "/fr/", &DictionaryBackend::new());

    assert_eq!(outcome.state, PipelineState::Reassembled);
    assert!(
        outcome
            .content
            .contains(r#"JSON.parse('{"button":"Payer maintenant","currency":"EUR"}')"#),
        "unexpected page: {}",
        outcome.content
    );
}

#[test]
fn test_repeated_variables_get_unique_names() {
    let page = r#"<html><head></head><body>
<script>var cart_params = {"title":"Red Shirt"};</script>
<script>var cart_params = {"title":"Your cart is empty"};</script>
</body></html>"#;
    let service = shop_service();

    let bundles = service.find_fragments(page);
    let names: Vec<&str> = bundles.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["cart_params", "cart_params#1"]);

    let outcome = service.translate_html(page, "/fr/", &DictionaryBackend::new());
    assert!(outcome.content.contains(r#"var cart_params = {"title":"Chemise rouge"};"#));
    assert!(outcome.content.contains(r#"var cart_params = {"title":"Votre panier est vide"};"#));
}

#[test]
fn test_html_fragments_round_trip() {
    let service = shop_service();
    let value = json!({"labels": {"empty": "Your cart is empty", "sku": "X-1"}});

    let snippet = service.to_html_fragments("cart", &value).unwrap();
    assert!(snippet.starts_with("<div data-fragment-markers"));

    let decoded = service.from_translated_html(&common::translate_text_nodes(&snippet));
    let map = &decoded["cart"];
    assert_eq!(map.len(), 1);
    assert_eq!(map[&KeyPath::parse("labels.empty")], "Votre panier est vide");
}

#[test]
fn test_translate_json_body() {
    let service = shop_service();
    let backend = DictionaryBackend::new();
    let body = r#"{"notice":"Your cart is empty","sku":"RS-1","count":0}"#;

    let outcome = service.translate_json(body, "cart_fragment", "/fr/cart", &backend);
    assert_eq!(outcome.state, PipelineState::Reassembled);
    assert_eq!(
        outcome.content,
        r#"{"notice":"Votre panier est vide","sku":"RS-1","count":0}"#
    );
    assert!(backend.last_document().starts_with("<!DOCTYPE html>"));
}

#[test]
fn test_json_without_translation_keeps_source_text() {
    let service = shop_service();
    // 词典里没有这句话，后端原样返回
    let body = "{ \"notice\" : \"Untouched text\" }";
    let outcome = service.translate_json(body, "notice", "/", &DictionaryBackend::new());
    assert_eq!(outcome.content, body);
}

#[test]
fn test_is_allowed() {
    let service = shop_service();
    assert!(service.is_allowed("items.0.name", "cart_params"));
    assert!(!service.is_allowed("items.0.sku", "cart_params"));
    assert!(!service.is_allowed("checkout_url", "cart_params"));
    assert!(!service.is_allowed("currency", "checkout"));
    assert!(service.is_allowed("button", "checkout"));
}

#[test]
fn test_first_match_wins() {
    let (rules, rejected) = RuleSet::from_specs(&[
        RuleSpec::new("token", MatchMode::Exact, Disposition::Allow),
        RuleSpec::new("token", MatchMode::Exact, Disposition::Deny),
    ]);
    assert!(rejected.is_empty());
    assert_eq!(
        rules.decide(&KeyPath::parse("token")).resolve(Disposition::Deny),
        Disposition::Allow
    );
}

#[test]
fn test_codec_and_rebuild_compose() {
    let value = json!({"title": "Red Shirt", "tags": ["Your cart is empty", "#ff0000"]});
    let bundle = fragment_translator::translation::pipeline::extract(
        "demo",
        &value,
        &RuleSet::empty(),
        Disposition::Allow,
    );

    let snippet = MarkerCodec::embed(&bundle).unwrap();
    let decoded = MarkerCodec::decode(&common::translate_text_nodes(&snippet));
    let rebuilt = rebuild(&bundle, &decoded["demo"]);

    assert_eq!(
        rebuilt,
        json!({"title": "Chemise rouge", "tags": ["Votre panier est vide", "#ff0000"]})
    );
}

#[test]
fn test_json_body_keeps_untranslated_bytes() {
    let body = r#"{"order_id":123456789012345678901234,"price":19.90,"url":"https:\/\/shop.example\/x","name":"Red Shirt"}"#;
    let outcome = shop_service().translate_json(body, "order", "/fr/", &DictionaryBackend::new());

    assert_eq!(outcome.state, PipelineState::Reassembled);
    assert_eq!(
        outcome.content,
        r#"{"order_id":123456789012345678901234,"price":19.90,"url":"https:\/\/shop.example\/x","name":"Chemise rouge"}"#
    );
}

#[test]
fn test_script_variable_keeps_untranslated_bytes() {
    let page = r#"<html><head></head><body>
<script>var cart_params = {"items":[{"name":"Red Shirt","price":19.90}], "checkout_url":"https:\/\/shop.example\/checkout"};</script>
</body></html>"#;
    let outcome = shop_service().translate_html(page, "/fr/", &DictionaryBackend::new());

    assert!(
        outcome.content.contains(
            r#"var cart_params = {"items":[{"name":"Chemise rouge","price":19.90}], "checkout_url":"https:\/\/shop.example\/checkout"};"#
        ),
        "unexpected page: {}",
        outcome.content
    );
}

#[test]
fn test_default_locator_reads_balanced_literal() {
    let page = r#"<html><head></head><body>
<script>var cart_params = {"tpl":"a{x}; b","labels":{"empty":"Your cart is empty"}};</script>
</body></html>"#;
    let service = shop_service();

    let bundles = service.find_fragments(page);
    assert_eq!(bundles.len(), 1);
    assert!(bundles[0].contains_path(&KeyPath::parse("labels.empty")));

    let outcome = service.translate_html(page, "/fr/", &DictionaryBackend::new());
    assert!(outcome.content.contains(
        r#"var cart_params = {"tpl":"a{x}; b","labels":{"empty":"Votre panier est vide"}};"#
    ));
}
