//! 片段标记编解码
//!
//! 出站：每个片段序列化为一个可寻址的 `<div data-fragment="...">` 元素，
//! 所有标记放在同一个 `<div data-fragment-markers>` 容器里，追加到页面 body。
//! 入站：从译文 HTML 中按标记属性找回 `(名称, 路径) -> 译文`。
//!
//! 标识符是 `名称 + U+001F + 路径` 的 URL 安全 base64，任何路径字符都能安全
//! 放进属性值；解码基于 DOM，属性重排、引号和空白改写都不影响识别。

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use html5ever::interface::{Attribute, QualName};
use html5ever::tendril::format_tendril;
use html5ever::tree_builder::{create_element, NodeOrText, TreeSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, RcDom};

use crate::parsers::html::dom::{
    find_elements_with_attr, get_body_node, get_node_attr, get_text_content_replacing, html_to_dom,
};
use crate::parsers::html::serializer::{serialize_document, serialize_node};
use crate::translation::config::constants;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::extractor::{Fragment, FragmentBundle};
use crate::translation::pipeline::path::KeyPath;

/// 路径 -> 译文
pub type TranslatedMap = HashMap<KeyPath, String>;

/// 名称 -> 该文档的译文
pub type TranslatedBundles = HashMap<String, TranslatedMap>;

const KEY_SEPARATOR: char = '\u{1f}';

/// 编码片段标识符
pub fn encode_marker_id(name: &str, path: &KeyPath) -> String {
    URL_SAFE_NO_PAD.encode(format!("{}{}{}", name, KEY_SEPARATOR, path))
}

/// 解码片段标识符
pub fn decode_marker_id(id: &str) -> Option<(String, KeyPath)> {
    let bytes = URL_SAFE_NO_PAD.decode(id.trim()).ok()?;
    let decoded = String::from_utf8(bytes).ok()?;
    let (name, path) = decoded.split_once(KEY_SEPARATOR)?;
    Some((name.to_string(), KeyPath::parse(path)))
}

/// 解码结果
#[derive(Debug, Clone, Default)]
pub struct DecodedDocument {
    /// 去掉标记容器后的页面；页面中没有容器时为 `None`
    pub html: Option<String>,
    pub translations: TranslatedBundles,
    /// 找到的标记元素数量（含无法识别的）
    pub markers_found: usize,
}

/// 标记编解码器
pub struct MarkerCodec;

impl MarkerCodec {
    /// 单个片段包的 HTML 片段
    pub fn embed(bundle: &FragmentBundle) -> TranslationResult<String> {
        Self::embed_all(std::slice::from_ref(bundle))
    }

    /// 多个片段包合并为一个标记容器
    pub fn embed_all(bundles: &[FragmentBundle]) -> TranslationResult<String> {
        let dom = RcDom::default();
        let container = build_container(&dom, bundles.iter().flat_map(|b| b.fragments.iter()));
        Ok(serialize_node(&container)?)
    }

    /// 把标记容器追加到页面 body，返回发往后端的完整文档
    pub fn embed_into_document(html: &str, bundles: &[FragmentBundle]) -> TranslationResult<String> {
        let dom = html_to_dom(html);
        let body = get_body_node(&dom).unwrap_or_else(|| dom.document.clone());
        let container = build_container(&dom, bundles.iter().flat_map(|b| b.fragments.iter()));
        dom.append(&body, NodeOrText::AppendNode(container));

        let document = serialize_document(&dom)?;
        tracing::debug!(
            "嵌入 {} 个片段包 ({} 个片段)，文档长度 {} 字节",
            bundles.len(),
            bundles.iter().map(FragmentBundle::len).sum::<usize>(),
            document.len()
        );
        Ok(document)
    }

    /// 空白页面上的合成文档，用于 JSON 响应
    pub fn synthetic_document(bundles: &[FragmentBundle]) -> TranslationResult<String> {
        Self::embed_into_document(constants::SYNTHETIC_DOCUMENT, bundles)
    }

    /// 从译文 HTML 中解码所有标记
    pub fn decode(html: &str) -> TranslatedBundles {
        let dom = html_to_dom(html);
        decode_dom(&dom).0
    }

    /// 解码标记并从页面中移除标记容器
    pub fn decode_and_strip(html: &str) -> TranslationResult<DecodedDocument> {
        let dom = html_to_dom(html);
        let (translations, markers_found) = decode_dom(&dom);

        let containers = find_elements_with_attr(&dom.document, constants::MARKER_CONTAINER_ATTR);
        let html = if containers.is_empty() {
            None
        } else {
            for container in &containers {
                dom.remove_from_parent(container);
            }
            Some(serialize_document(&dom)?)
        };

        Ok(DecodedDocument {
            html,
            translations,
            markers_found,
        })
    }

    /// 检查一个片段包的解码结果；非空包却没有任何标记视为数据损坏
    pub fn check_bundle(
        bundle: &FragmentBundle,
        decoded: &TranslatedBundles,
    ) -> Result<(), TranslationError> {
        let found = decoded.get(&bundle.name).map(HashMap::len).unwrap_or(0);
        if !bundle.is_empty() && found == 0 {
            return Err(TranslationError::MarkerDecodeMismatch {
                name: bundle.name.clone(),
                expected: bundle.len(),
                found,
            });
        }
        Ok(())
    }
}

fn build_container<'a>(dom: &RcDom, fragments: impl Iterator<Item = &'a Fragment>) -> Handle {
    let container = create_element(
        dom,
        QualName::new(None, ns!(html), LocalName::from("div")),
        vec![Attribute {
            name: QualName::new(None, ns!(), LocalName::from(constants::MARKER_CONTAINER_ATTR)),
            value: format_tendril!(""),
        }],
    );

    for fragment in fragments {
        let marker = create_element(
            dom,
            QualName::new(None, ns!(html), LocalName::from("div")),
            vec![Attribute {
                name: QualName::new(None, ns!(), LocalName::from(constants::MARKER_ATTR)),
                value: format_tendril!("{}", encode_marker_id(&fragment.name, &fragment.path)),
            }],
        );
        // 回车会被 HTML 解析规范化为换行，改用带标记属性的 <br> 表示
        for (i, piece) in fragment.value.split('\r').enumerate() {
            if i > 0 {
                let cr = create_element(
                    dom,
                    QualName::new(None, ns!(html), LocalName::from("br")),
                    vec![Attribute {
                        name: QualName::new(
                            None,
                            ns!(),
                            LocalName::from(constants::CARRIAGE_RETURN_ATTR),
                        ),
                        value: format_tendril!(""),
                    }],
                );
                dom.append(&marker, NodeOrText::AppendNode(cr));
            }
            if !piece.is_empty() {
                dom.append(&marker, NodeOrText::AppendText(format_tendril!("{}", piece)));
            }
        }
        dom.append(&container, NodeOrText::AppendNode(marker));
    }

    container
}

fn decode_dom(dom: &RcDom) -> (TranslatedBundles, usize) {
    let mut translations = TranslatedBundles::new();
    let markers = find_elements_with_attr(&dom.document, constants::MARKER_ATTR);

    for marker in &markers {
        let Some(id) = get_node_attr(marker, constants::MARKER_ATTR) else {
            continue;
        };
        let Some((name, path)) = decode_marker_id(&id) else {
            tracing::warn!("无法识别的片段标记: '{}'", id);
            continue;
        };

        let text = get_text_content_replacing(marker, constants::CARRIAGE_RETURN_ATTR, "\r");
        let entry = translations.entry(name).or_default();
        if entry.contains_key(&path) {
            tracing::debug!("片段标记 '{}' 重复，保留第一个", path);
            continue;
        }
        entry.insert(path, text);
    }

    tracing::debug!(
        "解码 {} 个标记，涉及 {} 个片段包",
        markers.len(),
        translations.len()
    );
    (translations, markers.len())
}
