//! 原文回写
//!
//! 回填得到的是 `serde_json::Value`，直接序列化会改写原文中没有翻译的部分，
//! 例如 `\/` 与 `é` 这类转义以及空白缩进。这里按原始文本逐层比对新值，
//! 只替换真正变化的标量，其余字节原样保留。

use std::collections::HashMap;
use std::ops::Range;

use serde_json::value::RawValue;
use serde_json::Value;

use crate::parsers::js::{escape_for_script, splice};
use crate::translation::error::{TranslationError, TranslationResult};

type Edit = (Range<usize>, String);

/// 把新值写回原始 JSON 文本
///
/// # 示例
/// ```rust
/// use fragment_translator::translation::pipeline::source::patch_source;
///
/// let source = r#"{ "url": "https:\/\/shop.example", "label": "Cart" }"#;
/// let updated = serde_json::json!({"url": "https://shop.example", "label": "Panier"});
/// assert_eq!(
///     patch_source(source, &updated).unwrap(),
///     r#"{ "url": "https:\/\/shop.example", "label": "Panier" }"#
/// );
/// ```
pub fn patch_source(source: &str, updated: &Value) -> TranslationResult<String> {
    patch_with(source, updated, |text| text)
}

/// 同 [`patch_source`]，替换进去的文本按 `<script>` 内容转义
pub fn patch_script_source(source: &str, updated: &Value) -> TranslationResult<String> {
    patch_with(source, updated, |text| escape_for_script(&text))
}

fn patch_with(
    source: &str,
    updated: &Value,
    escape: impl Fn(String) -> String,
) -> TranslationResult<String> {
    let root: &RawValue = serde_json::from_str(source)?;
    let mut edits = Vec::new();
    collect_edits(source, root, updated, &mut edits)?;

    tracing::trace!("原文回写: {} 处替换", edits.len());
    let edits = edits
        .into_iter()
        .map(|(range, text)| (range, escape(text)))
        .collect();
    Ok(splice(source, edits))
}

fn collect_edits(
    source: &str,
    raw: &RawValue,
    updated: &Value,
    edits: &mut Vec<Edit>,
) -> TranslationResult<()> {
    let text = raw.get();

    match updated {
        Value::Object(map) if text.starts_with('{') => {
            let children: HashMap<String, &RawValue> = serde_json::from_str(text)?;
            if children.len() == map.len() {
                let mut pairs = Vec::with_capacity(children.len());
                for (key, child) in &children {
                    match map.get(key) {
                        Some(next) => pairs.push((*child, next)),
                        None => break,
                    }
                }
                if pairs.len() == children.len() {
                    for (child, next) in pairs {
                        collect_edits(source, child, next, edits)?;
                    }
                    return Ok(());
                }
            }
        }
        Value::Array(items) if text.starts_with('[') => {
            let children: Vec<&RawValue> = serde_json::from_str(text)?;
            if children.len() == items.len() {
                for (child, next) in children.into_iter().zip(items) {
                    collect_edits(source, child, next, edits)?;
                }
                return Ok(());
            }
        }
        _ => {}
    }

    let original: Value = serde_json::from_str(text)?;
    if &original != updated {
        edits.push((span(source, text)?, serde_json::to_string(updated)?));
    }
    Ok(())
}

/// `part` 在 `source` 中的字节范围，`part` 必须借用自 `source`
fn span(source: &str, part: &str) -> TranslationResult<Range<usize>> {
    let start = (part.as_ptr() as usize)
        .checked_sub(source.as_ptr() as usize)
        .filter(|start| start + part.len() <= source.len())
        .ok_or_else(|| TranslationError::InternalError("JSON 片段不属于原文".to_string()))?;
    Ok(start..start + part.len())
}
