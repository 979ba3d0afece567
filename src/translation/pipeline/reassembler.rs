//! 回填模块
//!
//! 按提取时记下的骨架把译文写回 JSON，输出与原值结构完全一致：
//! 键顺序、数组长度与非字符串值都不变，只有被提取的叶子可能改变。

use serde_json::Value;

use crate::translation::error::TranslationError;
use crate::translation::pipeline::extractor::{FragmentBundle, Skeleton};
use crate::translation::pipeline::markers::TranslatedMap;
use crate::translation::pipeline::path::KeyPath;
use crate::translation::pipeline::source::patch_source;

/// 一次回填的统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebuildReport {
    /// 写入了译文的叶子
    pub applied: usize,
    /// 没有译文或译文无效、保持原文的叶子
    pub untranslated: Vec<KeyPath>,
    /// 译文中出现但提取时并不存在的路径
    pub unexpected: Vec<TranslationError>,
}

impl RebuildReport {
    pub fn is_complete(&self) -> bool {
        self.untranslated.is_empty()
    }
}

/// 回填译文
pub fn rebuild(bundle: &FragmentBundle, translated: &TranslatedMap) -> Value {
    rebuild_with_report(bundle, translated).0
}

/// 回填译文并返回统计
pub fn rebuild_with_report(
    bundle: &FragmentBundle,
    translated: &TranslatedMap,
) -> (Value, RebuildReport) {
    let mut report = RebuildReport::default();

    for path in translated.keys() {
        if !bundle.contains_path(path) {
            tracing::warn!("片段包 '{}' 中不存在路径 '{}'，忽略该译文", bundle.name, path);
            report.unexpected.push(TranslationError::StructuralMismatch {
                name: bundle.name.clone(),
                path: path.to_string(),
            });
        }
    }

    let value = fill(&bundle.skeleton, translated, &mut report);

    tracing::debug!(
        "回填 '{}': {} 个已翻译, {} 个保持原文",
        bundle.name,
        report.applied,
        report.untranslated.len()
    );
    (value, report)
}

fn fill(skeleton: &Skeleton, translated: &TranslatedMap, report: &mut RebuildReport) -> Value {
    match skeleton {
        Skeleton::Verbatim(value) => value.clone(),
        Skeleton::Slot { path, original } => match translated.get(path) {
            Some(text) => match apply_leaf(original, text) {
                Some(text) => {
                    report.applied += 1;
                    Value::String(text)
                }
                None => {
                    tracing::debug!("路径 '{}' 的译文为空，保持原文", path);
                    report.untranslated.push(path.clone());
                    Value::String(original.clone())
                }
            },
            None => {
                report.untranslated.push(path.clone());
                Value::String(original.clone())
            }
        },
        Skeleton::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| fill(item, translated, report))
                .collect(),
        ),
        Skeleton::Object(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, child)| (key.clone(), fill(child, translated, report)))
                .collect(),
        ),
        Skeleton::Reencode { original, inner } => {
            let applied_before = report.applied;
            let value = fill(inner, translated, report);
            if report.applied == applied_before {
                return Value::String(original.clone());
            }
            // 在原始内层文本上替换，没翻译的部分保持原有写法
            match patch_source(original, &value).or_else(|_| serde_json::to_string(&value)) {
                Ok(encoded) => Value::String(encoded),
                Err(e) => {
                    tracing::warn!("嵌套 JSON 重新编码失败: {}", e);
                    Value::String(original.clone())
                }
            }
        }
    }
}

/// 计算写回叶子的最终文本，`None` 表示应保持原文
fn apply_leaf(original: &str, translated: &str) -> Option<String> {
    let core = translated.trim();
    if core.is_empty() {
        return None;
    }

    // HTML 往返会把 CRLF 规范化为 LF，内容未变时保留原始字节
    if normalize_newlines(core) == normalize_newlines(original.trim()) {
        return Some(original.to_string());
    }

    let leading = &original[..original.len() - original.trim_start().len()];
    let trailing = &original[original.trim_end().len()..];
    Some(format!("{}{}{}", leading, core, trailing))
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
