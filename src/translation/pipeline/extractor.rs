//! 片段提取器
//!
//! 递归遍历任意 JSON 值，产出扁平有序的叶子片段，同时保留一份骨架用于回填。
//!
//! - 对象/数组：递归子节点，路径追加键或下标
//! - 字符串：先尝试按 JSON 解析，得到对象或数组则递归进入解析结果，
//!   并在骨架中记下 [`Skeleton::Reencode`]，回填时重新序列化为字符串
//! - 其余字符串叶子交给规则引擎与叶子过滤器
//! - 数字、布尔、null 永远不是叶子

use std::collections::HashSet;

use serde_json::Value;

use crate::translation::pipeline::filters::{LeafFilter, SkipReason};
use crate::translation::pipeline::matcher::Disposition;
use crate::translation::pipeline::path::KeyPath;
use crate::translation::pipeline::rules::{Decision, RuleSet};

/// 一个可翻译叶子
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// 所属文档的逻辑名称
    pub name: String,
    pub path: KeyPath,
    pub value: String,
}

/// 回填模板
///
/// 被拒绝、被过滤以及非字符串的值保存在 `Verbatim` 中，回填时原样复制。
#[derive(Debug, Clone, PartialEq)]
pub enum Skeleton {
    Verbatim(Value),
    Slot { path: KeyPath, original: String },
    Array(Vec<Skeleton>),
    Object(Vec<(String, Skeleton)>),
    /// 内容本身是 JSON 的字符串；回填后重新编码为字符串
    Reencode {
        original: String,
        inner: Box<Skeleton>,
    },
}

impl Skeleton {
    /// 骨架中的槽位数量
    pub fn slot_count(&self) -> usize {
        match self {
            Skeleton::Verbatim(_) => 0,
            Skeleton::Slot { .. } => 1,
            Skeleton::Array(items) => items.iter().map(Skeleton::slot_count).sum(),
            Skeleton::Object(entries) => entries.iter().map(|(_, s)| s.slot_count()).sum(),
            Skeleton::Reencode { inner, .. } => inner.slot_count(),
        }
    }
}

/// 一次提取的结果
#[derive(Debug, Clone)]
pub struct FragmentBundle {
    pub name: String,
    pub fragments: Vec<Fragment>,
    pub skeleton: Skeleton,
    /// 原始值，任何不一致时回退使用
    pub original: Value,
    /// 被规则显式拒绝的路径
    pub denied: Vec<KeyPath>,
    /// 规则允许但被启发式跳过的路径
    pub skipped: Vec<(KeyPath, SkipReason)>,
}

impl FragmentBundle {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn contains_path(&self, path: &KeyPath) -> bool {
        self.fragments.iter().any(|f| &f.path == path)
    }

    pub fn fragment(&self, path: &KeyPath) -> Option<&Fragment> {
        self.fragments.iter().find(|f| &f.path == path)
    }
}

/// 片段提取器
pub struct FragmentExtractor<'a> {
    rules: &'a RuleSet,
    filter: &'a LeafFilter,
    default_disposition: Disposition,
}

impl<'a> FragmentExtractor<'a> {
    pub fn new(rules: &'a RuleSet, filter: &'a LeafFilter, default_disposition: Disposition) -> Self {
        Self {
            rules,
            filter,
            default_disposition,
        }
    }

    /// 从一个 JSON 值提取片段包
    pub fn extract(&self, name: &str, value: &Value) -> FragmentBundle {
        let mut walk = Walk {
            name,
            fragments: Vec::new(),
            denied: Vec::new(),
            skipped: Vec::new(),
            seen: HashSet::new(),
        };

        let skeleton = self.walk_value(value, &KeyPath::root(), &mut walk);

        tracing::debug!(
            "片段提取 '{}': {} 个片段, {} 个拒绝, {} 个跳过",
            name,
            walk.fragments.len(),
            walk.denied.len(),
            walk.skipped.len()
        );

        FragmentBundle {
            name: name.to_string(),
            fragments: walk.fragments,
            skeleton,
            original: value.clone(),
            denied: walk.denied,
            skipped: walk.skipped,
        }
    }

    fn walk_value(&self, value: &Value, path: &KeyPath, walk: &mut Walk<'_>) -> Skeleton {
        match value {
            Value::Object(map) => {
                if self.deny_container(path, walk) {
                    return Skeleton::Verbatim(value.clone());
                }
                let entries = map
                    .iter()
                    .map(|(key, child)| (key.clone(), self.walk_value(child, &path.key(key), walk)))
                    .collect();
                Skeleton::Object(entries)
            }
            Value::Array(items) => {
                if self.deny_container(path, walk) {
                    return Skeleton::Verbatim(value.clone());
                }
                let entries = items
                    .iter()
                    .enumerate()
                    .map(|(i, child)| self.walk_value(child, &path.index(i), walk))
                    .collect();
                Skeleton::Array(entries)
            }
            Value::String(text) => self.walk_string(text, path, walk),
            other => Skeleton::Verbatim(other.clone()),
        }
    }

    fn walk_string(&self, text: &str, path: &KeyPath, walk: &mut Walk<'_>) -> Skeleton {
        if let Some(inner) = decode_nested(text) {
            if self.deny_container(path, walk) {
                return Skeleton::Verbatim(Value::String(text.to_string()));
            }
            tracing::trace!("路径 '{}' 是嵌套 JSON 字符串", path);
            let inner = self.walk_value(&inner, path, walk);
            return Skeleton::Reencode {
                original: text.to_string(),
                inner: Box::new(inner),
            };
        }

        let verbatim = || Skeleton::Verbatim(Value::String(text.to_string()));

        match self.rules.decide(path).resolve(self.default_disposition) {
            Disposition::Deny => {
                walk.denied.push(path.clone());
                return verbatim();
            }
            Disposition::Allow => {}
        }

        if let Some(reason) = self.filter.skip_reason(text) {
            walk.skipped.push((path.clone(), reason));
            return verbatim();
        }

        // 含点号或前导零的键可能与其他路径撞车，只保留第一个
        if !walk.seen.insert(path.clone()) {
            tracing::debug!("路径 '{}' 重复，后出现的叶子保持原样", path);
            return verbatim();
        }

        walk.fragments.push(Fragment {
            name: walk.name.to_string(),
            path: path.clone(),
            value: text.to_string(),
        });

        Skeleton::Slot {
            path: path.clone(),
            original: text.to_string(),
        }
    }

    /// 容器路径被显式拒绝时整棵子树保持原样
    fn deny_container(&self, path: &KeyPath, walk: &mut Walk<'_>) -> bool {
        if path.is_root() {
            return false;
        }
        if self.rules.decide(path) == Decision::Deny {
            walk.denied.push(path.clone());
            return true;
        }
        false
    }
}

struct Walk<'n> {
    name: &'n str,
    fragments: Vec<Fragment>,
    denied: Vec<KeyPath>,
    skipped: Vec<(KeyPath, SkipReason)>,
    seen: HashSet<KeyPath>,
}

/// 字符串内容是否为编码后的对象或数组
pub fn decode_nested(text: &str) -> Option<Value> {
    let trimmed = text.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }

    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        _ => None,
    }
}

/// 提取片段包
pub fn extract(
    name: &str,
    value: &Value,
    rules: &RuleSet,
    default_disposition: Disposition,
) -> FragmentBundle {
    let filter = LeafFilter::default();
    FragmentExtractor::new(rules, &filter, default_disposition).extract(name, value)
}
