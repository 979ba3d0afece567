//! 键路径
//!
//! 叶子在 JSON 值中的位置，以点号连接的对象键与数组下标表示，例如 `items.3.name`。

use std::fmt;

/// 路径分隔符
pub const SEPARATOR: char = '.';

/// JSON 叶子的键路径
///
/// 内部保存规范化后的字符串形式：纯数字段去掉前导零。
/// 两条路径相等当且仅当规范化字符串相等。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath(String);

impl KeyPath {
    /// 根路径（空字符串）
    pub fn root() -> Self {
        Self(String::new())
    }

    /// 从点号路径解析并规范化
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }

        let normalized = path
            .split(SEPARATOR)
            .map(normalize_segment)
            .collect::<Vec<_>>()
            .join(".");

        Self(normalized)
    }

    /// 追加对象键
    ///
    /// 键按与 [`KeyPath::parse`] 相同的规则规范化，因此 `"01"` 与 `"1"`
    /// 两个键得到同一条路径，由提取器按先到先得处理。
    pub fn key(&self, key: &str) -> Self {
        let normalized = key
            .split(SEPARATOR)
            .map(normalize_segment)
            .collect::<Vec<_>>()
            .join(".");
        self.push(&normalized)
    }

    /// 追加数组下标
    pub fn index(&self, index: usize) -> Self {
        self.push(&index.to_string())
    }

    fn push(&self, segment: &str) -> Self {
        if self.0.is_empty() {
            Self(segment.to_string())
        } else {
            Self(format!("{}{}{}", self.0, SEPARATOR, segment))
        }
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 最后一段（叶子自身的键或下标）
    pub fn last_segment(&self) -> Option<&str> {
        if self.0.is_empty() {
            None
        } else {
            self.0.rsplit(SEPARATOR).next()
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        let empty = self.0.is_empty();
        self.0.split(SEPARATOR).filter(move |_| !empty)
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// `self` 是否位于 `prefix` 之下（或与之相同）
    pub fn starts_with(&self, prefix: &KeyPath) -> bool {
        if prefix.is_root() {
            return true;
        }
        self.0 == prefix.0
            || (self.0.starts_with(&prefix.0)
                && self.0[prefix.0.len()..].starts_with(SEPARATOR))
    }
}

/// 纯数字段去掉前导零，其余原样保留
fn normalize_segment(segment: &str) -> String {
    if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
        let trimmed = segment.trim_start_matches('0');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        segment.to_string()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}
