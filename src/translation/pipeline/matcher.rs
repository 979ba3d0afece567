//! 路径匹配器
//!
//! 判断单条键路径是否命中单条规则。三种匹配模式：
//!
//! - `Exact`: 模式等于整条路径，或等于叶子自身的键（最后一段）
//! - `Path`: 模式本身是点号路径，规范化数字段后逐字相等
//! - `RegexFull`: 锚定的正则表达式，必须匹配整条路径
//!
//! 不做大小写规范化，模式按原文匹配。

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::path::KeyPath;

/// 匹配模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Exact,
    Path,
    RegexFull,
}

/// 规则处置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    #[default]
    Allow,
    Deny,
}

/// 已加载的规则
///
/// 正则在构造时编译一次，之后对每个叶子复用。
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: String,
    mode: MatchMode,
    disposition: Disposition,
    compiled: Compiled,
}

#[derive(Debug, Clone)]
enum Compiled {
    Exact(KeyPath),
    Path(KeyPath),
    Regex(Regex),
}

impl Rule {
    /// 创建规则，正则模式非法时返回 `PatternError`
    pub fn new(
        pattern: impl Into<String>,
        mode: MatchMode,
        disposition: Disposition,
    ) -> TranslationResult<Self> {
        let pattern = pattern.into();
        let compiled = match mode {
            MatchMode::Exact => Compiled::Exact(KeyPath::parse(&pattern)),
            MatchMode::Path => Compiled::Path(KeyPath::parse(&pattern)),
            MatchMode::RegexFull => Compiled::Regex(compile_anchored(&pattern)?),
        };

        Ok(Self {
            pattern,
            mode,
            disposition,
            compiled,
        })
    }

    pub fn allow(pattern: impl Into<String>, mode: MatchMode) -> TranslationResult<Self> {
        Self::new(pattern, mode, Disposition::Allow)
    }

    pub fn deny(pattern: impl Into<String>, mode: MatchMode) -> TranslationResult<Self> {
        Self::new(pattern, mode, Disposition::Deny)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    /// 判断路径是否命中本规则
    pub fn matches(&self, path: &KeyPath) -> bool {
        match &self.compiled {
            Compiled::Exact(expected) => {
                expected == path
                    || (expected.depth() == 1 && path.last_segment() == Some(expected.as_str()))
            }
            Compiled::Path(expected) => expected == path,
            Compiled::Regex(regex) => regex.is_match(path.as_str()),
        }
    }
}

/// 判断路径是否命中规则
pub fn matches(path: &KeyPath, rule: &Rule) -> bool {
    rule.matches(path)
}

/// 编译为整串匹配的正则
///
/// 作者写的 `^...$` 也能正常工作，外层锚点是幂等的。
fn compile_anchored(pattern: &str) -> TranslationResult<Regex> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| TranslationError::PatternError {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> KeyPath {
        KeyPath::parse(s)
    }

    #[test]
    fn test_exact_matches_whole_path_or_leaf_key() {
        let rule = Rule::deny("sku", MatchMode::Exact).unwrap();
        assert!(rule.matches(&path("sku")));
        assert!(rule.matches(&path("items.0.sku")));
        assert!(!rule.matches(&path("items.0.sku_label")));
        assert!(!rule.matches(&path("sku.value")));

        let rule = Rule::deny("items.0.sku", MatchMode::Exact).unwrap();
        assert!(rule.matches(&path("items.0.sku")));
        assert!(!rule.matches(&path("items.1.sku")));
    }

    #[test]
    fn test_exact_is_case_sensitive() {
        let rule = Rule::deny("SKU", MatchMode::Exact).unwrap();
        assert!(!rule.matches(&path("items.0.sku")));
    }

    #[test]
    fn test_path_mode_is_literal() {
        let rule = Rule::allow("items.0.name", MatchMode::Path).unwrap();
        assert!(rule.matches(&path("items.0.name")));
        assert!(rule.matches(&path("items.00.name")));
        assert!(!rule.matches(&path("items.3.name")));
        assert!(!rule.matches(&path("name")));
    }

    #[test]
    fn test_zero_padded_keys_match_built_paths() {
        let built = KeyPath::root().key("zones").key("01").key("code");

        let rule = Rule::deny("zones.01.code", MatchMode::Path).unwrap();
        assert!(rule.matches(&built));

        let rule = Rule::deny("01", MatchMode::Exact).unwrap();
        assert!(rule.matches(&KeyPath::root().key("zones").key("01")));
    }

    #[test]
    fn test_regex_full_ignores_array_position() {
        let rule = Rule::allow(r"^items\.\d+\.name$", MatchMode::RegexFull).unwrap();
        assert!(rule.matches(&path("items.0.name")));
        assert!(rule.matches(&path("items.12.name")));
        assert!(!rule.matches(&path("items.x.name")));
    }

    #[test]
    fn test_regex_full_is_anchored() {
        let rule = Rule::deny(r"url", MatchMode::RegexFull).unwrap();
        assert!(rule.matches(&path("url")));
        assert!(!rule.matches(&path("image.url")));
        assert!(!rule.matches(&path("url_label")));

        let rule = Rule::deny(r".*\.url", MatchMode::RegexFull).unwrap();
        assert!(rule.matches(&path("image.url")));
    }

    #[test]
    fn test_invalid_regex_is_pattern_error() {
        let error = Rule::deny("items.(", MatchMode::RegexFull).unwrap_err();
        assert!(matches!(error, TranslationError::PatternError { .. }));
    }

    #[test]
    fn test_mode_deserialization() {
        let mode: MatchMode = serde_json::from_str("\"regex_full\"").unwrap();
        assert_eq!(mode, MatchMode::RegexFull);
        let kind: Disposition = serde_json::from_str("\"deny\"").unwrap();
        assert_eq!(kind, Disposition::Deny);
    }
}
