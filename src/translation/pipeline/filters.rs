//! 叶子过滤器模块
//!
//! 规则引擎允许之后的廉价启发式检查：判断字符串叶子是否像人类可读文本。
//! 空串与纯数字/符号总是跳过；URL、邮箱、十六进制颜色等按集成配置决定。

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::translation::config::constants;

/// 叶子过滤配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LeafFilterConfig {
    /// 跳过纯数字或纯符号
    pub skip_numeric_or_symbolic: bool,
    /// 跳过 URL
    pub skip_urls: bool,
    /// 跳过邮箱地址
    pub skip_emails: bool,
    /// 跳过十六进制颜色（`#fff`、`#a1b2c3`）
    pub skip_hex_colors: bool,
    /// 跳过不含任何字母的值
    pub require_alphabetic: bool,
}

impl Default for LeafFilterConfig {
    fn default() -> Self {
        Self {
            skip_numeric_or_symbolic: true,
            skip_urls: false,
            skip_emails: false,
            skip_hex_colors: false,
            require_alphabetic: false,
        }
    }
}

impl LeafFilterConfig {
    /// 对机器可读字段最严格的配置
    pub fn strict() -> Self {
        Self {
            skip_numeric_or_symbolic: true,
            skip_urls: true,
            skip_emails: true,
            skip_hex_colors: true,
            require_alphabetic: true,
        }
    }
}

/// 叶子跳过原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    Empty,
    NumericOrSymbolic,
    Url,
    Email,
    HexColor,
    NoAlphabetic,
}

/// 叶子过滤器
#[derive(Debug, Default)]
pub struct LeafFilter {
    config: LeafFilterConfig,
    regex_cache: RegexCache,
}

/// 正则表达式缓存
#[derive(Debug, Default)]
struct RegexCache {
    url_regex: OnceLock<Option<Regex>>,
    email_regex: OnceLock<Option<Regex>>,
    hex_color_regex: OnceLock<Option<Regex>>,
}

fn cached<'a>(cell: &'a OnceLock<Option<Regex>>, pattern: &str) -> Option<&'a Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

impl LeafFilter {
    pub fn new(config: LeafFilterConfig) -> Self {
        Self {
            config,
            regex_cache: RegexCache::default(),
        }
    }

    pub fn config(&self) -> &LeafFilterConfig {
        &self.config
    }

    /// 判断叶子是否应当翻译
    pub fn should_translate(&self, text: &str) -> bool {
        self.skip_reason(text).is_none()
    }

    /// 返回跳过原因，`None` 表示可以翻译
    pub fn skip_reason(&self, text: &str) -> Option<SkipReason> {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Some(SkipReason::Empty);
        }

        if self.config.skip_numeric_or_symbolic && self.is_pure_symbols_or_numbers(trimmed) {
            return Some(SkipReason::NumericOrSymbolic);
        }

        if self.config.skip_urls && self.is_url(trimmed) {
            return Some(SkipReason::Url);
        }

        if self.config.skip_emails && self.is_email(trimmed) {
            return Some(SkipReason::Email);
        }

        if self.config.skip_hex_colors && self.is_hex_color(trimmed) {
            return Some(SkipReason::HexColor);
        }

        if self.config.require_alphabetic && !trimmed.chars().any(|c| c.is_alphabetic()) {
            return Some(SkipReason::NoAlphabetic);
        }

        None
    }

    /// 检查是否为URL
    fn is_url(&self, text: &str) -> bool {
        if text.contains(char::is_whitespace) {
            return false;
        }

        if text.starts_with("//") || text.starts_with("mailto:") || text.starts_with("tel:") {
            return true;
        }

        cached(&self.regex_cache.url_regex, r"^[a-zA-Z][a-zA-Z0-9+.-]*://\S+$")
            .map(|regex| regex.is_match(text))
            .unwrap_or(false)
    }

    /// 检查是否为邮箱
    fn is_email(&self, text: &str) -> bool {
        if text.len() > constants::MAX_EMAIL_LENGTH || !text.contains('@') {
            return false;
        }

        cached(
            &self.regex_cache.email_regex,
            r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$",
        )
        .map(|regex| regex.is_match(text))
        .unwrap_or(false)
    }

    /// 检查是否为十六进制颜色
    fn is_hex_color(&self, text: &str) -> bool {
        cached(
            &self.regex_cache.hex_color_regex,
            r"^#(?:[0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$",
        )
        .map(|regex| regex.is_match(text))
        .unwrap_or(false)
    }

    /// 检查是否为纯符号或数字
    fn is_pure_symbols_or_numbers(&self, text: &str) -> bool {
        text.chars()
            .all(|c| c.is_numeric() || c.is_ascii_punctuation() || c.is_whitespace())
    }

    /// 批量过滤文本
    pub fn filter_texts<'a>(&self, texts: &[&'a str]) -> Vec<&'a str> {
        texts
            .iter()
            .copied()
            .filter(|text| self.should_translate(text))
            .collect()
    }
}

impl Clone for LeafFilter {
    fn clone(&self) -> Self {
        Self::new(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_skips_empty_and_numeric() {
        let filter = LeafFilter::default();
        assert_eq!(filter.skip_reason(""), Some(SkipReason::Empty));
        assert_eq!(filter.skip_reason("   "), Some(SkipReason::Empty));
        assert_eq!(filter.skip_reason("42"), Some(SkipReason::NumericOrSymbolic));
        assert_eq!(filter.skip_reason("12.50 $"), Some(SkipReason::NumericOrSymbolic));
        assert_eq!(filter.skip_reason("--"), Some(SkipReason::NumericOrSymbolic));
        assert!(filter.should_translate("Red Shirt"));
    }

    #[test]
    fn test_default_filter_keeps_urls() {
        let filter = LeafFilter::default();
        assert!(filter.should_translate("https://shop.example.com/cart"));
        assert!(filter.should_translate("#fff"));
    }

    #[test]
    fn test_strict_filter() {
        let filter = LeafFilter::new(LeafFilterConfig::strict());
        assert_eq!(
            filter.skip_reason("https://shop.example.com/cart"),
            Some(SkipReason::Url)
        );
        assert_eq!(filter.skip_reason("//cdn.example.com/a.js"), Some(SkipReason::Url));
        assert_eq!(filter.skip_reason("hello@example.com"), Some(SkipReason::Email));
        assert_eq!(filter.skip_reason("#A1B2C3"), Some(SkipReason::HexColor));
        assert_eq!(filter.skip_reason("#fff"), Some(SkipReason::HexColor));
        assert!(filter.should_translate("Visit https://example.com today"));
        assert!(filter.should_translate("Add to cart"));
    }

    #[test]
    fn test_require_alphabetic() {
        let config = LeafFilterConfig {
            skip_numeric_or_symbolic: false,
            require_alphabetic: true,
            ..Default::default()
        };
        let filter = LeafFilter::new(config);
        assert_eq!(filter.skip_reason("€ 10"), Some(SkipReason::NoAlphabetic));
        assert!(filter.should_translate("été"));
    }

    #[test]
    fn test_filter_texts() {
        let filter = LeafFilter::default();
        let kept = filter.filter_texts(&["Checkout", "", "100", "Place order"]);
        assert_eq!(kept, vec!["Checkout", "Place order"]);
    }
}
