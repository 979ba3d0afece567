//! JavaScript 变量定位模块
//!
//! 服务端渲染的页面经常把状态以 JSON 字面量的形式写进 `<script>`，
//! 例如 `var cart_params = {...};`。此模块按片段覆盖描述中的正则找到这些
//! 字面量，交给片段提取器处理，并在翻译后按替换模板写回。
//!
//! 主要功能：
//! - [`FragmentOverride`]：一个命名 JSON 变量的定位与写回描述
//! - [`ScriptLocator`]：编译后的定位器，返回每个匹配的范围和 JSON 文本
//! - [`splice`]：按范围把新内容拼回原始 HTML
//! - [`encode_for_script`]、[`escape_for_script`]：生成可以安全放进 `<script>` 的 JSON 文本

use std::ops::Range;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

use crate::translation::config::constants;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::matcher::Disposition;

/// 片段覆盖描述
///
/// - `name`: 变量的逻辑名称，同时作为片段名称
/// - `key`: 指定后该片段默认拒绝，只允许与 `key` 精确匹配的路径
/// - `match`: 捕获 JSON 字面量的正则，命名分组 `json` 优先，否则使用第 1 组；
///   缺省时匹配 `var <name> = {...};`
/// - `replacement`: 写回模板，`%json%` 会被替换为新的 JSON；缺省时原位替换捕获的字面量
/// - `default`: 显式指定未命中规则时的处置
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FragmentOverride {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Disposition>,
}

impl FragmentOverride {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_match(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// 该片段的默认处置
    ///
    /// 显式 `default` 优先；设置了 `key` 时默认拒绝；否则沿用全局默认值。
    pub fn default_disposition(&self, global: Disposition) -> Disposition {
        match (self.default, &self.key) {
            (Some(disposition), _) => disposition,
            (None, Some(_)) => Disposition::Deny,
            (None, None) => global,
        }
    }

    /// 实际使用的正则
    pub fn effective_pattern(&self) -> String {
        match &self.pattern {
            Some(pattern) => pattern.clone(),
            None => format!(
                r"(?s)\bvar\s+{}\s*=\s*(?P<json>[\{{\[].*?[\}}\]])\s*;",
                regex::escape(&self.name)
            ),
        }
    }
}

/// 一次匹配
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptMatch {
    /// 唯一名称，重复匹配依次为 `name`、`name#1`、`name#2` ...
    pub name: String,
    /// 整个匹配的字节范围
    pub range: Range<usize>,
    /// JSON 字面量的字节范围
    pub json_range: Range<usize>,
    pub json: String,
}

impl ScriptMatch {
    /// 解析 JSON 字面量，失败时返回 `InvalidJson`
    pub fn parse(&self) -> TranslationResult<Value> {
        serde_json::from_str(&self.json).map_err(|e| TranslationError::InvalidJson {
            name: self.name.clone(),
            message: e.to_string(),
        })
    }
}

/// 编译后的脚本变量定位器
#[derive(Debug, Clone)]
pub struct ScriptLocator {
    spec: FragmentOverride,
    regex: Regex,
}

impl ScriptLocator {
    /// 编译定位器，正则非法时返回 `PatternError`
    pub fn new(spec: FragmentOverride) -> TranslationResult<Self> {
        let pattern = spec.effective_pattern();
        let regex = Regex::new(&pattern).map_err(|e| TranslationError::PatternError {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        if regex.captures_len() < 2 {
            return Err(TranslationError::PatternError {
                pattern,
                message: "正则中没有捕获 JSON 的分组".to_string(),
            });
        }

        Ok(Self { spec, regex })
    }

    pub fn spec(&self) -> &FragmentOverride {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// 按文档顺序找到所有匹配
    ///
    /// # 示例
    /// ```rust
    /// use fragment_translator::parsers::js::{FragmentOverride, ScriptLocator};
    ///
    /// let locator = ScriptLocator::new(FragmentOverride::new("cart_params")).unwrap();
    /// let html = r#"<script>var cart_params = {"label":"Cart"};</script>"#;
    /// let found = locator.locate(html);
    /// assert_eq!(found.len(), 1);
    /// assert_eq!(found[0].json, r#"{"label":"Cart"}"#);
    /// ```
    pub fn locate(&self, html: &str) -> Vec<ScriptMatch> {
        let mut found = Vec::new();
        let mut cursor = 0;

        while cursor <= html.len() {
            let Some(captures) = self.regex.captures_at(html, cursor) else {
                break;
            };
            let Some(whole) = captures.get(0) else {
                break;
            };
            let Some(json) = captures
                .name(constants::JSON_CAPTURE_GROUP)
                .or_else(|| captures.get(1))
            else {
                cursor = next_cursor(html, whole.start(), whole.end());
                continue;
            };

            let mut range = whole.range();
            let mut json_range = json.range();

            // 默认模式的非贪婪捕获可能停在字符串里的 `};` 处，按完整字面量重新取范围
            if self.spec.pattern.is_none() {
                if let Some(end) = literal_end(html, json_range.start) {
                    json_range.end = end;
                    range.end = statement_end(html, end);
                }
            }

            let name = match found.len() {
                0 => self.spec.name.clone(),
                n => format!("{}{}{}", self.spec.name, constants::REPEATED_NAME_SEPARATOR, n),
            };

            cursor = next_cursor(html, range.start, range.end);
            found.push(ScriptMatch {
                name,
                json: html[json_range.clone()].to_string(),
                range,
                json_range,
            });
        }

        tracing::trace!("脚本变量 '{}' 找到 {} 处", self.spec.name, found.len());
        found
    }

    /// 计算写回内容，返回 `(被替换的范围, 新文本)`
    pub fn replacement(&self, found: &ScriptMatch, json: &str) -> (Range<usize>, String) {
        match &self.spec.replacement {
            Some(template) => (
                found.range.clone(),
                template.replace(constants::JSON_PLACEHOLDER, json),
            ),
            None => (found.json_range.clone(), json.to_string()),
        }
    }
}

/// 从 `start` 开始的 JSON 字面量的结束位置，字面量不完整或非法时为 `None`
fn literal_end(html: &str, start: usize) -> Option<usize> {
    let mut stream = serde_json::Deserializer::from_str(&html[start..]).into_iter::<&RawValue>();
    match stream.next() {
        Some(Ok(_)) => Some(start + stream.byte_offset()),
        _ => None,
    }
}

/// 字面量之后的 `;`（含前导空白）一并计入语句
fn statement_end(html: &str, end: usize) -> usize {
    let rest = &html[end..];
    let trimmed = rest.trim_start();
    if trimmed.starts_with(';') {
        end + (rest.len() - trimmed.len()) + 1
    } else {
        end
    }
}

/// 空匹配时前进一个字符，避免原地循环
fn next_cursor(html: &str, start: usize, end: usize) -> usize {
    if end > start {
        return end;
    }
    html[end..]
        .chars()
        .next()
        .map_or(html.len() + 1, |c| end + c.len_utf8())
}

/// 把一组不重叠的替换拼回原文
///
/// 替换按起始位置排序后依次应用；与前一个替换重叠的条目会被丢弃。
pub fn splice(html: &str, mut replacements: Vec<(Range<usize>, String)>) -> String {
    replacements.sort_by_key(|(range, _)| range.start);

    let mut output = String::with_capacity(html.len());
    let mut cursor = 0;

    for (range, text) in replacements {
        if range.start < cursor || range.end > html.len() {
            tracing::warn!("忽略重叠或越界的替换 {:?}", range);
            continue;
        }
        output.push_str(&html[cursor..range.start]);
        output.push_str(&text);
        cursor = range.end;
    }

    output.push_str(&html[cursor..]);
    output
}

/// 把 JSON 值编码为可以安全写入 `<script>` 的文本
///
/// `</` 与 `<!--` 会提前结束脚本或开启注释，改写为等价的 JSON 转义。
pub fn encode_for_script(value: &Value) -> TranslationResult<String> {
    let json = serde_json::to_string(value)?;
    Ok(escape_for_script(&json))
}

/// 转义已经编码好的 JSON 文本
pub fn escape_for_script(json: &str) -> String {
    json.replace("</", "<\\/").replace("<!--", "\\u003c!--")
}
