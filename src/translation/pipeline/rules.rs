//! 规则引擎
//!
//! 按注册顺序遍历规则，第一条命中的规则决定结果（先命中者胜）。
//! 没有任何规则命中时返回 `Unspecified`，由调用方按默认处置解释。
//!
//! 规则集在一次请求内只读：各集成（支付网关、搜索组件……）按固定顺序
//! 贡献自己的规则，由 [`RuleSetBuilder`] 一次性组装。

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::translation::error::TranslationError;
use crate::translation::pipeline::matcher::{Disposition, MatchMode, Rule};
use crate::translation::pipeline::path::KeyPath;

/// 规则引擎的判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Allow,
    Deny,
    Unspecified,
}

impl Decision {
    /// 按默认处置落地为允许/拒绝
    pub fn resolve(self, default: Disposition) -> Disposition {
        match self {
            Decision::Allow => Disposition::Allow,
            Decision::Deny => Disposition::Deny,
            Decision::Unspecified => default,
        }
    }
}

impl From<Disposition> for Decision {
    fn from(disposition: Disposition) -> Self {
        match disposition {
            Disposition::Allow => Decision::Allow,
            Disposition::Deny => Decision::Deny,
        }
    }
}

/// 外部提供的规则记录：`{key, mode, kind}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RuleSpec {
    pub key: String,
    #[serde(default)]
    pub mode: MatchMode,
    pub kind: Disposition,
}

impl RuleSpec {
    pub fn new(key: impl Into<String>, mode: MatchMode, kind: Disposition) -> Self {
        Self {
            key: key.into(),
            mode,
            kind,
        }
    }

    /// 编译为规则
    pub fn compile(&self) -> Result<Rule, TranslationError> {
        Rule::new(self.key.clone(), self.mode, self.kind)
    }
}

/// 在规则列表上做判定
pub fn decide(path: &KeyPath, rules: &[Rule]) -> Decision {
    rules
        .iter()
        .find(|rule| rule.matches(path))
        .map(|rule| Decision::from(rule.disposition()))
        .unwrap_or(Decision::Unspecified)
}

/// 不可变的有序规则集
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Arc<[Rule]>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl RuleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules: rules.into(),
        }
    }

    /// 从规则记录编译；非法规则被拒绝并单独返回，不影响其余规则
    pub fn from_specs(specs: &[RuleSpec]) -> (Self, Vec<TranslationError>) {
        let mut builder = RuleSetBuilder::new();
        builder.add_specs("default", specs);
        builder.finish()
    }

    pub fn decide(&self, path: &KeyPath) -> Decision {
        decide(path, &self.rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// 规则集构建器
///
/// 按调用顺序拼接各集成的规则。重复的 `(pattern, mode)` 在先命中者胜的语义下
/// 永远不会生效，构建时给出警告。
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    rules: Vec<Rule>,
    rejected: Vec<TranslationError>,
    seen: HashSet<(String, MatchMode)>,
}

impl RuleSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个集成的规则
    pub fn integration(mut self, area: &str, specs: &[RuleSpec]) -> Self {
        self.add_specs(area, specs);
        self
    }

    /// 追加单条已编译规则
    pub fn rule(mut self, rule: Rule) -> Self {
        self.push("custom", rule);
        self
    }

    pub fn add_specs(&mut self, area: &str, specs: &[RuleSpec]) {
        for spec in specs {
            match spec.compile() {
                Ok(rule) => self.push(area, rule),
                Err(e) => {
                    tracing::warn!("集成 '{}' 的规则被拒绝: {}", area, e);
                    self.rejected.push(e);
                }
            }
        }
    }

    fn push(&mut self, area: &str, rule: Rule) {
        let key = (rule.pattern().to_string(), rule.mode());
        if !self.seen.insert(key) {
            tracing::warn!(
                "集成 '{}' 的规则 '{}' ({:?}) 与之前的规则重复，永远不会生效",
                area,
                rule.pattern(),
                rule.mode()
            );
        }
        self.rules.push(rule);
    }

    /// 被拒绝的规则
    pub fn rejected(&self) -> &[TranslationError] {
        &self.rejected
    }

    pub fn build(self) -> RuleSet {
        self.finish().0
    }

    pub fn finish(self) -> (RuleSet, Vec<TranslationError>) {
        tracing::debug!(
            "规则集构建完成: {} 条有效, {} 条被拒绝",
            self.rules.len(),
            self.rejected.len()
        );
        (RuleSet::new(self.rules), self.rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(key: &str, mode: MatchMode, kind: Disposition) -> RuleSpec {
        RuleSpec::new(key, mode, kind)
    }

    #[test]
    fn test_first_match_wins() {
        let (rules, rejected) = RuleSet::from_specs(&[
            spec("token", MatchMode::Exact, Disposition::Allow),
            spec("token", MatchMode::Exact, Disposition::Deny),
        ]);
        assert!(rejected.is_empty());
        assert_eq!(rules.decide(&KeyPath::parse("token")), Decision::Allow);
    }

    #[test]
    fn test_unspecified_when_nothing_matches() {
        let (rules, _) = RuleSet::from_specs(&[spec("sku", MatchMode::Exact, Disposition::Deny)]);
        let decision = rules.decide(&KeyPath::parse("items.0.name"));
        assert_eq!(decision, Decision::Unspecified);
        assert_eq!(decision.resolve(Disposition::Allow), Disposition::Allow);
        assert_eq!(decision.resolve(Disposition::Deny), Disposition::Deny);
    }

    #[test]
    fn test_invalid_rule_rejected_others_kept() {
        let (rules, rejected) = RuleSet::from_specs(&[
            spec("(", MatchMode::RegexFull, Disposition::Deny),
            spec("id", MatchMode::Exact, Disposition::Deny),
        ]);
        assert_eq!(rules.len(), 1);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rules.decide(&KeyPath::parse("product.id")), Decision::Deny);
    }

    #[test]
    fn test_builder_composes_integrations_in_order() {
        let rules = RuleSetBuilder::new()
            .integration(
                "payment gateway",
                &[spec(r"^payment\..*$", MatchMode::RegexFull, Disposition::Deny)],
            )
            .integration(
                "search widget",
                &[spec("payment.title", MatchMode::Path, Disposition::Allow)],
            )
            .build();

        assert_eq!(rules.len(), 2);
        // 支付网关先注册，覆盖后面的允许规则
        assert_eq!(rules.decide(&KeyPath::parse("payment.title")), Decision::Deny);
    }

    #[test]
    fn test_rule_spec_defaults_to_exact() {
        let spec: RuleSpec = serde_json::from_str(r#"{"key": "currency", "kind": "deny"}"#).unwrap();
        assert_eq!(spec.mode, MatchMode::Exact);
        assert_eq!(spec.kind, Disposition::Deny);
    }
}
