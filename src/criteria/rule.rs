//! Criteria rule definitions and the rule catalog.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::value::Value;

/// Severity of a rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Informational; does not affect the score.
    Info,
    /// Costs 2 quality points.
    Warn,
    /// Costs 10 quality points.
    Fail,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
        })
    }
}

/// What a rule is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// Nodes, optionally filtered by kind.
    Node,
    /// Edges, optionally filtered by edge kind.
    Edge,
    /// The graph as a whole.
    Graph,
    /// Node attributes; selects nodes like `Node`.
    Attribute,
}

impl TargetType {
    /// Wire tag of the target type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Edge => "edge",
            Self::Graph => "graph",
            Self::Attribute => "attribute",
        }
    }
}

/// A single kind tag or a set of alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KindFilter {
    /// Exactly this kind.
    One(String),
    /// Any of these kinds.
    Any(Vec<String>),
}

impl KindFilter {
    /// Whether `kind` passes the filter.
    #[must_use]
    pub fn matches(&self, kind: &str) -> bool {
        match self {
            Self::One(k) => k == kind,
            Self::Any(kinds) => kinds.iter().any(|k| k == kind),
        }
    }
}

impl fmt::Display for KindFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(k) => f.write_str(k),
            Self::Any(kinds) => write!(f, "{}", kinds.join("|")),
        }
    }
}

/// The element set a rule is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTarget {
    /// Element class.
    #[serde(rename = "type")]
    pub target_type: TargetType,
    /// Kind filter; absent means every kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<KindFilter>,
}

impl RuleTarget {
    /// Whether an element of `kind` belongs to the target set.
    #[must_use]
    pub fn accepts(&self, kind: &str) -> bool {
        self.kind.as_ref().map_or(true, |k| k.matches(kind))
    }
}

/// Condition type. Unknown tags land in [`ConditionType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionType {
    /// At least one target exists.
    Exists,
    /// No target exists.
    NotExists,
    /// Target count lies within `min..=max`.
    Count,
    /// An attribute satisfies an operator.
    Attribute,
    /// A node has outgoing edges of a kind.
    Connected,
    /// Evaluated outside this crate; always skipped.
    Custom,
    /// Unrecognized tag, kept verbatim; always skipped.
    Other(String),
}

impl ConditionType {
    /// Wire tag of the condition type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exists => "exists",
            Self::NotExists => "not_exists",
            Self::Count => "count",
            Self::Attribute => "attribute",
            Self::Connected => "connected",
            Self::Custom => "custom",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ConditionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "exists" => Self::Exists,
            "not_exists" => Self::NotExists,
            "count" => Self::Count,
            "attribute" => Self::Attribute,
            "connected" => Self::Connected,
            "custom" => Self::Custom,
            _ => Self::Other(s),
        }
    }
}

impl From<ConditionType> for String {
    fn from(c: ConditionType) -> Self {
        match c {
            ConditionType::Other(s) => s,
            named => named.as_str().to_string(),
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute comparison operator. Unknown tags land in
/// [`Operator::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    /// Loose equality.
    Eq,
    /// Loose inequality.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Member of an array operand.
    In,
    /// Not a member of an array operand.
    NotIn,
    /// Matches a regular expression.
    Matches,
    /// Does not match a regular expression.
    NotMatches,
    /// Unrecognized tag, kept verbatim.
    Unrecognized(String),
}

impl Operator {
    /// Wire tag of the operator.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Matches => "matches",
            Self::NotMatches => "not_matches",
            Self::Unrecognized(s) => s,
        }
    }
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        match s.as_str() {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            "matches" => Self::Matches,
            "not_matches" => Self::NotMatches,
            _ => Self::Unrecognized(s),
        }
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Unrecognized(s) => s,
            named => named.as_str().to_string(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The check a rule performs on each target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Check to perform.
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    /// Comparison operator for `attribute` checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    /// Expected operand for `attribute` checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Dotted attribute path, relative to `attrs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Edge kind counted by `connected`; absent counts every kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_kind: Option<String>,
    /// Lower bound for `count` and `connected`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,
    /// Upper bound for `count` and `connected`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

impl Condition {
    /// A condition of the given type with no operands.
    #[must_use]
    pub fn new(condition_type: ConditionType) -> Self {
        Self {
            condition_type,
            operator: None,
            value: None,
            path: None,
            edge_kind: None,
            min: None,
            max: None,
        }
    }
}

/// A declarative quality rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaRule {
    /// Unique rule id.
    pub id: String,
    /// Short human title.
    pub title: String,
    /// Longer explanation.
    #[serde(default)]
    pub description: String,
    /// Severity of each violation.
    pub severity: Severity,
    /// Category used for the per-category breakdown.
    pub category: String,
    /// Element set the rule inspects.
    pub target: RuleTarget,
    /// Check applied to the targets.
    pub condition: Condition,
    /// Template with `{target_ref}`, `{actual_value}` and `{expected_value}`
    /// placeholders.
    pub message: String,
    /// Why the rule matters, copied onto diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    /// How to fix a violation, copied onto diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
}

#[derive(Deserialize)]
struct RuleCatalogDoc {
    rules: Vec<CriteriaRule>,
}

/// Ordered set of rules with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RuleCatalogDoc")]
pub struct RuleCatalog {
    rules: Vec<CriteriaRule>,
}

impl RuleCatalog {
    /// Builds a catalog, rejecting duplicate rule ids.
    pub fn new(rules: Vec<CriteriaRule>) -> Result<Self, ValidationError> {
        let mut seen = BTreeSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(ValidationError::DuplicateRuleId {
                    rule_id: rule.id.clone(),
                });
            }
        }
        Ok(Self { rules })
    }

    /// Rules in catalog order.
    #[must_use]
    pub fn rules(&self) -> &[CriteriaRule] {
        &self.rules
    }

    /// Looks up a rule by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CriteriaRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when the catalog holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl TryFrom<RuleCatalogDoc> for RuleCatalog {
    type Error = ValidationError;

    fn try_from(doc: RuleCatalogDoc) -> Result<Self, Self::Error> {
        Self::new(doc.rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::from_json;

    const CATALOG: &str = r#"{
        "rules": [
            {
                "id": "R1",
                "title": "Needs exist",
                "severity": "FAIL",
                "category": "completeness",
                "target": {"type": "node", "kind": "Need"},
                "condition": {"type": "exists"},
                "message": "No needs"
            },
            {
                "id": "R2",
                "title": "Statements are short",
                "severity": "WARN",
                "category": "clarity",
                "target": {"type": "attribute", "kind": ["Need", "Requirement"]},
                "condition": {"type": "attribute", "path": "statement", "operator": "matches", "value": "^.{1,80}$"},
                "message": "{target_ref} statement too long",
                "fix_hint": "Split the statement"
            },
            {
                "id": "R3",
                "title": "Future",
                "severity": "INFO",
                "category": "misc",
                "target": {"type": "graph"},
                "condition": {"type": "semantic_similarity", "operator": "about"},
                "message": "n/a"
            }
        ]
    }"#;

    #[test]
    fn catalog_parses_with_fallbacks() {
        let catalog: RuleCatalog = from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 3);

        let r2 = catalog.get("R2").unwrap();
        assert_eq!(r2.severity, Severity::Warn);
        assert!(r2.target.accepts("Requirement"));
        assert!(!r2.target.accepts("Actor"));
        assert_eq!(r2.condition.operator, Some(Operator::Matches));

        let r3 = catalog.get("R3").unwrap();
        assert_eq!(
            r3.condition.condition_type,
            ConditionType::Other("semantic_similarity".to_string())
        );
        assert_eq!(
            r3.condition.operator,
            Some(Operator::Unrecognized("about".to_string()))
        );
        assert!(r3.target.accepts("anything"));
    }

    #[test]
    fn duplicate_rule_ids_are_rejected() {
        let text = r#"{"rules": [
            {"id": "A", "title": "t", "severity": "INFO", "category": "c",
             "target": {"type": "graph"}, "condition": {"type": "custom"}, "message": "m"},
            {"id": "A", "title": "t", "severity": "INFO", "category": "c",
             "target": {"type": "graph"}, "condition": {"type": "custom"}, "message": "m"}
        ]}"#;
        let err = from_json::<RuleCatalog>(text).unwrap_err();
        assert!(err.to_string().contains("Duplicate criteria rule id 'A'"));
    }

    #[test]
    fn unknown_tags_serialize_back_verbatim() {
        let json = serde_json::to_string(&Operator::Unrecognized("about".into())).unwrap();
        assert_eq!(json, "\"about\"");
        let json = serde_json::to_string(&ConditionType::NotExists).unwrap();
        assert_eq!(json, "\"not_exists\"");
        assert_eq!(Severity::Fail.to_string(), "FAIL");
    }
}
