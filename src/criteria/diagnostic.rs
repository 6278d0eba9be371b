//! Diagnostics and the aggregate evaluation report.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::{EdgeKey, NodeId};
use crate::value::Value;

use super::Severity;

/// What a diagnostic is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetRef {
    /// A single node.
    Node {
        /// The node's id.
        id: NodeId,
    },
    /// A single edge, by identity triple.
    Edge {
        /// Source node.
        from: NodeId,
        /// Edge kind.
        kind: String,
        /// Target node.
        to: NodeId,
    },
    /// The graph as a whole.
    Graph,
}

impl TargetRef {
    pub(crate) fn edge(key: EdgeKey) -> Self {
        Self::Edge {
            from: key.from,
            kind: key.kind,
            to: key.to,
        }
    }
}

/// Rendered into the `{target_ref}` placeholder.
impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node { id } => write!(f, "{id}"),
            Self::Edge { from, kind, to } => write!(f, "{from} -[{kind}]-> {to}"),
            Self::Graph => f.write_str("graph"),
        }
    }
}

/// Snapshot of the comparison that produced a diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticMetadata {
    /// Observed value ("before").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<Value>,
    /// Value the rule expects ("after").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<Value>,
    /// Operator of an attribute comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Attribute path of an attribute comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// One rule violation instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Id of the violated rule.
    pub rule_id: String,
    /// Severity copied from the rule.
    pub severity: Severity,
    /// Category copied from the rule.
    pub category: String,
    /// Rendered message template.
    pub message: String,
    /// The element that violated the rule.
    pub target: TargetRef,
    /// Node ids or rendered edge keys supporting the finding.
    #[serde(default)]
    pub evidence: Vec<String>,
    /// The comparison that failed.
    #[serde(default)]
    pub metadata: DiagnosticMetadata,
    /// Why the rule matters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    /// How to fix the violation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
}

/// Substitutes `{target_ref}`, `{actual_value}` and `{expected_value}`.
///
/// Absent values render as `null`. The template is scanned once, so
/// substituted text is never expanded again.
pub(crate) fn render_message(
    template: &str,
    target: &TargetRef,
    actual: Option<&Value>,
    expected: Option<&Value>,
) -> String {
    let plain = |v: Option<&Value>| v.map_or_else(|| "null".to_string(), Value::to_plain_string);
    let placeholders = [
        ("{target_ref}", target.to_string()),
        ("{actual_value}", plain(actual)),
        ("{expected_value}", plain(expected)),
    ];

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        match placeholders.iter().find(|(name, _)| rest.starts_with(name)) {
            Some((name, value)) => {
                out.push_str(value);
                rest = &rest[name.len()..];
            }
            None => {
                out.push('{');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Per-category rule counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    /// Rules in the category.
    pub total: usize,
    /// Rules that produced no diagnostics.
    pub passed: usize,
    /// Rules that produced at least one diagnostic.
    pub violated: usize,
}

/// Result of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaEvaluation {
    /// Number of rules in the catalog.
    pub total_rules: usize,
    /// `total_rules - diagnostics.len()`; negative when rules fire repeatedly.
    pub passed: i64,
    /// Diagnostics with `FAIL` severity.
    pub failed: usize,
    /// Diagnostics with `WARN` severity.
    pub warned: usize,
    /// Diagnostics with `INFO` severity.
    pub info: usize,
    /// Score in `0..=100`, see [`CriteriaEvaluation::score`].
    pub quality_score: u32,
    /// Every violation, in rule order.
    pub diagnostics: Vec<Diagnostic>,
    /// Rule counts keyed by category.
    pub categories: BTreeMap<String, CategoryBreakdown>,
    /// Rules that errored or could not be evaluated.
    #[serde(default)]
    pub skipped_rules: Vec<String>,
    /// When the run finished.
    pub evaluated_at: DateTime<Utc>,
}

impl CriteriaEvaluation {
    /// `100 - (failed * 10 + warned * 2)`, clamped to `0..=100`.
    #[must_use]
    pub fn score(failed: usize, warned: usize) -> u32 {
        let penalty = failed.saturating_mul(10).saturating_add(warned.saturating_mul(2));
        u32::try_from(100_usize.saturating_sub(penalty)).unwrap_or(0)
    }

    /// Diagnostics raised by one rule.
    pub fn diagnostics_for<'a>(&'a self, rule_id: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.rule_id == rule_id)
    }
}
