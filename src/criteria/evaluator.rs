//! Rule evaluation over an SSoT.
//!
//! Evaluation is read-only and total: a rule that errors is logged, listed
//! in `skipped_rules` and contributes no diagnostics.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{OnceLock, RwLock};

use chrono::Utc;
use regex::Regex;
use tracing::{info, warn};

use crate::error::{EvaluationError, ValidationError};
use crate::graph::{Edge, GraphIndexes, Node, Ssot};
use crate::value::{lookup_path, Map, Value};

use super::diagnostic::render_message;
use super::{
    CategoryBreakdown, Condition, ConditionType, CriteriaEvaluation, CriteriaRule, Diagnostic,
    DiagnosticMetadata, Operator, RuleCatalog, RuleTarget, Severity, TargetRef, TargetType,
};

const REGEX_CACHE_MAX: usize = 1024;

static REGEX_CACHE: OnceLock<RwLock<HashMap<String, Regex>>> = OnceLock::new();

fn cached_regex(pattern: &str) -> Result<Regex, EvaluationError> {
    let cache = REGEX_CACHE.get_or_init(|| RwLock::new(HashMap::new()));

    if let Ok(guard) = cache.read() {
        if let Some(re) = guard.get(pattern) {
            return Ok(re.clone());
        }
    }

    let compiled = Regex::new(pattern).map_err(|e| EvaluationError::InvalidRegex {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    // A poisoned cache only costs recompilation.
    if let Ok(mut guard) = cache.write() {
        if guard.len() >= REGEX_CACHE_MAX {
            guard.clear();
        }
        guard
            .entry(pattern.to_string())
            .or_insert_with(|| compiled.clone());
    }
    Ok(compiled)
}

fn count_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Member of a rule's target set.
#[derive(Clone, Copy)]
enum Target<'a> {
    Node(&'a Node),
    Edge(&'a Edge),
}

impl Target<'_> {
    fn kind(&self) -> &str {
        match self {
            Self::Node(n) => &n.kind,
            Self::Edge(e) => &e.kind,
        }
    }

    fn attrs(&self) -> Option<&Map> {
        match self {
            Self::Node(n) => Some(&n.attrs),
            Self::Edge(e) => e.attrs.as_ref(),
        }
    }

    fn reference(&self) -> TargetRef {
        match self {
            Self::Node(n) => TargetRef::Node { id: n.id.clone() },
            Self::Edge(e) => TargetRef::edge(e.key()),
        }
    }

    fn anchor(&self) -> String {
        match self {
            Self::Node(n) => n.id.to_string(),
            Self::Edge(e) => e.key().to_string(),
        }
    }
}

fn collect_targets<'a>(target: &RuleTarget, ssot: &'a Ssot) -> Vec<Target<'a>> {
    match target.target_type {
        TargetType::Edge => ssot
            .edges
            .iter()
            .filter(|e| target.accepts(&e.kind))
            .map(Target::Edge)
            .collect(),
        TargetType::Node | TargetType::Attribute | TargetType::Graph => ssot
            .nodes
            .iter()
            .filter(|n| target.accepts(&n.kind))
            .map(Target::Node)
            .collect(),
    }
}

/// A violation before it is rendered against its rule.
struct Violation {
    target: TargetRef,
    evidence: Vec<String>,
    actual: Option<Value>,
    expected: Option<Value>,
    operator: Option<String>,
    path: Option<String>,
}

impl Violation {
    fn at(target: TargetRef, evidence: Vec<String>) -> Self {
        Self {
            target,
            evidence,
            actual: None,
            expected: None,
            operator: None,
            path: None,
        }
    }

    fn values(mut self, actual: Option<Value>, expected: Option<Value>) -> Self {
        self.actual = actual;
        self.expected = expected;
        self
    }

    fn into_diagnostic(self, rule: &CriteriaRule) -> Diagnostic {
        let message = render_message(
            &rule.message,
            &self.target,
            self.actual.as_ref(),
            self.expected.as_ref(),
        );
        Diagnostic {
            rule_id: rule.id.clone(),
            severity: rule.severity,
            category: rule.category.clone(),
            message,
            target: self.target,
            evidence: self.evidence,
            metadata: DiagnosticMetadata {
                actual_value: self.actual,
                expected_value: self.expected,
                operator: self.operator,
                path: self.path,
            },
            why: rule.why.clone(),
            fix_hint: rule.fix_hint.clone(),
        }
    }
}

/// Compiled attribute comparison.
enum Comparison<'a> {
    Eq(&'a Value),
    Ne(&'a Value),
    Ordered(fn(Ordering) -> bool, &'a Value),
    In(&'a [Value]),
    NotIn(&'a [Value]),
    Matches(Regex),
    NotMatches(Regex),
}

impl<'a> Comparison<'a> {
    fn compile(operator: &Operator, expected: &'a Value) -> Result<Self, EvaluationError> {
        let list = |op: &Operator| {
            expected
                .as_array()
                .ok_or_else(|| EvaluationError::OperandMismatch {
                    operator: op.to_string(),
                    expected: "array",
                    actual: expected.type_name(),
                })
        };
        let pattern = || cached_regex(&expected.to_plain_string());

        Ok(match operator {
            Operator::Eq => Self::Eq(expected),
            Operator::Ne => Self::Ne(expected),
            Operator::Gt => Self::Ordered(Ordering::is_gt, expected),
            Operator::Gte => Self::Ordered(Ordering::is_ge, expected),
            Operator::Lt => Self::Ordered(Ordering::is_lt, expected),
            Operator::Lte => Self::Ordered(Ordering::is_le, expected),
            Operator::In => Self::In(list(operator)?),
            Operator::NotIn => Self::NotIn(list(operator)?),
            Operator::Matches => Self::Matches(pattern()?),
            Operator::NotMatches => Self::NotMatches(pattern()?),
            Operator::Unrecognized(op) => {
                return Err(EvaluationError::UnknownOperator {
                    operator: op.clone(),
                })
            }
        })
    }

    /// Whether `actual` satisfies the comparison. Absent values only pass
    /// the negative operators.
    fn passes(&self, actual: Option<&Value>) -> bool {
        let contains = |list: &[Value]| actual.is_some_and(|a| list.iter().any(|v| a.loose_eq(v)));
        let text = || actual.map(Value::to_plain_string).unwrap_or_default();
        match self {
            Self::Eq(e) => actual.is_some_and(|a| a.loose_eq(e)),
            Self::Ne(e) => !actual.is_some_and(|a| a.loose_eq(e)),
            Self::Ordered(accept, e) => actual
                .and_then(|a| a.partial_compare(e))
                .is_some_and(|ord| accept(ord)),
            Self::In(list) => contains(list),
            Self::NotIn(list) => !contains(list),
            Self::Matches(re) => re.is_match(&text()),
            Self::NotMatches(re) => !re.is_match(&text()),
        }
    }
}

fn required<'c, T>(
    field: Option<&'c T>,
    condition: &Condition,
    name: &str,
) -> Result<&'c T, EvaluationError>
where
    T: ?Sized,
{
    field.ok_or_else(|| EvaluationError::MissingConditionField {
        condition: condition.condition_type.to_string(),
        field: name.to_string(),
    })
}

fn check_exists(targets: &[Target<'_>]) -> Vec<Violation> {
    if targets.is_empty() {
        vec![Violation::at(TargetRef::Graph, Vec::new()).values(Some(Value::Int(0)), Some(Value::Int(1)))]
    } else {
        Vec::new()
    }
}

fn check_not_exists(targets: &[Target<'_>]) -> Vec<Violation> {
    targets
        .iter()
        .map(|t| {
            Violation::at(t.reference(), vec![t.anchor()]).values(Some(Value::from(t.kind())), None)
        })
        .collect()
}

fn check_count(condition: &Condition, targets: &[Target<'_>]) -> Vec<Violation> {
    let n = targets.len() as u64;
    let below = condition.min.is_some_and(|min| n < min);
    let above = condition.max.is_some_and(|max| n > max);
    if !(below || above) {
        return Vec::new();
    }
    let bound = match (condition.min, condition.max) {
        (Some(min), Some(max)) => format!("between {min} and {max}"),
        (Some(min), None) => format!("at least {min}"),
        (None, Some(max)) => format!("at most {max}"),
        (None, None) => String::new(),
    };
    let evidence = targets.iter().map(Target::anchor).collect();
    vec![Violation::at(TargetRef::Graph, evidence).values(Some(Value::from(n)), Some(Value::from(bound)))]
}

fn check_attribute(
    condition: &Condition,
    targets: &[Target<'_>],
) -> Result<Vec<Violation>, EvaluationError> {
    let path = required(condition.path.as_deref(), condition, "path")?;
    let operator = required(condition.operator.as_ref(), condition, "operator")?;
    let expected = required(condition.value.as_ref(), condition, "value")?;
    let comparison = Comparison::compile(operator, expected)?;

    Ok(targets
        .iter()
        .filter_map(|t| {
            let actual = t.attrs().and_then(|attrs| lookup_path(attrs, path));
            if comparison.passes(actual) {
                return None;
            }
            let mut v = Violation::at(t.reference(), vec![t.anchor()])
                .values(actual.cloned(), Some(expected.clone()));
            v.operator = Some(operator.to_string());
            v.path = Some(path.to_string());
            Some(v)
        })
        .collect())
}

fn check_connected(
    rule: &CriteriaRule,
    targets: &[Target<'_>],
    indexes: &GraphIndexes,
) -> Result<Vec<Violation>, EvaluationError> {
    if rule.target.target_type == TargetType::Edge {
        return Err(EvaluationError::UnsupportedTarget {
            condition: rule.condition.condition_type.to_string(),
            target: TargetType::Edge.as_str().to_string(),
        });
    }
    let edge_kind = rule.condition.edge_kind.as_deref();
    let min = rule.condition.min.unwrap_or(1);

    Ok(targets
        .iter()
        .filter_map(|t| {
            let Target::Node(node) = t else {
                return None;
            };
            let count = indexes.outgoing(&node.id, edge_kind).count();
            if count as u64 >= min {
                return None;
            }
            let mut v = Violation::at(t.reference(), vec![t.anchor()])
                .values(Some(Value::from(count)), Some(Value::from(min)));
            v.path = edge_kind.map(str::to_string);
            Some(v)
        })
        .collect())
}

/// Violations for one rule, or `None` when the condition is not evaluable.
fn evaluate_rule(
    rule: &CriteriaRule,
    ssot: &Ssot,
    indexes: &GraphIndexes,
) -> Result<Option<Vec<Violation>>, EvaluationError> {
    let targets = collect_targets(&rule.target, ssot);
    let violations = match &rule.condition.condition_type {
        ConditionType::Exists => check_exists(&targets),
        ConditionType::NotExists => check_not_exists(&targets),
        ConditionType::Count => check_count(&rule.condition, &targets),
        ConditionType::Attribute => check_attribute(&rule.condition, &targets)?,
        ConditionType::Connected => check_connected(rule, &targets, indexes)?,
        ConditionType::Custom | ConditionType::Other(_) => return Ok(None),
    };
    Ok(Some(violations))
}

/// Evaluates a fixed rule catalog against SSoT snapshots.
#[derive(Debug, Clone, Default)]
pub struct CriteriaEngine {
    catalog: RuleCatalog,
}

impl CriteriaEngine {
    /// Creates an engine over a validated catalog.
    #[must_use]
    pub fn new(catalog: RuleCatalog) -> Self {
        Self { catalog }
    }

    /// Builds an engine from loose rules, rejecting duplicate ids.
    pub fn from_rules(rules: Vec<CriteriaRule>) -> Result<Self, ValidationError> {
        RuleCatalog::new(rules).map(Self::new)
    }

    /// The rules this engine evaluates.
    #[must_use]
    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Runs every rule against `ssot`.
    ///
    /// Indexes carried by the document are ignored; adjacency is rebuilt
    /// from `nodes` and `edges` on every call.
    #[must_use]
    pub fn evaluate(&self, ssot: &Ssot) -> CriteriaEvaluation {
        let indexes = GraphIndexes::build(&ssot.nodes, &ssot.edges);
        let mut diagnostics = Vec::new();
        let mut skipped_rules = Vec::new();
        let mut categories: BTreeMap<String, CategoryBreakdown> = BTreeMap::new();

        for rule in self.catalog.rules() {
            let produced = match evaluate_rule(rule, ssot, &indexes) {
                Ok(Some(violations)) => violations,
                Ok(None) => {
                    warn!(
                        rule_id = %rule.id,
                        condition = %rule.condition.condition_type,
                        "condition type is not evaluated; rule skipped"
                    );
                    skipped_rules.push(rule.id.clone());
                    Vec::new()
                }
                Err(e) => {
                    warn!(rule_id = %rule.id, error = %e, "rule evaluation failed; rule skipped");
                    skipped_rules.push(rule.id.clone());
                    Vec::new()
                }
            };

            let entry = categories.entry(rule.category.clone()).or_default();
            entry.total += 1;
            if produced.is_empty() {
                entry.passed += 1;
            } else {
                entry.violated += 1;
            }
            diagnostics.extend(produced.into_iter().map(|v| v.into_diagnostic(rule)));
        }

        let by_severity = |s: Severity| diagnostics.iter().filter(|d| d.severity == s).count();
        let failed = by_severity(Severity::Fail);
        let warned = by_severity(Severity::Warn);
        let info = by_severity(Severity::Info);
        let total_rules = self.catalog.len();
        let quality_score = CriteriaEvaluation::score(failed, warned);

        info!(
            total_rules,
            diagnostics = diagnostics.len(),
            failed,
            warned,
            skipped = skipped_rules.len(),
            quality_score,
            "criteria evaluation complete"
        );

        CriteriaEvaluation {
            total_rules,
            passed: count_i64(total_rules) - count_i64(diagnostics.len()),
            failed,
            warned,
            info,
            quality_score,
            diagnostics,
            categories,
            skipped_rules,
            evaluated_at: Utc::now(),
        }
    }
}
