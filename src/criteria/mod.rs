//! Criteria evaluation: declarative quality rules, diagnostics, the quality
//! score and the quality gate.

mod diagnostic;
mod evaluator;
mod gate;
mod rule;

pub use diagnostic::{CategoryBreakdown, CriteriaEvaluation, Diagnostic, DiagnosticMetadata, TargetRef};
pub use evaluator::CriteriaEngine;
pub use gate::{check_quality_gate, GateViolation, QualityGate};
pub use rule::{
    Condition, ConditionType, CriteriaRule, KindFilter, Operator, RuleCatalog, RuleTarget, Severity,
    TargetType,
};
