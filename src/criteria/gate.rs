//! Quality gate thresholds over an evaluation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SsotError, SsotResult};

use super::CriteriaEvaluation;

/// Optional thresholds; unset thresholds never fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityGate {
    /// Largest tolerated number of `FAIL` diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fail: Option<usize>,
    /// Largest tolerated number of `WARN` diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_warn: Option<usize>,
    /// Lowest tolerated quality score, within `0..=100`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_quality_score: Option<u32>,
}

/// A threshold the evaluation did not meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateViolation {
    /// More `FAIL` diagnostics than allowed.
    TooManyFailures {
        /// Observed `FAIL` count.
        failed: usize,
        /// Configured limit.
        max_fail: usize,
    },
    /// More `WARN` diagnostics than allowed.
    TooManyWarnings {
        /// Observed `WARN` count.
        warned: usize,
        /// Configured limit.
        max_warn: usize,
    },
    /// Quality score under the configured floor.
    ScoreBelowMinimum {
        /// Observed score.
        quality_score: u32,
        /// Configured floor.
        min_quality_score: u32,
    },
}

impl fmt::Display for GateViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyFailures { failed, max_fail } => {
                write!(f, "{failed} FAIL diagnostic(s) exceed max_fail {max_fail}")
            }
            Self::TooManyWarnings { warned, max_warn } => {
                write!(f, "{warned} WARN diagnostic(s) exceed max_warn {max_warn}")
            }
            Self::ScoreBelowMinimum {
                quality_score,
                min_quality_score,
            } => write!(
                f,
                "quality score {quality_score} is below min_quality_score {min_quality_score}"
            ),
        }
    }
}

impl QualityGate {
    /// Rejects a `min_quality_score` above 100.
    pub fn validate(self) -> SsotResult<Self> {
        if let Some(min) = self.min_quality_score {
            if min > 100 {
                return Err(SsotError::invalid_config(
                    "min_quality_score",
                    format!("must be within 0..=100 (got {min})"),
                ));
            }
        }
        Ok(self)
    }

    /// Every threshold `evaluation` violates, in field order.
    #[must_use]
    pub fn violations(&self, evaluation: &CriteriaEvaluation) -> Vec<GateViolation> {
        let mut out = Vec::new();
        if let Some(max_fail) = self.max_fail.filter(|m| evaluation.failed > *m) {
            out.push(GateViolation::TooManyFailures {
                failed: evaluation.failed,
                max_fail,
            });
        }
        if let Some(max_warn) = self.max_warn.filter(|m| evaluation.warned > *m) {
            out.push(GateViolation::TooManyWarnings {
                warned: evaluation.warned,
                max_warn,
            });
        }
        if let Some(min) = self
            .min_quality_score
            .filter(|m| evaluation.quality_score < *m)
        {
            out.push(GateViolation::ScoreBelowMinimum {
                quality_score: evaluation.quality_score,
                min_quality_score: min,
            });
        }
        out
    }

    /// True when every configured threshold holds.
    #[must_use]
    pub fn check(&self, evaluation: &CriteriaEvaluation) -> bool {
        self.violations(evaluation).is_empty()
    }
}

/// Passes when no gate is configured.
#[must_use]
pub fn check_quality_gate(evaluation: &CriteriaEvaluation, gate: Option<&QualityGate>) -> bool {
    gate.map_or(true, |g| g.check(evaluation))
}
