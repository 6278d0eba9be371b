//! Structured outcome of executing an intent.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, SsotError, ValidationError};
use crate::graph::Ssot;
use crate::value::Value;

use super::IntentId;

/// One reported error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentError {
    /// Wire error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Offending parameter, when one is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<&ValidationError> for IntentError {
    fn from(err: &ValidationError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            field: err.field().map(str::to_string),
        }
    }
}

impl From<&SsotError> for IntentError {
    fn from(err: &SsotError) -> Self {
        match err {
            SsotError::Validation(v) => Self::from(v),
            other => Self {
                code: other.code(),
                message: other.to_string(),
                field: None,
            },
        }
    }
}

/// Kind of change a handler performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// A node was created.
    NodeAdded,
    /// A node's attributes were replaced.
    NodeUpdated,
    /// A node was removed.
    NodeDeleted,
    /// An edge was created.
    EdgeAdded,
    /// An edge was removed.
    EdgeDeleted,
}

/// A change record emitted by a mutation handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    /// What happened.
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    /// Node id, or edge key rendered as `from -[kind]-> to`.
    pub target: String,
    /// Handler-specific payload, such as the created node.
    #[serde(default)]
    pub details: Value,
}

impl Change {
    /// Creates a change record.
    #[must_use]
    pub fn new(change_type: ChangeType, target: impl Into<String>, details: Value) -> Self {
        Self {
            change_type,
            target: target.into(),
            details,
        }
    }
}

/// Pre-mutation state returned when execution failed and was undone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollback {
    /// The graph as it was before the intent ran.
    pub original_state_snapshot: Ssot,
}

/// Result of [`IntentEngine::execute`](crate::engine::IntentEngine::execute).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    /// True when the intent committed.
    pub success: bool,
    /// Id of the executed intent.
    pub intent_id: IntentId,
    /// Changes, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Vec<Change>>,
    /// Errors, on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<IntentError>>,
    /// Pre-mutation state, when execution was rolled back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<Rollback>,
}

impl IntentResult {
    pub(crate) fn applied(intent_id: IntentId, changes: Vec<Change>) -> Self {
        Self {
            success: true,
            intent_id,
            changes: Some(changes),
            errors: None,
            rollback: None,
        }
    }

    pub(crate) fn rejected(intent_id: IntentId, errors: &[ValidationError]) -> Self {
        Self {
            success: false,
            intent_id,
            changes: None,
            errors: Some(errors.iter().map(IntentError::from).collect()),
            rollback: None,
        }
    }

    pub(crate) fn rolled_back(intent_id: IntentId, error: &SsotError, snapshot: Ssot) -> Self {
        Self {
            success: false,
            intent_id,
            changes: None,
            errors: Some(vec![IntentError::from(error)]),
            rollback: Some(Rollback {
                original_state_snapshot: snapshot,
            }),
        }
    }

    /// Error codes reported, in order.
    #[must_use]
    pub fn error_codes(&self) -> Vec<ErrorCode> {
        self.errors
            .iter()
            .flatten()
            .map(|e| e.code)
            .collect()
    }

    /// Change records, or an empty slice on failure.
    #[must_use]
    pub fn changes(&self) -> &[Change] {
        self.changes.as_deref().unwrap_or_default()
    }
}
