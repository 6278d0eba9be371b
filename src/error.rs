//! Error types for the SSoT engine.
//!
//! All errors are strongly typed using thiserror. Validation and execution
//! errors additionally map onto the wire-level [`ErrorCode`] reported in
//! [`IntentError`](crate::intent::IntentError).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::NodeId;
use crate::patch::PatchError;
use crate::storage::StorageError;

/// Wire-level error codes reported by intent execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The intent type is not in the catalog.
    UnknownIntent,
    /// A required parameter is absent.
    MissingParameter,
    /// A node reference does not resolve.
    InvalidNodeRef,
    /// A node kind is not in the schema.
    InvalidNodeKind,
    /// An edge kind is not in the schema.
    InvalidEdgeKind,
    /// Execution or persistence failed and the intent was rolled back.
    ExecutionFailed,
}

impl ErrorCode {
    /// Returns the wire representation of this code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownIntent => "UNKNOWN_INTENT",
            Self::MissingParameter => "MISSING_PARAMETER",
            Self::InvalidNodeRef => "INVALID_NODE_REF",
            Self::InvalidNodeKind => "INVALID_NODE_KIND",
            Self::InvalidEdgeKind => "INVALID_EDGE_KIND",
            Self::ExecutionFailed => "EXECUTION_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors raised before any mutation is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The intent type is not in the catalog.
    #[error("Unknown intent type '{intent_type}'")]
    UnknownIntent {
        /// The submitted type tag.
        intent_type: String,
    },

    /// A required parameter is absent.
    #[error("Required parameter '{field}' is missing")]
    MissingParameter {
        /// Parameter name.
        field: String,
    },

    /// A node-reference parameter names no existing node.
    #[error("Parameter '{field}' references unknown node '{node_id}'")]
    InvalidNodeRef {
        /// Parameter name.
        field: String,
        /// The unresolved id.
        node_id: String,
    },

    /// A node-kind parameter is not in the schema.
    #[error("Parameter '{field}' has node kind '{kind}' which is not in the schema")]
    InvalidNodeKind {
        /// Parameter name.
        field: String,
        /// The rejected kind.
        kind: String,
    },

    /// An edge-kind parameter is not in the schema.
    #[error("Parameter '{field}' has edge kind '{kind}' which is not in the schema")]
    InvalidEdgeKind {
        /// Parameter name.
        field: String,
        /// The rejected kind.
        kind: String,
    },

    /// Two criteria rules share an id.
    #[error("Duplicate criteria rule id '{rule_id}'")]
    DuplicateRuleId {
        /// The repeated id.
        rule_id: String,
    },
}

impl ValidationError {
    /// Returns the wire code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownIntent { .. } => ErrorCode::UnknownIntent,
            Self::MissingParameter { .. } => ErrorCode::MissingParameter,
            Self::InvalidNodeRef { .. } => ErrorCode::InvalidNodeRef,
            Self::InvalidNodeKind { .. } => ErrorCode::InvalidNodeKind,
            Self::InvalidEdgeKind { .. } => ErrorCode::InvalidEdgeKind,
            Self::DuplicateRuleId { .. } => ErrorCode::ExecutionFailed,
        }
    }

    /// Returns the offending parameter name, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingParameter { field }
            | Self::InvalidNodeRef { field, .. }
            | Self::InvalidNodeKind { field, .. }
            | Self::InvalidEdgeKind { field, .. } => Some(field),
            Self::UnknownIntent { .. } | Self::DuplicateRuleId { .. } => None,
        }
    }
}

/// Errors raised by mutation handlers. Any of these triggers a rollback.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A referenced node disappeared during execution.
    #[error("Node not found: {id}")]
    NodeNotFound {
        /// The missing node.
        id: NodeId,
    },

    /// A node kind used by a handler is not in the schema.
    #[error("Node kind '{kind}' is not defined in the schema")]
    UndefinedNodeKind {
        /// The missing kind.
        kind: String,
    },

    /// An edge kind has no endpoint definition.
    #[error("Edge kind '{kind}' has no definition in the schema")]
    UndefinedEdgeKind {
        /// The undefined kind.
        kind: String,
    },

    /// An edge endpoint has a kind the definition does not allow.
    #[error(
        "Edge '{edge_kind}' cannot have a {endpoint} of kind '{node_kind}' (allowed: {allowed})"
    )]
    EndpointKindMismatch {
        /// Edge kind being created.
        edge_kind: String,
        /// `"source"` or `"target"`.
        endpoint: &'static str,
        /// Kind of the offending node.
        node_kind: String,
        /// Allowed kinds, comma separated.
        allowed: String,
    },

    /// A node has a different kind than the handler requires.
    #[error("Node {id} has kind '{actual}', expected '{expected}'")]
    UnexpectedNodeKind {
        /// The node.
        id: NodeId,
        /// Required kind.
        expected: String,
        /// Actual kind.
        actual: String,
    },

    /// A node with edges was deleted without `cascade`.
    #[error(
        "Node {node_id} has {edge_count} connected edge(s); set 'cascade' to delete them with the node"
    )]
    CascadeRequired {
        /// The node.
        node_id: NodeId,
        /// Number of connected edges.
        edge_count: usize,
    },

    /// A parameter is present but malformed.
    #[error("Invalid parameter '{field}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An attribute patch failed.
    #[error("Patch rejected: {0}")]
    Patch(#[from] PatchError),

    /// The intent type is declared but has no handler.
    #[error("Intent type '{intent_type}' is not implemented")]
    NotImplemented {
        /// The intent type tag.
        intent_type: String,
    },
}

impl ExecutionError {
    pub(crate) fn invalid_param(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while evaluating a single criteria rule.
///
/// These never escape [`CriteriaEngine::evaluate`](crate::criteria::CriteriaEngine::evaluate);
/// the offending rule is logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// A `matches` pattern does not compile.
    #[error("Invalid regex '{pattern}': {reason}")]
    InvalidRegex {
        /// The pattern.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    /// A condition lacks a field it needs.
    #[error("Condition '{condition}' requires field '{field}'")]
    MissingConditionField {
        /// Condition type tag.
        condition: String,
        /// Missing field name.
        field: String,
    },

    /// The operator tag is not recognized.
    #[error("Unrecognized operator '{operator}'")]
    UnknownOperator {
        /// The operator tag.
        operator: String,
    },

    /// The expected operand has the wrong type for the operator.
    #[error("Operator '{operator}' requires {expected}, got {actual}")]
    OperandMismatch {
        /// The operator tag.
        operator: String,
        /// Required operand type.
        expected: &'static str,
        /// Supplied operand type.
        actual: &'static str,
    },

    /// The condition cannot be applied to the rule's target type.
    #[error("Condition '{condition}' cannot apply to {target} targets")]
    UnsupportedTarget {
        /// Condition type tag.
        condition: String,
        /// Target type tag.
        target: String,
    },
}

/// Top-level error type for the crate.
#[derive(Debug, Error)]
pub enum SsotError {
    /// Intent validation failed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A handler failed.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// A store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A criteria rule could not be evaluated.
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    /// A configuration value is out of range.
    #[error("Invalid configuration '{field}': {reason}")]
    InvalidConfig {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Caller-supplied JSON did not parse into the requested type.
    #[error("Malformed document: {message}")]
    Document {
        /// Parser message, with line and column.
        message: String,
    },

    /// A bug or unexpected condition inside the crate.
    #[error("Internal error: {message}")]
    Internal {
        /// Description.
        message: String,
    },
}

impl SsotError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub(crate) fn document(message: impl Into<String>) -> Self {
        Self::Document {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True for validation failures.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// True for handler failures.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// True for store failures.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// True for internal errors.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// True for malformed input documents.
    #[must_use]
    pub const fn is_document(&self) -> bool {
        matches!(self, Self::Document { .. })
    }

    /// Returns the wire code used when this error is reported for an intent.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(e) => e.code(),
            _ => ErrorCode::ExecutionFailed,
        }
    }
}

impl From<PatchError> for SsotError {
    fn from(err: PatchError) -> Self {
        Self::Execution(ExecutionError::Patch(err))
    }
}

/// Result type alias for SSoT operations.
pub type SsotResult<T> = Result<T, SsotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_codes_and_fields() {
        let err = ValidationError::MissingParameter {
            field: "kind".to_string(),
        };
        assert_eq!(err.code(), ErrorCode::MissingParameter);
        assert_eq!(err.field(), Some("kind"));
        assert!(format!("{err}").contains("'kind'"));

        let err = ValidationError::UnknownIntent {
            intent_type: "Frobnicate".to_string(),
        };
        assert_eq!(err.code(), ErrorCode::UnknownIntent);
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_error_code_wire_format() {
        let json = serde_json::to_string(&ErrorCode::InvalidNodeRef).unwrap();
        assert_eq!(json, "\"INVALID_NODE_REF\"");
        assert_eq!(ErrorCode::ExecutionFailed.to_string(), "EXECUTION_FAILED");
    }

    #[test]
    fn test_cascade_message_carries_count() {
        let err = ExecutionError::CascadeRequired {
            node_id: NodeId::from("N-1"),
            edge_count: 2,
        };
        let msg = format!("{err}");
        assert!(msg.contains("N-1"));
        assert!(msg.contains("2 connected edge"));
    }

    #[test]
    fn test_ssot_error_classification() {
        let err: SsotError = ValidationError::MissingParameter {
            field: "x".to_string(),
        }
        .into();
        assert!(err.is_validation());
        assert_eq!(err.code(), ErrorCode::MissingParameter);

        let err: SsotError = ExecutionError::NotImplemented {
            intent_type: "ToggleEdge".to_string(),
        }
        .into();
        assert!(err.is_execution());
        assert_eq!(err.code(), ErrorCode::ExecutionFailed);

        let err = SsotError::internal("unexpected state");
        assert!(err.is_internal());
        assert!(format!("{err}").contains("unexpected state"));
    }
}
