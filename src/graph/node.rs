//! Node types for the SSoT graph.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::intent::IntentId;
use crate::value::Map;

/// Opaque, unique node identifier.
///
/// Identifiers loaded from documents are kept verbatim; identifiers minted by
/// the engine are random UUIDs.
///
/// # Examples
///
/// ```
/// use ssot::NodeId;
///
/// let a = NodeId::generate();
/// let b = NodeId::generate();
/// assert_ne!(a, b);
/// assert_eq!(NodeId::from("N-1").as_str(), "N-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Mints a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Who created a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOrigin {
    /// Entered by a person.
    User,
    /// Proposed by an assistant.
    Ai,
    /// Brought in from an external source.
    Import,
}

/// Provenance recorded on every node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// Who created the node.
    pub created_by: NodeOrigin,
    /// Creator confidence in `[0, 1]`, when supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// The intent that created the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originating_intent_id: Option<IntentId>,
}

/// A node in the SSoT graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier.
    pub id: NodeId,
    /// Node kind; one of the schema's node kinds.
    pub kind: String,
    /// Open attribute bag.
    #[serde(default)]
    pub attrs: Map,
    /// Provenance.
    pub metadata: NodeMetadata,
}

impl Node {
    /// Creates a node with a fresh id, created by a user now.
    #[must_use]
    pub fn new(kind: impl Into<String>, attrs: Map) -> Self {
        Self {
            id: NodeId::generate(),
            kind: kind.into(),
            attrs,
            metadata: NodeMetadata {
                created_at: Utc::now(),
                created_by: NodeOrigin::User,
                confidence: None,
                originating_intent_id: None,
            },
        }
    }

    /// Replaces the generated id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = id.into();
        self
    }
}
