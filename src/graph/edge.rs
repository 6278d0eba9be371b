//! Edge types for the SSoT graph.
//!
//! Edges carry no synthetic id; their identity is the ordered triple
//! `(from, kind, to)`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::intent::IntentId;
use crate::value::Map;

use super::NodeId;

/// Who created an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOrigin {
    /// Entered by a person.
    User,
    /// Proposed by an assistant.
    Ai,
    /// Inferred from other edges.
    Derived,
}

/// Provenance recorded on every edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeMetadata {
    /// When the edge was created.
    pub created_at: DateTime<Utc>,
    /// Who created the edge.
    pub created_by: EdgeOrigin,
    /// Creator confidence in `[0, 1]`, when supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// The intent that created the edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originating_intent_id: Option<IntentId>,
    /// Set when the edge was inferred rather than stated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_derived: Option<bool>,
}

/// A directed, typed relation between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node.
    pub from: NodeId,
    /// Edge kind; one of the schema's edge kinds.
    pub kind: String,
    /// Target node.
    pub to: NodeId,
    /// Optional attribute bag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map>,
    /// Provenance.
    pub metadata: EdgeMetadata,
}

impl Edge {
    /// Creates a user edge stamped now.
    #[must_use]
    pub fn new(from: NodeId, kind: impl Into<String>, to: NodeId) -> Self {
        Self {
            from,
            kind: kind.into(),
            to,
            attrs: None,
            metadata: EdgeMetadata {
                created_at: Utc::now(),
                created_by: EdgeOrigin::User,
                confidence: None,
                originating_intent_id: None,
                is_derived: None,
            },
        }
    }

    /// Returns the identity triple of this edge.
    #[must_use]
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            from: self.from.clone(),
            kind: self.kind.clone(),
            to: self.to.clone(),
        }
    }

    /// True when either endpoint is `id`.
    #[must_use]
    pub fn touches(&self, id: &NodeId) -> bool {
        &self.from == id || &self.to == id
    }
}

/// Identity of an edge: the ordered triple `(from, kind, to)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    /// Source node.
    pub from: NodeId,
    /// Edge kind.
    pub kind: String,
    /// Target node.
    pub to: NodeId,
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.from, self.kind, self.to)
    }
}
