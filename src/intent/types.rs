//! Intent definitions: the request envelope submitted to the engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::graph::{CollaborationMode, EdgeOrigin, NodeOrigin};
use crate::value::Map;

/// Globally unique intent identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentId(String);

impl IntentId {
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

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IntentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for IntentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The fixed catalog of intent types.
///
/// Unknown tags are preserved in [`IntentType::Other`] so they can be
/// reported as `UNKNOWN_INTENT` instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IntentType {
    /// Create a node of any schema kind.
    AddNode,
    /// Create an edge between existing nodes.
    AddEdge,
    /// Patch a node's attributes.
    UpdateNodeAttrs,
    /// Remove a node, optionally with its edges.
    DeleteNode,
    /// Create a `Need` node.
    AddNeed,
    /// Create a `Requirement` refining a `Need`.
    AddRequirementRefinement,
    /// Declared; not executable yet.
    ToggleEdge,
    /// Declared; not executable yet.
    DeleteEdge,
    /// Declared; not executable yet.
    AddValidationQuestion,
    /// Declared; not executable yet.
    AnswerValidationQuestion,
    /// Declared; not executable yet.
    AddEvidence,
    /// Declared; not executable yet.
    ProposeAgreement,
    /// Declared; not executable yet.
    AcceptAgreement,
    /// Declared; not executable yet.
    ExtractRequirements,
    /// Unknown tag, kept verbatim.
    Other(String),
}

impl IntentType {
    /// Every named intent type, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::AddNode,
        Self::AddEdge,
        Self::UpdateNodeAttrs,
        Self::DeleteNode,
        Self::AddNeed,
        Self::AddRequirementRefinement,
        Self::ToggleEdge,
        Self::DeleteEdge,
        Self::AddValidationQuestion,
        Self::AnswerValidationQuestion,
        Self::AddEvidence,
        Self::ProposeAgreement,
        Self::AcceptAgreement,
        Self::ExtractRequirements,
    ];

    /// Wire tag of the intent type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AddNode => "AddNode",
            Self::AddEdge => "AddEdge",
            Self::UpdateNodeAttrs => "UpdateNodeAttrs",
            Self::DeleteNode => "DeleteNode",
            Self::AddNeed => "AddNeed",
            Self::AddRequirementRefinement => "AddRequirementRefinement",
            Self::ToggleEdge => "ToggleEdge",
            Self::DeleteEdge => "DeleteEdge",
            Self::AddValidationQuestion => "AddValidationQuestion",
            Self::AnswerValidationQuestion => "AnswerValidationQuestion",
            Self::AddEvidence => "AddEvidence",
            Self::ProposeAgreement => "ProposeAgreement",
            Self::AcceptAgreement => "AcceptAgreement",
            Self::ExtractRequirements => "ExtractRequirements",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for IntentType {
    fn from(s: String) -> Self {
        Self::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .cloned()
            .unwrap_or(Self::Other(s))
    }
}

impl From<&str> for IntentType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<IntentType> for String {
    fn from(t: IntentType) -> Self {
        match t {
            IntentType::Other(s) => s,
            named => named.as_str().to_string(),
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an intent came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    /// A person.
    #[default]
    User,
    /// An assistant.
    Ai,
    /// An external import.
    Import,
}

impl IntentSource {
    /// Provenance stamped on nodes created by this intent.
    #[must_use]
    pub const fn node_origin(self) -> NodeOrigin {
        match self {
            Self::User => NodeOrigin::User,
            Self::Ai => NodeOrigin::Ai,
            Self::Import => NodeOrigin::Import,
        }
    }

    /// Provenance stamped on edges created by this intent.
    ///
    /// Edges have no `import` origin; imported edges are attributed to the user.
    #[must_use]
    pub const fn edge_origin(self) -> EdgeOrigin {
        match self {
            Self::User | Self::Import => EdgeOrigin::User,
            Self::Ai => EdgeOrigin::Ai,
        }
    }
}

/// Caller-supplied intent metadata. `intent_id` and `timestamp` are filled
/// in by the engine when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentMetadata {
    /// Caller-chosen id; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<IntentId>,
    /// Caller-chosen timestamp; the execution time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Acting user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Origin of the request.
    #[serde(default)]
    pub source: IntentSource,
    /// Collaboration mode at the time of the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaboration_mode: Option<CollaborationMode>,
}

/// Metadata after the engine assigned id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMetadata {
    /// Intent id.
    pub intent_id: IntentId,
    /// Intent timestamp.
    pub timestamp: DateTime<Utc>,
    /// Acting user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Origin of the request.
    pub source: IntentSource,
    /// Collaboration mode at the time of the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaboration_mode: Option<CollaborationMode>,
}

impl IntentMetadata {
    /// Fills missing id and timestamp.
    #[must_use]
    pub fn resolve(self, now: DateTime<Utc>) -> ResolvedMetadata {
        ResolvedMetadata {
            intent_id: self.intent_id.unwrap_or_else(IntentId::generate),
            timestamp: self.timestamp.unwrap_or(now),
            user: self.user,
            source: self.source,
            collaboration_mode: self.collaboration_mode,
        }
    }
}

/// A named, parameterized request to change the SSoT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Intent type tag.
    #[serde(rename = "type")]
    pub intent_type: IntentType,
    /// Named parameters.
    #[serde(default)]
    pub params: Map,
    /// Optional caller metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<IntentMetadata>,
}

impl Intent {
    /// Creates an intent without metadata.
    #[must_use]
    pub fn new(intent_type: impl Into<IntentType>, params: Map) -> Self {
        Self {
            intent_type: intent_type.into(),
            params,
            metadata: None,
        }
    }

    /// Attaches caller metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: IntentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
