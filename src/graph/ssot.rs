//! The SSoT document: metadata, nodes, edges and derived indexes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Edge, EdgeKey, GraphIndexes, Node, NodeId};

/// How humans and AI share authorship of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationMode {
    /// The assistant acts on its own.
    Autonomous,
    /// The assistant proposes and a person confirms.
    #[default]
    Copilot,
    /// Only people edit the graph.
    Manual,
}

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsotMeta {
    /// Document format version.
    pub version: String,
    /// Requirements profile the document follows.
    pub profile_version: String,
    /// Time of the last committed change.
    pub last_updated: DateTime<Utc>,
    /// Time the document was created.
    pub created_at: DateTime<Utc>,
    /// Current collaboration mode.
    #[serde(default)]
    pub collaboration_mode: CollaborationMode,
    /// Free-form project description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The single source of truth.
///
/// Nodes and edges are kept in insertion order. `indexes` is a derived
/// projection and is only trustworthy right after [`Ssot::rebuild_indexes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ssot {
    /// Document metadata.
    pub meta: SsotMeta,
    /// Nodes in insertion order.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Edges in insertion order.
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Derived adjacency, see [`Ssot::rebuild_indexes`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<GraphIndexes>,
}

/// The fields covered by [`Ssot::fingerprint`].
#[derive(Serialize)]
struct FingerprintView<'a> {
    meta: &'a SsotMeta,
    nodes: &'a [Node],
    edges: &'a [Edge],
}

impl Ssot {
    /// Current document format version.
    pub const CURRENT_VERSION: &'static str = "1.0";

    /// Creates an empty graph.
    #[must_use]
    pub fn new(profile_version: impl Into<String>, collaboration_mode: CollaborationMode) -> Self {
        let now = Utc::now();
        Self {
            meta: SsotMeta {
                version: Self::CURRENT_VERSION.to_string(),
                profile_version: profile_version.into(),
                last_updated: now,
                created_at: now,
                collaboration_mode,
                description: None,
            },
            nodes: Vec::new(),
            edges: Vec::new(),
            indexes: None,
        }
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Looks up a node by id for mutation.
    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| &n.id == id)
    }

    /// Whether a node with `id` exists.
    #[must_use]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Edges with `id` as source or target, in edge order.
    pub fn edges_touching<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.touches(id))
    }

    /// Nodes of the given kind, in node order.
    pub fn nodes_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    /// Recomputes every index from the current nodes and edges.
    pub fn rebuild_indexes(&mut self) {
        self.indexes = Some(GraphIndexes::build(&self.nodes, &self.edges));
    }

    /// Edge triples that occur more than once, with their multiplicity.
    ///
    /// Duplicates are permitted in the store; this only reports them.
    #[must_use]
    pub fn duplicate_edges(&self) -> Vec<(EdgeKey, usize)> {
        let mut counts: BTreeMap<EdgeKey, usize> = BTreeMap::new();
        for edge in &self.edges {
            *counts.entry(edge.key()).or_default() += 1;
        }
        counts.into_iter().filter(|(_, n)| *n > 1).collect()
    }

    /// Stable content hash of meta, nodes and edges (indexes excluded).
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let view = FingerprintView {
            meta: &self.meta,
            nodes: &self.nodes,
            edges: &self.edges,
        };
        // Serializing plain data structures into a Vec cannot fail.
        let bytes = serde_json::to_vec(&view).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}
