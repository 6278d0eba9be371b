//! Derived lookup indexes over nodes and edges.
//!
//! Indexes are a pure projection of the node and edge sequences. They are
//! always rebuilt from scratch, never patched incrementally.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Edge, Node, NodeId};

/// Kind and adjacency indexes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphIndexes {
    /// Node ids per kind, in node order.
    pub by_kind: BTreeMap<String, Vec<NodeId>>,
    /// Edges per source node, in edge order.
    pub outgoing_edges: BTreeMap<NodeId, Vec<Edge>>,
    /// Edges per target node, in edge order.
    pub incoming_edges: BTreeMap<NodeId, Vec<Edge>>,
}

impl GraphIndexes {
    /// Builds all indexes from the given nodes and edges.
    #[must_use]
    pub fn build(nodes: &[Node], edges: &[Edge]) -> Self {
        let mut idx = Self::default();
        for node in nodes {
            idx.by_kind
                .entry(node.kind.clone())
                .or_default()
                .push(node.id.clone());
        }
        for edge in edges {
            idx.outgoing_edges
                .entry(edge.from.clone())
                .or_default()
                .push(edge.clone());
            idx.incoming_edges
                .entry(edge.to.clone())
                .or_default()
                .push(edge.clone());
        }
        idx
    }

    /// Node ids of the given kind.
    #[must_use]
    pub fn nodes_of_kind(&self, kind: &str) -> &[NodeId] {
        self.by_kind.get(kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Outgoing edges of `id`, optionally restricted to one edge kind.
    pub fn outgoing<'a>(
        &'a self,
        id: &NodeId,
        kind: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        self.outgoing_edges
            .get(id)
            .into_iter()
            .flatten()
            .filter(move |e| kind.map_or(true, |k| e.kind == k))
    }

    /// Incoming edges of `id`.
    pub fn incoming<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.incoming_edges.get(id).into_iter().flatten()
    }
}
