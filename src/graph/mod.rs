//! In-memory graph store for the SSoT.
//!
//! This module groups node and edge types, the SSoT document, and the
//! derived indexes.

mod edge;
mod index;
mod node;
mod ssot;

pub use edge::{Edge, EdgeKey, EdgeMetadata, EdgeOrigin};
pub use index::GraphIndexes;
pub use node::{Node, NodeId, NodeMetadata, NodeOrigin};
pub use ssot::{CollaborationMode, Ssot, SsotMeta};
