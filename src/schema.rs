//! The effective schema: allowed node kinds, edge kinds and edge endpoint
//! constraints.
//!
//! The schema is compiled elsewhere and handed to the engine already parsed.
//! It is immutable for the lifetime of the process.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;

/// Endpoint constraints for one edge kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDefinition {
    /// Allowed source node kinds.
    pub from: BTreeSet<String>,
    /// Allowed target node kinds.
    pub to: BTreeSet<String>,
    /// Free-form cardinality note, e.g. `1..*`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<String>,
    /// Free-form description of what the edge means.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantics: Option<String>,
}

impl EdgeDefinition {
    /// Creates a definition with the given endpoint kinds.
    #[must_use]
    pub fn new<I, J, S, T>(from: I, to: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            from: from.into_iter().map(Into::into).collect(),
            to: to.into_iter().map(Into::into).collect(),
            cardinality: None,
            semantics: None,
        }
    }
}

/// Compiled schema consulted by intent validation and edge creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveSchema {
    /// Node kinds that may be created.
    pub node_kinds: BTreeSet<String>,
    /// Edge kinds that may be created.
    pub edge_kinds: BTreeSet<String>,
    /// Endpoint constraints keyed by edge kind.
    #[serde(default)]
    pub edge_definitions: BTreeMap<String, EdgeDefinition>,
}

impl EffectiveSchema {
    /// Creates a schema without edge definitions.
    #[must_use]
    pub fn new<I, J, S, T>(node_kinds: I, edge_kinds: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            node_kinds: node_kinds.into_iter().map(Into::into).collect(),
            edge_kinds: edge_kinds.into_iter().map(Into::into).collect(),
            edge_definitions: BTreeMap::new(),
        }
    }

    /// Adds an edge definition; the edge kind is registered too.
    #[must_use]
    pub fn with_edge(mut self, kind: impl Into<String>, definition: EdgeDefinition) -> Self {
        let kind = kind.into();
        self.edge_kinds.insert(kind.clone());
        self.edge_definitions.insert(kind, definition);
        self
    }

    /// Whether `kind` is a known node kind.
    #[must_use]
    pub fn has_node_kind(&self, kind: &str) -> bool {
        self.node_kinds.contains(kind)
    }

    /// Whether `kind` is a known edge kind.
    #[must_use]
    pub fn has_edge_kind(&self, kind: &str) -> bool {
        self.edge_kinds.contains(kind)
    }

    /// The endpoint constraints for `kind`, if defined.
    #[must_use]
    pub fn edge_definition(&self, kind: &str) -> Option<&EdgeDefinition> {
        self.edge_definitions.get(kind)
    }

    /// Checks that an edge of `edge_kind` may connect the given node kinds.
    ///
    /// # Errors
    ///
    /// `UndefinedEdgeKind` when the kind has no definition, and
    /// `EndpointKindMismatch` naming the offending endpoint otherwise.
    pub fn check_endpoints(
        &self,
        edge_kind: &str,
        source_kind: &str,
        target_kind: &str,
    ) -> Result<(), ExecutionError> {
        let def = self
            .edge_definition(edge_kind)
            .ok_or_else(|| ExecutionError::UndefinedEdgeKind {
                kind: edge_kind.to_string(),
            })?;
        let mismatch = |endpoint, node_kind: &str, allowed: &BTreeSet<String>| {
            ExecutionError::EndpointKindMismatch {
                edge_kind: edge_kind.to_string(),
                endpoint,
                node_kind: node_kind.to_string(),
                allowed: allowed.iter().cloned().collect::<Vec<_>>().join(", "),
            }
        };
        if !def.from.contains(source_kind) {
            return Err(mismatch("source", source_kind, &def.from));
        }
        if !def.to.contains(target_kind) {
            return Err(mismatch("target", target_kind, &def.to));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> EffectiveSchema {
        EffectiveSchema::new(["Need", "Requirement", "Stakeholder"], ["relatesTo"])
            .with_edge("refinesTo", EdgeDefinition::new(["Need"], ["Requirement"]))
    }

    #[test]
    fn with_edge_registers_kind() {
        let s = schema();
        assert!(s.has_edge_kind("refinesTo"));
        assert!(s.has_edge_kind("relatesTo"));
        assert!(s.edge_definition("relatesTo").is_none());
    }

    #[test]
    fn endpoint_checks() {
        let s = schema();
        assert!(s.check_endpoints("refinesTo", "Need", "Requirement").is_ok());

        let err = s.check_endpoints("refinesTo", "Stakeholder", "Requirement").unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::EndpointKindMismatch { endpoint: "source", .. }
        ));
        assert!(format!("{err}").contains("Stakeholder"));

        let err = s.check_endpoints("refinesTo", "Need", "Need").unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::EndpointKindMismatch { endpoint: "target", .. }
        ));

        let err = s.check_endpoints("relatesTo", "Need", "Need").unwrap_err();
        assert!(matches!(err, ExecutionError::UndefinedEdgeKind { .. }));
    }

    #[test]
    fn deserializes_from_document() {
        let s: EffectiveSchema = serde_json::from_str(
            r#"{
                "node_kinds": ["Need", "Requirement"],
                "edge_kinds": ["refinesTo"],
                "edge_definitions": {
                    "refinesTo": {"from": ["Need"], "to": ["Requirement"], "cardinality": "1..*"}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(
            s.edge_definition("refinesTo").and_then(|d| d.cardinality.as_deref()),
            Some("1..*")
        );
    }
}
