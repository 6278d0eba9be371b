//! Pre-mutation validation of intents against the catalog and schema.
//!
//! Validation never touches the graph. It accumulates every applicable error
//! instead of stopping at the first one.

use crate::error::ValidationError;
use crate::graph::{NodeId, Ssot};
use crate::schema::EffectiveSchema;

use super::{Intent, IntentCatalog, ParamType};

/// Validates `intent` and returns every error found (empty when valid).
#[must_use]
pub fn validate_intent(
    intent: &Intent,
    catalog: &IntentCatalog,
    schema: &EffectiveSchema,
    graph: &Ssot,
) -> Vec<ValidationError> {
    let Some(definition) = catalog.get(intent.intent_type.as_str()) else {
        return vec![ValidationError::UnknownIntent {
            intent_type: intent.intent_type.as_str().to_string(),
        }];
    };

    let mut errors = Vec::new();
    for decl in &definition.params {
        let value = intent.params.get(&decl.name).filter(|v| !v.is_null());
        let Some(value) = value else {
            if decl.required {
                errors.push(ValidationError::MissingParameter {
                    field: decl.name.clone(),
                });
            }
            continue;
        };

        match decl.param_type {
            ParamType::NodeRef => {
                let exists = value
                    .as_str()
                    .is_some_and(|id| graph.contains_node(&NodeId::from(id)));
                if !exists {
                    errors.push(ValidationError::InvalidNodeRef {
                        field: decl.name.clone(),
                        node_id: value.to_plain_string(),
                    });
                }
            }
            ParamType::NodeKind => {
                if !value.as_str().is_some_and(|k| schema.has_node_kind(k)) {
                    errors.push(ValidationError::InvalidNodeKind {
                        field: decl.name.clone(),
                        kind: value.to_plain_string(),
                    });
                }
            }
            ParamType::EdgeKind => {
                if !value.as_str().is_some_and(|k| schema.has_edge_kind(k)) {
                    errors.push(ValidationError::InvalidEdgeKind {
                        field: decl.name.clone(),
                        kind: value.to_plain_string(),
                    });
                }
            }
            _ => {}
        }
    }
    errors
}
