//! Intent catalog: declared parameters per intent type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::IntentType;

/// Type tag of a declared parameter.
///
/// Only the reference and kind tags drive validation; the others are
/// descriptive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// Id of an existing node.
    NodeRef,
    /// A node kind from the schema.
    NodeKind,
    /// An edge kind from the schema.
    EdgeKind,
    /// A string.
    String,
    /// A number.
    Number,
    /// A boolean.
    Boolean,
    /// A mapping.
    Object,
    /// A list.
    Array,
    /// A JSON Patch document.
    Patch,
    /// Anything; also the fallback for unknown tags.
    #[serde(other)]
    Any,
}

/// One declared parameter of an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Whether validation reports the parameter as missing.
    #[serde(default)]
    pub required: bool,
}

impl ParamDecl {
    /// A required parameter.
    #[must_use]
    pub fn required(name: &str, param_type: ParamType) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: true,
        }
    }

    /// An optional parameter.
    #[must_use]
    pub fn optional(name: &str, param_type: ParamType) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: false,
        }
    }
}

/// Declaration of a single intent type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentDefinition {
    /// Human description of the intent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared parameters.
    #[serde(default)]
    pub params: Vec<ParamDecl>,
}

/// The catalog of intents the engine accepts, keyed by type tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentCatalog {
    /// Definitions keyed by intent type tag.
    #[serde(default)]
    pub intents: BTreeMap<String, IntentDefinition>,
}

impl IntentCatalog {
    /// An empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares (or replaces) an intent type.
    #[must_use]
    pub fn with_intent(mut self, intent_type: &IntentType, params: Vec<ParamDecl>) -> Self {
        self.intents.insert(
            intent_type.as_str().to_string(),
            IntentDefinition {
                description: None,
                params,
            },
        );
        self
    }

    /// Definition of `intent_type`, if declared.
    #[must_use]
    pub fn get(&self, intent_type: &str) -> Option<&IntentDefinition> {
        self.intents.get(intent_type)
    }

    /// Whether `intent_type` is declared.
    #[must_use]
    pub fn contains(&self, intent_type: &str) -> bool {
        self.intents.contains_key(intent_type)
    }

    /// Declarations for every intent type in the type surface.
    #[must_use]
    pub fn standard() -> Self {
        use ParamType::{Array, Boolean, EdgeKind, NodeKind, NodeRef, Number, Object, Patch, String};

        let req = ParamDecl::required;
        let opt = ParamDecl::optional;
        Self::new()
            .with_intent(
                &IntentType::AddNode,
                vec![req("kind", NodeKind), opt("attrs", Object), opt("confidence", Number)],
            )
            .with_intent(
                &IntentType::AddEdge,
                vec![
                    req("from", NodeRef),
                    req("edge_kind", EdgeKind),
                    req("to", NodeRef),
                    opt("attrs", Object),
                    opt("confidence", Number),
                ],
            )
            .with_intent(
                &IntentType::UpdateNodeAttrs,
                vec![req("node_id", NodeRef), req("patch", Patch)],
            )
            .with_intent(
                &IntentType::DeleteNode,
                vec![req("node_id", NodeRef), opt("cascade", Boolean)],
            )
            .with_intent(
                &IntentType::AddNeed,
                vec![
                    req("statement", String),
                    opt("attrs", Object),
                    opt("expressed_by", NodeRef),
                    opt("confidence", Number),
                ],
            )
            .with_intent(
                &IntentType::AddRequirementRefinement,
                vec![
                    req("need_id", NodeRef),
                    req("statement", String),
                    opt("attrs", Object),
                    opt("confidence", Number),
                ],
            )
            .with_intent(
                &IntentType::ToggleEdge,
                vec![req("from", NodeRef), req("edge_kind", EdgeKind), req("to", NodeRef)],
            )
            .with_intent(
                &IntentType::DeleteEdge,
                vec![req("from", NodeRef), req("edge_kind", EdgeKind), req("to", NodeRef)],
            )
            .with_intent(
                &IntentType::AddValidationQuestion,
                vec![req("target_id", NodeRef), req("question", String)],
            )
            .with_intent(
                &IntentType::AnswerValidationQuestion,
                vec![req("question_id", NodeRef), req("answer", String)],
            )
            .with_intent(
                &IntentType::AddEvidence,
                vec![req("supports", NodeRef), req("content", String), opt("attrs", Object)],
            )
            .with_intent(
                &IntentType::ProposeAgreement,
                vec![req("subjects", Array), opt("attrs", Object)],
            )
            .with_intent(
                &IntentType::AcceptAgreement,
                vec![req("agreement_id", NodeRef), opt("accepted_by", NodeRef)],
            )
            .with_intent(
                &IntentType::ExtractRequirements,
                vec![req("text", String), opt("target_need", NodeRef)],
            )
    }
}
