//! Mutation handlers, one per executable intent type.
//!
//! Handlers mutate the live graph in place and may leave it partially
//! modified when they fail; the engine restores its snapshot in that case.

use tracing::debug;

use crate::error::ExecutionError;
use crate::graph::{Edge, EdgeMetadata, Node, NodeId, NodeMetadata, Ssot};
use crate::patch::apply_patch;
use crate::schema::EffectiveSchema;
use crate::value::{Map, Value};

use super::params::Params;
use super::{Change, ChangeType, Intent, IntentType, ResolvedMetadata};

pub(crate) const NEED_KIND: &str = "Need";
pub(crate) const REQUIREMENT_KIND: &str = "Requirement";
pub(crate) const EXPRESSES_EDGE: &str = "expresses";
pub(crate) const REFINES_TO_EDGE: &str = "refinesTo";

/// Everything a handler needs besides the graph.
pub(crate) struct HandlerContext<'a> {
    pub(crate) schema: &'a EffectiveSchema,
    pub(crate) metadata: &'a ResolvedMetadata,
}

/// Routes `intent` to its handler.
pub(crate) fn dispatch(
    graph: &mut Ssot,
    intent: &Intent,
    ctx: &HandlerContext<'_>,
) -> Result<Vec<Change>, ExecutionError> {
    let params = Params(&intent.params);
    debug!(intent_type = %intent.intent_type, "dispatching intent");
    match &intent.intent_type {
        IntentType::AddNode => add_node(graph, ctx, params),
        IntentType::AddEdge => add_edge(graph, ctx, params),
        IntentType::UpdateNodeAttrs => update_node_attrs(graph, params),
        IntentType::DeleteNode => delete_node(graph, params),
        IntentType::AddNeed => add_need(graph, ctx, params),
        IntentType::AddRequirementRefinement => add_requirement_refinement(graph, ctx, params),
        other => Err(ExecutionError::NotImplemented {
            intent_type: other.to_string(),
        }),
    }
}

fn details<const N: usize>(pairs: [(&str, Value); N]) -> Value {
    Value::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

fn insert_node(
    graph: &mut Ssot,
    ctx: &HandlerContext<'_>,
    kind: &str,
    attrs: Map,
    confidence: Option<f64>,
) -> Result<(NodeId, Change), ExecutionError> {
    if !ctx.schema.has_node_kind(kind) {
        return Err(ExecutionError::UndefinedNodeKind {
            kind: kind.to_string(),
        });
    }
    let node = Node {
        id: NodeId::generate(),
        kind: kind.to_string(),
        attrs,
        metadata: NodeMetadata {
            created_at: ctx.metadata.timestamp,
            created_by: ctx.metadata.source.node_origin(),
            confidence,
            originating_intent_id: Some(ctx.metadata.intent_id.clone()),
        },
    };
    let id = node.id.clone();
    graph.nodes.push(node);
    let change = Change::new(
        ChangeType::NodeAdded,
        id.as_str(),
        details([("kind", Value::from(kind))]),
    );
    Ok((id, change))
}

fn insert_edge(
    graph: &mut Ssot,
    ctx: &HandlerContext<'_>,
    from: NodeId,
    kind: &str,
    to: NodeId,
    attrs: Option<Map>,
    confidence: Option<f64>,
) -> Result<Change, ExecutionError> {
    let source = graph
        .node(&from)
        .ok_or_else(|| ExecutionError::NodeNotFound { id: from.clone() })?;
    let target = graph
        .node(&to)
        .ok_or_else(|| ExecutionError::NodeNotFound { id: to.clone() })?;
    ctx.schema.check_endpoints(kind, &source.kind, &target.kind)?;

    let edge = Edge {
        from,
        kind: kind.to_string(),
        to,
        attrs,
        metadata: EdgeMetadata {
            created_at: ctx.metadata.timestamp,
            created_by: ctx.metadata.source.edge_origin(),
            confidence,
            originating_intent_id: Some(ctx.metadata.intent_id.clone()),
            is_derived: None,
        },
    };
    let change = Change::new(
        ChangeType::EdgeAdded,
        edge.key().to_string(),
        details([
            ("from", Value::from(edge.from.as_str())),
            ("kind", Value::from(kind)),
            ("to", Value::from(edge.to.as_str())),
        ]),
    );
    graph.edges.push(edge);
    Ok(change)
}

fn add_node(
    graph: &mut Ssot,
    ctx: &HandlerContext<'_>,
    params: Params<'_>,
) -> Result<Vec<Change>, ExecutionError> {
    let kind = params.str("kind")?;
    let attrs = params.object_or_empty("attrs")?;
    let (_, change) = insert_node(graph, ctx, kind, attrs, params.opt_f64("confidence")?)?;
    Ok(vec![change])
}

fn add_edge(
    graph: &mut Ssot,
    ctx: &HandlerContext<'_>,
    params: Params<'_>,
) -> Result<Vec<Change>, ExecutionError> {
    let from = params.node_id("from")?;
    let kind = params.str("edge_kind")?;
    let to = params.node_id("to")?;
    let attrs = match params.get("attrs") {
        Some(_) => Some(params.object_or_empty("attrs")?),
        None => None,
    };
    let change = insert_edge(graph, ctx, from, kind, to, attrs, params.opt_f64("confidence")?)?;
    Ok(vec![change])
}

fn update_node_attrs(graph: &mut Ssot, params: Params<'_>) -> Result<Vec<Change>, ExecutionError> {
    let id = params.node_id("node_id")?;
    let ops = params.patch("patch")?;
    let node = graph
        .node_mut(&id)
        .ok_or_else(|| ExecutionError::NodeNotFound { id: id.clone() })?;

    match apply_patch(&Value::Object(node.attrs.clone()), &ops)? {
        Value::Object(attrs) => node.attrs = attrs,
        other => {
            return Err(ExecutionError::invalid_param(
                "patch",
                format!("attrs must remain an object, got {}", other.type_name()),
            ))
        }
    }

    Ok(vec![Change::new(
        ChangeType::NodeUpdated,
        id.as_str(),
        details([("operations", Value::from(ops.len()))]),
    )])
}

fn delete_node(graph: &mut Ssot, params: Params<'_>) -> Result<Vec<Change>, ExecutionError> {
    let id = params.node_id("node_id")?;
    let cascade = params.opt_bool("cascade")?.unwrap_or(false);
    let kind = graph
        .node(&id)
        .map(|n| n.kind.clone())
        .ok_or_else(|| ExecutionError::NodeNotFound { id: id.clone() })?;

    let edge_count = graph.edges_touching(&id).count();
    if edge_count > 0 && !cascade {
        return Err(ExecutionError::CascadeRequired {
            node_id: id,
            edge_count,
        });
    }

    let (removed, kept): (Vec<Edge>, Vec<Edge>) =
        std::mem::take(&mut graph.edges).into_iter().partition(|e| e.touches(&id));
    graph.edges = kept;
    graph.nodes.retain(|n| n.id != id);

    let mut changes: Vec<Change> = removed
        .iter()
        .map(|e| Change::new(ChangeType::EdgeDeleted, e.key().to_string(), Value::Null))
        .collect();
    changes.push(Change::new(
        ChangeType::NodeDeleted,
        id.as_str(),
        details([
            ("kind", Value::from(kind)),
            ("edges_deleted", Value::from(removed.len())),
        ]),
    ));
    Ok(changes)
}

fn add_need(
    graph: &mut Ssot,
    ctx: &HandlerContext<'_>,
    params: Params<'_>,
) -> Result<Vec<Change>, ExecutionError> {
    let mut attrs = params.object_or_empty("attrs")?;
    attrs.insert("statement".to_string(), Value::from(params.str("statement")?));
    let confidence = params.opt_f64("confidence")?;

    let (need_id, node_change) = insert_node(graph, ctx, NEED_KIND, attrs, confidence)?;
    let mut changes = vec![node_change];
    if let Some(actor) = params.opt_node_id("expressed_by")? {
        changes.push(insert_edge(graph, ctx, actor, EXPRESSES_EDGE, need_id, None, confidence)?);
    }
    Ok(changes)
}

fn add_requirement_refinement(
    graph: &mut Ssot,
    ctx: &HandlerContext<'_>,
    params: Params<'_>,
) -> Result<Vec<Change>, ExecutionError> {
    let need_id = params.node_id("need_id")?;
    let need = graph
        .node(&need_id)
        .ok_or_else(|| ExecutionError::NodeNotFound { id: need_id.clone() })?;
    if need.kind != NEED_KIND {
        return Err(ExecutionError::UnexpectedNodeKind {
            id: need_id,
            expected: NEED_KIND.to_string(),
            actual: need.kind.clone(),
        });
    }

    let mut attrs = params.object_or_empty("attrs")?;
    attrs.insert("statement".to_string(), Value::from(params.str("statement")?));
    let confidence = params.opt_f64("confidence")?;

    let (req_id, node_change) = insert_node(graph, ctx, REQUIREMENT_KIND, attrs, confidence)?;
    let edge_change = insert_edge(graph, ctx, need_id, REFINES_TO_EDGE, req_id, None, confidence)?;
    Ok(vec![node_change, edge_change])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    use crate::graph::{CollaborationMode, NodeOrigin};
    use crate::intent::{IntentMetadata, IntentSource};
    use crate::schema::EdgeDefinition;

    fn schema() -> EffectiveSchema {
        EffectiveSchema::new(["Need", "Requirement", "Stakeholder"], Vec::<String>::new())
            .with_edge("refinesTo", EdgeDefinition::new(["Need"], ["Requirement"]))
            .with_edge("expresses", EdgeDefinition::new(["Stakeholder"], ["Need"]))
    }

    fn run(graph: &mut Ssot, intent_type: IntentType, params: serde_json::Value) -> Result<Vec<Change>, ExecutionError> {
        let schema = schema();
        let metadata = IntentMetadata {
            source: IntentSource::Ai,
            ..IntentMetadata::default()
        }
        .resolve(Utc::now());
        let ctx = HandlerContext {
            schema: &schema,
            metadata: &metadata,
        };
        let params = match Value::from(params) {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        dispatch(graph, &Intent::new(intent_type, params), &ctx)
    }

    fn graph() -> Ssot {
        let mut g = Ssot::new("test", CollaborationMode::Copilot);
        g.nodes.push(Node::new("Stakeholder", Map::new()).with_id("actor"));
        g.nodes.push(Node::new("Need", Map::new()).with_id("need"));
        g
    }

    #[test]
    fn add_node_stamps_provenance() {
        let mut g = graph();
        let changes = run(&mut g, IntentType::AddNode, json!({"kind": "Requirement", "confidence": 0.7})).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::NodeAdded);
        let node = g.nodes.last().unwrap();
        assert_eq!(node.id.as_str(), changes[0].target);
        assert_eq!(node.metadata.created_by, NodeOrigin::Ai);
        assert_eq!(node.metadata.confidence, Some(0.7));
        assert!(node.metadata.originating_intent_id.is_some());
    }

    #[test]
    fn add_node_rejects_unknown_kind() {
        let mut g = graph();
        let err = run(&mut g, IntentType::AddNode, json!({"kind": "Widget"})).unwrap_err();
        assert!(matches!(err, ExecutionError::UndefinedNodeKind { .. }));
        assert_eq!(g.nodes.len(), 2);
    }

    #[test]
    fn add_edge_enforces_endpoint_kinds() {
        let mut g = graph();
        let err = run(
            &mut g,
            IntentType::AddEdge,
            json!({"from": "actor", "edge_kind": "refinesTo", "to": "need"}),
        )
        .unwrap_err();
        assert!(matches!(err, ExecutionError::EndpointKindMismatch { endpoint: "source", .. }));
        assert!(g.edges.is_empty());
    }

    #[test]
    fn add_edge_appends_duplicates() {
        let mut g = graph();
        let params = json!({"from": "actor", "edge_kind": "expresses", "to": "need"});
        run(&mut g, IntentType::AddEdge, params.clone()).unwrap();
        run(&mut g, IntentType::AddEdge, params).unwrap();
        assert_eq!(g.edges.len(), 2);
        assert_eq!(g.duplicate_edges().len(), 1);
    }

    #[test]
    fn update_attrs_is_all_or_nothing() {
        let mut g = graph();
        g.nodes[1].attrs.insert("status".into(), "draft".into());
        let err = run(
            &mut g,
            IntentType::UpdateNodeAttrs,
            json!({"node_id": "need", "patch": [
                {"op": "replace", "path": "/status", "value": "approved"},
                {"op": "test", "path": "/status", "value": "draft"}
            ]}),
        )
        .unwrap_err();
        assert!(matches!(err, ExecutionError::Patch(_)));
        assert_eq!(g.nodes[1].attrs.get("status"), Some(&Value::from("draft")));

        run(
            &mut g,
            IntentType::UpdateNodeAttrs,
            json!({"node_id": "need", "patch": [
                {"op": "test", "path": "/status", "value": "draft"},
                {"op": "replace", "path": "/status", "value": "approved"}
            ]}),
        )
        .unwrap();
        assert_eq!(g.nodes[1].attrs.get("status"), Some(&Value::from("approved")));
    }

    #[test]
    fn update_attrs_must_keep_object_root() {
        let mut g = graph();
        let err = run(
            &mut g,
            IntentType::UpdateNodeAttrs,
            json!({"node_id": "need", "patch": [{"op": "replace", "path": "", "value": 5}]}),
        )
        .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidParameter { .. }));
    }

    #[test]
    fn delete_node_requires_cascade_for_connected_nodes() {
        let mut g = graph();
        run(&mut g, IntentType::AddEdge, json!({"from": "actor", "edge_kind": "expresses", "to": "need"})).unwrap();

        let err = run(&mut g, IntentType::DeleteNode, json!({"node_id": "need"})).unwrap_err();
        assert!(matches!(err, ExecutionError::CascadeRequired { edge_count: 1, .. }));

        let changes = run(&mut g, IntentType::DeleteNode, json!({"node_id": "need", "cascade": true})).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].details.lookup("edges_deleted"), Some(&Value::Int(1)));
        assert!(g.edges.is_empty());
        assert!(!g.contains_node(&NodeId::from("need")));
    }

    #[test]
    fn add_need_with_actor_emits_two_changes() {
        let mut g = graph();
        let changes = run(
            &mut g,
            IntentType::AddNeed,
            json!({"statement": "Users need to sign in", "expressed_by": "actor"}),
        )
        .unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].change_type, ChangeType::NodeAdded);
        assert_eq!(changes[1].change_type, ChangeType::EdgeAdded);
        let need = g.nodes.last().unwrap();
        assert_eq!(need.kind, NEED_KIND);
        assert_eq!(need.attrs.get("statement"), Some(&Value::from("Users need to sign in")));
        assert_eq!(g.edges[0].from, NodeId::from("actor"));
        assert_eq!(g.edges[0].to, need.id);
    }

    #[test]
    fn refinement_requires_need_kind() {
        let mut g = graph();
        let err = run(
            &mut g,
            IntentType::AddRequirementRefinement,
            json!({"need_id": "actor", "statement": "x"}),
        )
        .unwrap_err();
        assert!(matches!(err, ExecutionError::UnexpectedNodeKind { .. }));

        let changes = run(
            &mut g,
            IntentType::AddRequirementRefinement,
            json!({"need_id": "need", "statement": "The system shall support SSO"}),
        )
        .unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(g.edges[0].kind, REFINES_TO_EDGE);
        assert_eq!(g.edges[0].from, NodeId::from("need"));
    }

    #[test]
    fn unimplemented_types_fail_explicitly() {
        let mut g = graph();
        let err = run(&mut g, IntentType::ToggleEdge, json!({})).unwrap_err();
        assert!(matches!(err, ExecutionError::NotImplemented { ref intent_type } if intent_type == "ToggleEdge"));
    }
}
