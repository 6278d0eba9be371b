//! Typed access to intent parameters inside handlers.

use crate::error::ExecutionError;
use crate::graph::NodeId;
use crate::patch::PatchOperation;
use crate::value::{Map, Value};

/// Borrowed view over an intent's parameter map.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Params<'a>(pub(crate) &'a Map);

impl<'a> Params<'a> {
    /// Returns the value of `name`, treating explicit `null` as absent.
    pub(crate) fn get(&self, name: &str) -> Option<&'a Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    pub(crate) fn str(&self, name: &str) -> Result<&'a str, ExecutionError> {
        match self.get(name) {
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(ExecutionError::invalid_param(
                name,
                format!("expected string, got {}", other.type_name()),
            )),
            None => Err(ExecutionError::invalid_param(name, "missing")),
        }
    }

    pub(crate) fn node_id(&self, name: &str) -> Result<NodeId, ExecutionError> {
        self.str(name).map(NodeId::from)
    }

    pub(crate) fn opt_node_id(&self, name: &str) -> Result<Option<NodeId>, ExecutionError> {
        self.get(name).map(|_| self.node_id(name)).transpose()
    }

    pub(crate) fn opt_bool(&self, name: &str) -> Result<Option<bool>, ExecutionError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(ExecutionError::invalid_param(
                name,
                format!("expected boolean, got {}", other.type_name()),
            )),
        }
    }

    pub(crate) fn opt_f64(&self, name: &str) -> Result<Option<f64>, ExecutionError> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v.as_float().map(Some).ok_or_else(|| {
                ExecutionError::invalid_param(name, format!("expected number, got {}", v.type_name()))
            }),
        }
    }

    /// Returns an object parameter, or an empty map when absent.
    pub(crate) fn object_or_empty(&self, name: &str) -> Result<Map, ExecutionError> {
        match self.get(name) {
            None => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(other) => Err(ExecutionError::invalid_param(
                name,
                format!("expected object, got {}", other.type_name()),
            )),
        }
    }

    /// Decodes a list of structural patch operations.
    pub(crate) fn patch(&self, name: &str) -> Result<Vec<PatchOperation>, ExecutionError> {
        let raw = self
            .get(name)
            .ok_or_else(|| ExecutionError::invalid_param(name, "missing"))?;
        let json = serde_json::Value::from(raw.clone());
        serde_json::from_value(json)
            .map_err(|e| ExecutionError::invalid_param(name, format!("malformed patch: {e}")))
    }
}
