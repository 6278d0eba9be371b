//! Structural patch interpreter over [`Value`] trees.
//!
//! Operations follow JSON Patch semantics (`add`, `remove`, `replace`,
//! `test`, `move`, `copy`) addressed by JSON Pointers. A patch is applied to a
//! scratch copy of the document and only returned when every operation,
//! including every `test`, succeeded.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Value;

/// A single structural patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOperation {
    /// Insert or overwrite `value` at `path`; `-` appends to an array.
    Add {
        /// Target pointer.
        path: String,
        /// Value to insert.
        value: Value,
    },
    /// Delete the value at `path`.
    Remove {
        /// Target pointer.
        path: String,
    },
    /// Overwrite an existing value at `path`.
    Replace {
        /// Target pointer.
        path: String,
        /// Replacement value.
        value: Value,
    },
    /// Fail the patch unless the value at `path` equals `value`.
    Test {
        /// Target pointer.
        path: String,
        /// Expected value.
        value: Value,
    },
    /// Remove the value at `from` and add it at `path`.
    Move {
        /// Source pointer.
        from: String,
        /// Target pointer.
        path: String,
    },
    /// Copy the value at `from` to `path`.
    Copy {
        /// Source pointer.
        from: String,
        /// Target pointer.
        path: String,
    },
}

impl PatchOperation {
    /// Returns the target pointer of this operation.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. }
            | Self::Remove { path }
            | Self::Replace { path, .. }
            | Self::Test { path, .. }
            | Self::Move { path, .. }
            | Self::Copy { path, .. } => path,
        }
    }
}

/// Errors raised while applying a patch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// The pointer is not a valid JSON Pointer for the document.
    #[error("operation {index}: invalid pointer '{pointer}'")]
    InvalidPointer {
        /// Position of the operation in the patch.
        index: usize,
        /// The pointer.
        pointer: String,
    },

    /// Nothing exists at the pointer.
    #[error("operation {index}: path '{pointer}' does not exist")]
    PathNotFound {
        /// Position of the operation in the patch.
        index: usize,
        /// The pointer.
        pointer: String,
    },

    /// A `test` operation did not match.
    #[error("operation {index}: test failed at '{pointer}'")]
    TestFailed {
        /// Position of the operation in the patch.
        index: usize,
        /// The pointer.
        pointer: String,
    },

    /// A `move` targets a descendant of its source.
    #[error("operation {index}: cannot move '{from}' into its own child '{pointer}'")]
    MoveIntoChild {
        /// Position of the operation in the patch.
        index: usize,
        /// Source pointer.
        from: String,
        /// Target pointer.
        pointer: String,
    },
}

/// Applies `ops` in order to a copy of `doc` and returns the patched copy.
///
/// # Errors
///
/// Returns the first failing operation; `doc` is never modified.
pub fn apply_patch(doc: &Value, ops: &[PatchOperation]) -> Result<Value, PatchError> {
    let mut scratch = doc.clone();
    for (index, op) in ops.iter().enumerate() {
        apply_one(&mut scratch, index, op)?;
    }
    Ok(scratch)
}

fn apply_one(doc: &mut Value, index: usize, op: &PatchOperation) -> Result<(), PatchError> {
    match op {
        PatchOperation::Add { path, value } => add(doc, index, path, value.clone()),
        PatchOperation::Remove { path } => remove(doc, index, path).map(|_| ()),
        PatchOperation::Replace { path, value } => {
            let slot = resolve_mut(doc, index, path)?;
            *slot = value.clone();
            Ok(())
        }
        PatchOperation::Test { path, value } => {
            let tokens = parse_pointer(index, path)?;
            let actual = resolve(doc, &tokens).ok_or_else(|| PatchError::PathNotFound {
                index,
                pointer: path.clone(),
            })?;
            if actual.loose_eq(value) {
                Ok(())
            } else {
                Err(PatchError::TestFailed {
                    index,
                    pointer: path.clone(),
                })
            }
        }
        PatchOperation::Move { from, path } => {
            if path.starts_with(&format!("{from}/")) {
                return Err(PatchError::MoveIntoChild {
                    index,
                    from: from.clone(),
                    pointer: path.clone(),
                });
            }
            let moved = remove(doc, index, from)?;
            add(doc, index, path, moved)
        }
        PatchOperation::Copy { from, path } => {
            let tokens = parse_pointer(index, from)?;
            let copied = resolve(doc, &tokens)
                .cloned()
                .ok_or_else(|| PatchError::PathNotFound {
                    index,
                    pointer: from.clone(),
                })?;
            add(doc, index, path, copied)
        }
    }
}

/// Splits an RFC 6901 pointer into unescaped reference tokens.
fn parse_pointer(index: usize, pointer: &str) -> Result<Vec<String>, PatchError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = pointer.strip_prefix('/') else {
        return Err(PatchError::InvalidPointer {
            index,
            pointer: pointer.to_string(),
        });
    };
    Ok(rest
        .split('/')
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect())
}

fn resolve<'a>(doc: &'a Value, tokens: &[String]) -> Option<&'a Value> {
    tokens.iter().try_fold(doc, |current, token| match current {
        Value::Object(map) => map.get(token),
        Value::Array(items) => array_index(token).and_then(|i| items.get(i)),
        _ => None,
    })
}

fn resolve_mut<'a>(doc: &'a mut Value, index: usize, pointer: &str) -> Result<&'a mut Value, PatchError> {
    let tokens = parse_pointer(index, pointer)?;
    let not_found = || PatchError::PathNotFound {
        index,
        pointer: pointer.to_string(),
    };
    let mut current = doc;
    for token in &tokens {
        current = match current {
            Value::Object(map) => map.get_mut(token).ok_or_else(not_found)?,
            Value::Array(items) => array_index(token)
                .and_then(|i| items.get_mut(i))
                .ok_or_else(not_found)?,
            _ => return Err(not_found()),
        };
    }
    Ok(current)
}

/// Array indices must be canonical decimal numbers (no leading zeros).
fn array_index(token: &str) -> Option<usize> {
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    token.parse().ok()
}

fn split_parent(index: usize, pointer: &str) -> Result<(String, String), PatchError> {
    let mut tokens = parse_pointer(index, pointer)?;
    let last = tokens.pop().ok_or_else(|| PatchError::InvalidPointer {
        index,
        pointer: pointer.to_string(),
    })?;
    let parent = tokens
        .iter()
        .map(|t| format!("/{}", t.replace('~', "~0").replace('/', "~1")))
        .collect();
    Ok((parent, last))
}

fn add(doc: &mut Value, index: usize, pointer: &str, value: Value) -> Result<(), PatchError> {
    if pointer.is_empty() {
        *doc = value;
        return Ok(());
    }
    let (parent, last) = split_parent(index, pointer)?;
    let not_found = || PatchError::PathNotFound {
        index,
        pointer: pointer.to_string(),
    };
    match resolve_mut(doc, index, &parent)? {
        Value::Object(map) => {
            map.insert(last, value);
            Ok(())
        }
        Value::Array(items) => {
            let position = if last == "-" {
                items.len()
            } else {
                array_index(&last).ok_or_else(not_found)?
            };
            if position > items.len() {
                return Err(not_found());
            }
            items.insert(position, value);
            Ok(())
        }
        _ => Err(not_found()),
    }
}

fn remove(doc: &mut Value, index: usize, pointer: &str) -> Result<Value, PatchError> {
    let (parent, last) = split_parent(index, pointer)?;
    let not_found = || PatchError::PathNotFound {
        index,
        pointer: pointer.to_string(),
    };
    match resolve_mut(doc, index, &parent)? {
        Value::Object(map) => map.remove(&last).ok_or_else(not_found),
        Value::Array(items) => {
            let position = array_index(&last).ok_or_else(not_found)?;
            if position >= items.len() {
                return Err(not_found());
            }
            Ok(items.remove(position))
        }
        _ => Err(not_found()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({"title": "Login", "tags": ["auth"], "meta": {"owner": "ana"}}).into()
    }

    fn ops(v: serde_json::Value) -> Vec<PatchOperation> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn applies_operations_in_order() {
        let patch = ops(json!([
            {"op": "replace", "path": "/title", "value": "Sign in"},
            {"op": "add", "path": "/tags/-", "value": "ux"},
            {"op": "add", "path": "/tags/0", "value": "first"},
            {"op": "remove", "path": "/meta/owner"},
            {"op": "add", "path": "/priority", "value": 2}
        ]));
        let out = apply_patch(&doc(), &patch).unwrap();
        let expected: Value =
            json!({"title": "Sign in", "tags": ["first", "auth", "ux"], "meta": {}, "priority": 2}).into();
        assert_eq!(out, expected);
    }

    #[test]
    fn failing_test_rejects_whole_patch() {
        let original = doc();
        let patch = ops(json!([
            {"op": "replace", "path": "/title", "value": "changed"},
            {"op": "test", "path": "/meta/owner", "value": "bob"}
        ]));
        let err = apply_patch(&original, &patch).unwrap_err();
        assert_eq!(
            err,
            PatchError::TestFailed {
                index: 1,
                pointer: "/meta/owner".to_string()
            }
        );
        assert_eq!(original, doc());
    }

    #[test]
    fn passing_test_allows_commit() {
        let patch = ops(json!([
            {"op": "test", "path": "/tags/0", "value": "auth"},
            {"op": "replace", "path": "/tags/0", "value": "authn"}
        ]));
        let out = apply_patch(&doc(), &patch).unwrap();
        assert_eq!(out.lookup("tags.0"), Some(&Value::from("authn")));
    }

    #[test]
    fn move_and_copy() {
        let patch = ops(json!([
            {"op": "copy", "from": "/meta/owner", "path": "/reviewer"},
            {"op": "move", "from": "/title", "path": "/meta/title"}
        ]));
        let out = apply_patch(&doc(), &patch).unwrap();
        assert_eq!(out.lookup("reviewer"), Some(&Value::from("ana")));
        assert_eq!(out.lookup("meta.title"), Some(&Value::from("Login")));
        assert!(out.lookup("title").is_none());
    }

    #[test]
    fn move_into_own_child_is_rejected() {
        let patch = ops(json!([{"op": "move", "from": "/meta", "path": "/meta/inner"}]));
        assert!(matches!(
            apply_patch(&doc(), &patch),
            Err(PatchError::MoveIntoChild { .. })
        ));
    }

    #[test]
    fn missing_paths_and_bad_pointers() {
        let patch = ops(json!([{"op": "remove", "path": "/nope"}]));
        assert!(matches!(apply_patch(&doc(), &patch), Err(PatchError::PathNotFound { .. })));

        let patch = ops(json!([{"op": "replace", "path": "title", "value": 1}]));
        assert!(matches!(apply_patch(&doc(), &patch), Err(PatchError::InvalidPointer { .. })));

        let patch = ops(json!([{"op": "add", "path": "/tags/7", "value": 1}]));
        assert!(matches!(apply_patch(&doc(), &patch), Err(PatchError::PathNotFound { .. })));
    }

    #[test]
    fn escaped_pointer_tokens() {
        let base: Value = json!({"a/b": 1, "c~d": 2}).into();
        let patch = ops(json!([
            {"op": "replace", "path": "/a~1b", "value": 10},
            {"op": "test", "path": "/c~0d", "value": 2}
        ]));
        let out = apply_patch(&base, &patch).unwrap();
        assert_eq!(out.as_object().unwrap().get("a/b"), Some(&Value::Int(10)));
    }
}
