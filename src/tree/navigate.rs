//! Key-path navigation over a [`Value`] tree.

use indexmap::IndexMap;

use super::Value;
use crate::error::PathError;
use crate::keypath::KeyPath;

/// Read the value at a key-path.
///
/// At each step the current node must be a mapping; if the step carries
/// an index, the value under the key must be a sequence.
///
/// # Errors
///
/// Returns [`PathError::NotFound`], [`PathError::TypeMismatch`], or
/// [`PathError::IndexOutOfBounds`].
pub fn get<'a>(root: &'a Value, path: &KeyPath) -> Result<&'a Value, PathError> {
    let mut current = root;

    for (i, step) in path.steps().iter().enumerate() {
        let Value::Map(map) = current else {
            return Err(PathError::TypeMismatch {
                path: path.prefix(i + 1),
                reason: format!("cannot descend through {}", current.type_name()),
            });
        };

        current = map.get(&step.name).ok_or_else(|| PathError::NotFound {
            path: path.prefix(i + 1),
        })?;

        if let Some(index) = step.index {
            let Value::Seq(seq) = current else {
                return Err(PathError::TypeMismatch {
                    path: path.prefix(i + 1),
                    reason: format!("{} is not a sequence", current.type_name()),
                });
            };
            current = seq.get(index).ok_or(PathError::IndexOutOfBounds {
                path: path.prefix(i + 1),
                index,
                len: seq.len(),
            })?;
        }
    }

    Ok(current)
}

/// Check that a key-path resolves, discarding the value.
///
/// # Errors
///
/// Same as [`get`].
pub fn validate_path(root: &Value, path: &KeyPath) -> Result<(), PathError> {
    get(root, path).map(|_| ())
}

/// Write a value at a key-path.
///
/// Missing intermediate mappings are created. Descending through a
/// scalar fails, as does replacing a whole mapping element of a
/// sequence (a TOML table-array slot) with a scalar.
///
/// # Errors
///
/// Returns [`PathError`] as for [`get`], plus `TypeMismatch` for the
/// table-array case.
pub fn set(root: &mut Value, path: &KeyPath, value: Value) -> Result<(), PathError> {
    let steps = path.steps();
    let mut value = Some(value);
    let mut current = root;

    for (i, step) in steps.iter().enumerate() {
        let last = i + 1 == steps.len();

        let map = match current {
            Value::Map(map) => map,
            other => {
                return Err(PathError::TypeMismatch {
                    path: path.prefix(i),
                    reason: format!("cannot descend through {}", other.type_name()),
                })
            }
        };

        if last && step.index.is_none() {
            map.insert(step.name.clone(), value.take().unwrap_or_default());
            return Ok(());
        }

        let node = if step.index.is_some() {
            map.get_mut(&step.name).ok_or_else(|| PathError::NotFound {
                path: path.prefix(i + 1),
            })?
        } else {
            map.entry(step.name.clone())
                .or_insert_with(|| Value::Map(IndexMap::new()))
        };

        current = match step.index {
            Some(index) => {
                let seq = match node {
                    Value::Seq(seq) => seq,
                    other => {
                        return Err(PathError::TypeMismatch {
                            path: path.prefix(i + 1),
                            reason: format!("{} is not a sequence", other.type_name()),
                        })
                    }
                };
                let len = seq.len();
                let slot = seq.get_mut(index).ok_or(PathError::IndexOutOfBounds {
                    path: path.prefix(i + 1),
                    index,
                    len,
                })?;

                if last {
                    let incoming = value.take().unwrap_or_default();
                    if slot.is_map() && incoming.is_scalar() {
                        return Err(PathError::TypeMismatch {
                            path: path.prefix(i + 1),
                            reason: "cannot replace a table-array element with a scalar"
                                .to_string(),
                        });
                    }
                    *slot = incoming;
                    return Ok(());
                }
                slot
            }
            None => node,
        };
    }

    Ok(())
}

/// Enumerate every leaf key-path in the tree, in insertion order.
/// Sequence elements render as `name[i]`; mapping elements of
/// sequences are recursed into.
#[must_use]
pub fn leaf_paths(root: &Value) -> Vec<String> {
    let mut out = Vec::new();
    if let Value::Map(map) = root {
        collect_map(map, "", &mut out);
    }
    out
}

fn collect_map(map: &IndexMap<String, Value>, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in map {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Map(inner) => collect_map(inner, &full, out),
            Value::Seq(items) => {
                for (i, item) in items.iter().enumerate() {
                    let indexed = format!("{full}[{i}]");
                    if let Value::Map(inner) = item {
                        collect_map(inner, &indexed, out);
                    } else {
                        out.push(indexed);
                    }
                }
            }
            _ => out.push(full),
        }
    }
}
