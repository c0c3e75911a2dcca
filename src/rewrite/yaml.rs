//! Surgical YAML rewriting via a line-context model.
//!
//! One left-to-right pass assigns each assignment line a full key-path
//! using indent-keyed tables of container paths. Block sequences use
//! the two-space dash convention: a `- ` item's parent is the container
//! registered two columns to the left, and its own properties register
//! two columns to the right. Tab-indented or non-uniform files find no
//! context and fail with `NoMatch` rather than being mis-edited.

use std::collections::{HashMap, HashSet};

use super::{rendered, splice, value_span, Updates};
use crate::error::RewriteError;
use crate::model::FileFormat;

/// Structural context of one assignment line.
struct LineCtx {
    key: String,
    full_path: String,
}

pub(super) fn apply(content: &str, updates: &Updates) -> Result<String, RewriteError> {
    let mut lines: Vec<String> = content.split('\n').map(String::from).collect();
    let contexts = scan(&lines);

    let mut updated: HashSet<usize> = HashSet::new();
    for (key_path, new_value) in updates {
        let Some((&line_no, ctx)) = contexts
            .iter()
            .find(|(_, ctx)| &ctx.full_path == key_path)
        else {
            return Err(RewriteError::NoMatch {
                path: key_path.clone(),
            });
        };
        if !updated.insert(line_no) {
            continue;
        }

        let value_text = rendered(FileFormat::Yaml, key_path, new_value)?;
        let anchor = format!("{}:", ctx.key);
        let new_line = {
            let line = &lines[line_no];
            let Some(key_index) = line.find(&anchor) else {
                return Err(RewriteError::NoMatch {
                    path: key_path.clone(),
                });
            };
            let (start, end) = value_span(line, key_index + anchor.len());
            splice(line, start, end, &value_text)
        };
        lines[line_no] = new_line;
    }

    Ok(lines.join("\n"))
}

/// Build the line-index -> context table.
fn scan(lines: &[String]) -> HashMap<usize, LineCtx> {
    let mut contexts = HashMap::new();
    // Mapping-container path per indent level (registered at the
    // container's own column; children sit two columns right).
    let mut containers: HashMap<usize, String> = HashMap::new();
    // Sequence-item path per indent level (registered at the item
    // properties' column).
    let mut items: HashMap<usize, String> = HashMap::new();
    // Next sequence index per parent path.
    let mut seq_indices: HashMap<String, i64> = HashMap::new();

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let indent = line.len() - line.trim_start_matches(' ').len();

        // Indentation decreased: deeper scopes are closed.
        containers.retain(|level, _| *level <= indent);
        items.retain(|level, _| *level <= indent);

        if let Some(rest) = trimmed.strip_prefix("- ") {
            let parent = ancestor(&containers, &items, indent);
            let counter = seq_indices.entry(parent.clone()).or_insert(-1);
            *counter += 1;
            let index = *counter;

            if let Some((key, _)) = rest.split_once(':') {
                let key = key.trim().to_string();
                let item_path = if parent.is_empty() {
                    format!("[{index}]")
                } else {
                    format!("{parent}[{index}]")
                };
                contexts.insert(
                    i,
                    LineCtx {
                        key: key.clone(),
                        full_path: format!("{item_path}.{key}"),
                    },
                );
                items.insert(indent + 2, item_path);
            }
            continue;
        }

        if let Some((key, value)) = trimmed.split_once(':') {
            let key = key.trim().to_string();
            let value = value.trim();

            let parent = if indent == 0 {
                String::new()
            } else if let Some(item_path) = items.get(&indent) {
                // Property of the sequence item registered at exactly
                // this column.
                item_path.clone()
            } else {
                ancestor(&containers, &items, indent)
            };

            let full_path = if parent.is_empty() {
                key.clone()
            } else {
                format!("{parent}.{key}")
            };

            if value.is_empty() {
                // Container line.
                containers.insert(indent, full_path.clone());
                seq_indices.insert(full_path, -1);
            } else {
                contexts.insert(i, LineCtx { key, full_path });
            }
        }
    }

    contexts
}

/// Closest enclosing scope strictly left of `indent`, stepping down two
/// columns at a time. Container registrations win over sequence items
/// at the same level.
fn ancestor(
    containers: &HashMap<usize, String>,
    items: &HashMap<usize, String>,
    indent: usize,
) -> String {
    let mut level = indent as i64 - 2;
    while level >= 0 {
        #[allow(clippy::cast_sign_loss)]
        let at = level as usize;
        if let Some(path) = containers.get(&at) {
            return path.clone();
        }
        if let Some(path) = items.get(&at) {
            return path.clone();
        }
        level -= 2;
    }
    String::new()
}
