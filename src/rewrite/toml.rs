//! Surgical TOML rewriting via a line-context model.
//!
//! The scan tracks the current section: `[name]` headers set it
//! directly, `[[name]]` headers set it to `name[index]` with the index
//! incremented on each repeat of the identical bracketed name.
//! Top-level keys preceding any header, or sitting at column 0 after a
//! blank-line gap following a header, belong to the empty section.

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

        let value_text = rendered(FileFormat::Toml, key_path, new_value)?;
        let new_line = {
            let line = &lines[line_no];
            let Some(value_from) = find_assignment(line, &ctx.key) else {
                return Err(RewriteError::NoMatch {
                    path: key_path.clone(),
                });
            };
            let (start, end) = value_span(line, value_from);
            splice(line, start, end, &value_text)
        };
        lines[line_no] = new_line;
    }

    Ok(lines.join("\n"))
}

/// Build the line-index -> context table.
fn scan(lines: &[String]) -> HashMap<usize, LineCtx> {
    let mut contexts = HashMap::new();
    let mut current_section = String::new();
    let mut current_table_array = String::new();
    let mut array_index: i64 = -1;
    let mut last_section_line: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if trimmed.starts_with("[[") && trimmed.ends_with("]]") {
            let name = trimmed
                .trim_matches(|c| c == '[' || c == ']')
                .to_string();
            if name == current_table_array {
                array_index += 1;
            } else {
                current_table_array = name.clone();
                array_index = 0;
            }
            current_section = format!("{name}[{array_index}]");
            last_section_line = Some(i);
            continue;
        }

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            current_section = trimmed
                .trim_matches(|c| c == '[' || c == ']')
                .to_string();
            current_table_array.clear();
            array_index = -1;
            last_section_line = Some(i);
            continue;
        }

        if let Some((key, _)) = trimmed.split_once('=') {
            let key = key.trim().to_string();

            // A column-0 key after a blank-line gap following the last
            // header reads as top-level, as does any key before the
            // first header.
            let at_column_zero = !line.starts_with(' ') && !line.starts_with('\t');
            let is_top_level = at_column_zero
                && match last_section_line {
                    None => true,
                    Some(section_line) => lines[section_line + 1..i]
                        .iter()
                        .any(|l| l.trim().is_empty()),
                };

            let full_path = if is_top_level || current_section.is_empty() {
                key.clone()
            } else {
                format!("{current_section}.{key}")
            };

            contexts.insert(i, LineCtx { key, full_path });
        }
    }

    contexts
}

/// Byte index just past the `=` of the `key = ...` assignment, or
/// `None` if the key is not assigned on this line.
fn find_assignment(line: &str, key: &str) -> Option<usize> {
    let mut search_from = 0;
    while let Some(found) = line[search_from..].find(key) {
        let start = search_from + found;
        let after = start + key.len();
        let rest = line[after..].as_bytes();
        let mut skip = 0;
        while skip < rest.len() && (rest[skip] == b' ' || rest[skip] == b'\t') {
            skip += 1;
        }
        if skip < rest.len() && rest[skip] == b'=' {
            return Some(after + skip + 1);
        }
        search_from = start + 1;
    }
    None
}
