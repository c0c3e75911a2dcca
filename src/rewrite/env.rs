//! Surgical dotenv rewriting.
//!
//! Each non-blank non-comment line splits on its first `=`. Matched
//! keys keep every character between the key and the `=` and between
//! the `=` and the value; only the value substring is replaced. The
//! value runs to the end of the line, excluding trailing whitespace.

use std::collections::HashSet;

use super::{rendered, splice, Updates};
use crate::error::RewriteError;
use crate::model::FileFormat;

pub(super) fn apply(content: &str, updates: &Updates) -> Result<String, RewriteError> {
    let mut lines: Vec<String> = content.split('\n').map(String::from).collect();
    let mut matched: HashSet<String> = HashSet::new();

    for line in &mut lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some(eq) = line.find('=') else {
            continue;
        };
        let key = line[..eq].trim().to_string();
        let Some(new_value) = updates.get(&key) else {
            continue;
        };

        let value_text = rendered(FileFormat::Env, &key, new_value)?;
        let (start, end) = env_value_span(line, eq + 1);
        *line = splice(line, start, end, &value_text);
        matched.insert(key);
    }

    for key_path in updates.keys() {
        if !matched.contains(key_path) {
            return Err(RewriteError::NoMatch {
                path: key_path.clone(),
            });
        }
    }

    Ok(lines.join("\n"))
}

/// Value span after the `=`: skip leading whitespace, run to end of
/// line, drop trailing whitespace.
fn env_value_span(line: &str, from: usize) -> (usize, usize) {
    let bytes = line.as_bytes();
    let mut start = from;
    while start < bytes.len() && (bytes[start] == b' ' || bytes[start] == b'\t') {
        start += 1;
    }
    let mut end = bytes.len();
    while end > start && (bytes[end - 1] == b' ' || bytes[end - 1] == b'\t') {
        end -= 1;
    }
    (start, end)
}
