//! Format-aware surgical rewriting.
//!
//! Given a file's original content and a set of `key-path -> value`
//! updates, produce new content where only the scalar spans of matched
//! lines change. Comments, whitespace, key ordering, quoting of other
//! values, and blank lines are preserved byte-for-byte.
//!
//! JSON is the exception: it goes through a full decode/encode
//! roundtrip and reformats the file (see
//! [`crate::model::FileFormat::supports_surgical`]).
//!
//! The rewriter owns no state; it is a pure function of
//! `(content, format, updates)`.

mod env;
mod json;
mod render;
mod toml;
mod yaml;

pub use render::render_scalar;

use indexmap::IndexMap;

use crate::error::RewriteError;
use crate::model::FileFormat;
use crate::tree::Value;

/// Updates keyed by the rendered key-path expression.
pub type Updates = IndexMap<String, Value>;

/// Apply all updates to the content at once.
///
/// # Errors
///
/// Returns [`RewriteError::NoMatch`] if any update's key-path finds no
/// line context (nothing is partially applied in that case), or
/// [`RewriteError::Encode`] if a value cannot be rendered in the
/// format.
pub fn apply_updates(
    format: FileFormat,
    content: &str,
    updates: &Updates,
) -> Result<String, RewriteError> {
    match format {
        FileFormat::Yaml => yaml::apply(content, updates),
        FileFormat::Toml => toml::apply(content, updates),
        FileFormat::Env => env::apply(content, updates),
        FileFormat::Json => json::apply(content, updates),
    }
}

/// Render a scalar for insertion, mapping render failures to
/// [`RewriteError::Encode`] for the given key-path.
fn rendered(
    format: FileFormat,
    key_path: &str,
    value: &Value,
) -> Result<String, RewriteError> {
    render_scalar(format, value).map_err(|reason| RewriteError::Encode {
        path: key_path.to_string(),
        reason,
    })
}

/// Locate the value span on a line starting at `from` (just past the
/// `key:` or `key =` anchor): skip whitespace, then walk to the end of
/// the value, honoring double quotes with `\"` escapes and stopping at
/// an unquoted `#`. Trailing whitespace is excluded so inline comments
/// keep their spacing.
fn value_span(line: &str, from: usize) -> (usize, usize) {
    let bytes = line.as_bytes();
    let mut start = from;
    while start < bytes.len() && (bytes[start] == b' ' || bytes[start] == b'\t') {
        start += 1;
    }

    let mut end = start;
    let mut in_quotes = false;
    while end < bytes.len() {
        let b = bytes[end];
        if b == b'"' && (end == start || bytes[end - 1] != b'\\') {
            in_quotes = !in_quotes;
        } else if !in_quotes && b == b'#' {
            break;
        }
        end += 1;
    }

    while end > start && (bytes[end - 1] == b' ' || bytes[end - 1] == b'\t') {
        end -= 1;
    }

    (start, end)
}

/// Splice a rendered value into `line` over `[start, end)`.
fn splice(line: &str, start: usize, end: usize, rendered: &str) -> String {
    let mut out = String::with_capacity(line.len() - (end - start) + rendered.len());
    out.push_str(&line[..start]);
    out.push_str(rendered);
    out.push_str(&line[end..]);
    out
}
