//! JSON reformat fallback.
//!
//! JSON has no surgical path yet: updates decode the whole document,
//! apply through the tree navigator, and re-encode with two-space
//! indentation. Original formatting is lost; the engine consults
//! `FileFormat::supports_surgical` to attribute that in its logs.

use super::Updates;
use crate::error::RewriteError;
use crate::keypath::KeyPath;
use crate::model::FileFormat;
use crate::tree::{self, parse_str};

pub(super) fn apply(content: &str, updates: &Updates) -> Result<String, RewriteError> {
    let mut root = parse_str(FileFormat::Json, content).map_err(|reason| {
        RewriteError::Encode {
            path: "(document)".to_string(),
            reason,
        }
    })?;

    for (key_path, new_value) in updates {
        let path = KeyPath::parse(key_path).map_err(|_| RewriteError::NoMatch {
            path: key_path.clone(),
        })?;
        tree::set(&mut root, &path, new_value.clone()).map_err(|_| RewriteError::NoMatch {
            path: key_path.clone(),
        })?;
    }

    serde_json::to_string_pretty(&root).map_err(|e| RewriteError::Encode {
        path: "(document)".to_string(),
        reason: e.to_string(),
    })
}
