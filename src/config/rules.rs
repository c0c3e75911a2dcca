//! Loading, saving, and editing the rules document.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::keypath::KeyPath;
use crate::model::{RulesFile, SyncRule};

/// Load the rules document, creating it with defaults if absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed,
/// or if the default document cannot be written.
pub fn load(path: &Path) -> Result<RulesFile> {
    if !path.exists() {
        let document = RulesFile::default();
        save(&document, path)?;
        return Ok(document);
    }

    let data = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("failed to read rules file: {e}")))?;
    serde_json::from_str(&data)
        .map_err(|e| Error::config(format!("failed to parse rules file: {e}")))
}

/// Write the rules document with two-space indentation, creating
/// parent directories as needed.
///
/// # Errors
///
/// Returns an error on serialization or IO failure.
pub fn save(document: &RulesFile, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .map_err(|e| Error::config(format!("failed to create config directory: {e}")))?;
        }
    }

    let data = serde_json::to_string_pretty(document)
        .map_err(|e| Error::config(format!("failed to serialize rules: {e}")))?;
    std::fs::write(path, data)
        .map_err(|e| Error::config(format!("failed to write rules file: {e}")))?;
    Ok(())
}

/// In-memory handle on a loaded rules document.
pub struct Manager {
    document: RulesFile,
    path: PathBuf,
}

impl Manager {
    /// Load (or create) the document at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`load`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = load(&path)?;
        Ok(Self { document, path })
    }

    /// The loaded document.
    #[must_use]
    pub fn document(&self) -> &RulesFile {
        &self.document
    }

    /// All rules.
    #[must_use]
    pub fn rules(&self) -> &[SyncRule] {
        &self.document.rules
    }

    /// Add a rule. Both key-path expressions are validated here so
    /// malformed rules are rejected at registration rather than at
    /// first sync.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::PathError::Syntax`] wrapped error for
    /// malformed key paths, or a config error for duplicate ids.
    pub fn add_rule(&mut self, rule: SyncRule) -> Result<()> {
        KeyPath::parse(&rule.source_key)?;
        KeyPath::parse(&rule.target_key)?;

        if self.document.rules.iter().any(|r| r.id == rule.id) {
            return Err(Error::config(format!("duplicate rule id '{}'", rule.id)));
        }

        self.document.rules.push(rule);
        Ok(())
    }

    /// Remove a rule by id. Returns whether a rule was removed.
    pub fn remove_rule(&mut self, id: &str) -> bool {
        let before = self.document.rules.len();
        self.document.rules.retain(|rule| rule.id != id);
        self.document.rules.len() != before
    }

    /// Look up a rule by id.
    #[must_use]
    pub fn rule(&self, id: &str) -> Option<&SyncRule> {
        self.document.rules.iter().find(|rule| rule.id == id)
    }

    /// Mutable lookup, for toggling `enabled` or stamping `last_sync`.
    pub fn rule_mut(&mut self, id: &str) -> Option<&mut SyncRule> {
        self.document.rules.iter_mut().find(|rule| rule.id == id)
    }

    /// Persist the document back to its path.
    ///
    /// # Errors
    ///
    /// Same as [`save`].
    pub fn save(&self) -> Result<()> {
        save(&self.document, &self.path)
    }
}
