//! Core data models: file formats, sync rules, and sync events.
//!
//! The serialized shapes here match the persisted rules document, so
//! field names stay snake_case and optional fields are skipped when
//! absent.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::tree::Value;

/// Get current Unix timestamp in seconds.
#[must_use]
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(0))
        .unwrap_or(0)
}

/// Generate a unique ID with a given prefix.
#[must_use]
pub fn generate_id(prefix: &str) -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u128(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    );
    format!("{}_{:x}", prefix, hasher.finish())
}

/// Structured file format, decided by path suffix alone.
///
/// Unrecognized suffixes default to [`FileFormat::Json`]. This mirrors
/// the long-standing behavior rule authors rely on; callers with
/// arbitrary file names should be aware the content will be parsed as
/// JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Json,
    Yaml,
    Toml,
    Env,
}

impl FileFormat {
    /// Detect the format from a path suffix. Case-sensitive, never
    /// reads file contents.
    #[must_use]
    pub fn detect(path: &Path) -> Self {
        let name = path.to_string_lossy();
        if name.ends_with(".yaml") || name.ends_with(".yml") {
            Self::Yaml
        } else if name.ends_with(".toml") {
            Self::Toml
        } else if name.ends_with(".env") {
            Self::Env
        } else {
            Self::Json
        }
    }

    /// Whether updates to this format preserve the original bytes
    /// outside the replaced scalar spans.
    ///
    /// JSON updates go through a full decode/encode roundtrip and
    /// reformat the whole file; the engine consults this flag to log
    /// that degradation.
    #[must_use]
    pub fn supports_surgical(self) -> bool {
        !matches!(self, Self::Json)
    }

    /// Format name as used in logs and error messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Env => "env",
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directive mapping one source scalar location to one target scalar
/// location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRule {
    /// Unique identifier within a ruleset.
    pub id: String,

    /// Human-readable rule name.
    pub name: String,

    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// File watched for changes.
    pub source_file: PathBuf,

    /// Key-path expression locating the value to read.
    pub source_key: String,

    /// File receiving the propagated value.
    pub target_file: PathBuf,

    /// Key-path expression locating the value to replace.
    pub target_key: String,

    /// Disabled rules participate in none of the matching.
    pub enabled: bool,

    /// Unix timestamp of rule creation.
    pub created: i64,

    /// Unix timestamp of the last successful sync, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<i64>,
}

impl SyncRule {
    /// Create an enabled rule with a fresh id and creation timestamp.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source_file: impl Into<PathBuf>,
        source_key: impl Into<String>,
        target_file: impl Into<PathBuf>,
        target_key: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_id("rule"),
            name: name.into(),
            description: String::new(),
            source_file: source_file.into(),
            source_key: source_key.into(),
            target_file: target_file.into(),
            target_key: target_key.into(),
            enabled: true,
            created: now_unix(),
            last_sync: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Outcome record for one rule in one batch. Emitted exactly once per
/// rule per batch, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEvent {
    /// Rule that produced this outcome.
    pub rule_id: String,

    /// Unix timestamp of the outcome.
    pub timestamp: i64,

    /// Target value before the rewrite, best-effort (`Null` if
    /// unreadable).
    #[serde(default)]
    pub old_value: Value,

    /// Value written to the target.
    #[serde(default)]
    pub new_value: Value,

    /// Whether the rule's update was applied.
    pub success: bool,

    /// Failure description when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncEvent {
    /// Build a success event.
    #[must_use]
    pub fn success(rule_id: impl Into<String>, old_value: Value, new_value: Value) -> Self {
        Self {
            rule_id: rule_id.into(),
            timestamp: now_unix(),
            old_value,
            new_value,
            success: true,
            error: None,
        }
    }

    /// Build a failure event.
    #[must_use]
    pub fn failure(rule_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            timestamp: now_unix(),
            old_value: Value::Null,
            new_value: Value::Null,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// The persisted rules document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesFile {
    /// All configured rules, enabled or not.
    #[serde(default)]
    pub rules: Vec<SyncRule>,

    /// Log file path, empty to disable file logging.
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Enable debug-level logging.
    #[serde(default)]
    pub debug: bool,
}

fn default_log_file() -> String {
    "varsync.log".to_string()
}

impl Default for RulesFile {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            log_file: default_log_file(),
            debug: false,
        }
    }
}
