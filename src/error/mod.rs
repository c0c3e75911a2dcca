//! Error types and Result aliases for varsync.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.
//! Per-rule failures during sync are reported as `SyncEvent` records
//! rather than propagated; the types here cover everything else.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::FileFormat;

/// Result type alias using varsync's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for varsync operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Rules document error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Key-path syntax or resolution error.
    #[error("key path error: {0}")]
    Path(#[from] PathError),

    /// File load error.
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// Surgical rewrite error.
    #[error("rewrite error: {0}")]
    Rewrite(#[from] RewriteError),

    /// File watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Key-path errors: syntax failures at parse time, resolution failures
/// at navigation time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Malformed key-path expression.
    #[error("invalid key path syntax at byte {position}")]
    Syntax { position: usize },

    /// The key-path does not resolve in the tree.
    #[error("key not found: {path}")]
    NotFound { path: String },

    /// Attempted to descend through a scalar, or set an incompatible
    /// value into a slot.
    #[error("type mismatch at {path}: {reason}")]
    TypeMismatch { path: String, reason: String },

    /// Sequence index past the end.
    #[error("index {index} out of bounds at {path} (length {len})")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },
}

/// IO or parse failure on a source or target file.
#[derive(Error, Debug)]
#[error("failed to load {format} file '{}': {cause}", path.display())]
pub struct LoadError {
    pub path: PathBuf,
    pub format: FileFormat,
    pub cause: String,
}

/// Surgical rewrite failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    /// No line context matched a requested key-path.
    #[error("no line found for key path '{path}'")]
    NoMatch { path: String },

    /// A value could not be rendered in the target format.
    #[error("cannot encode value for '{path}': {reason}")]
    Encode { path: String, reason: String },
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to watch path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// The engine is already running.
    #[error("engine already started")]
    AlreadyRunning,

    /// The engine is not running.
    #[error("engine not running")]
    NotRunning,
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl LoadError {
    /// Create a load error, capturing the cause as text.
    pub fn new(path: impl Into<PathBuf>, format: FileFormat, cause: impl ToString) -> Self {
        Self {
            path: path.into(),
            format,
            cause: cause.to_string(),
        }
    }
}
