//! Change detection and propagation.
//!
//! This module provides:
//! - Per-source debouncing and rule matching
//! - Batch accumulation with flush timers
//! - Per-target write serialization
//! - The [`SyncEngine`] orchestrator tying them together over
//!   notify-rs directory watches

mod batch;
mod debounce;
mod engine;
mod executor;
mod locks;

pub use batch::{Batch, BatchQueue};
pub use debounce::{matching_rules, Debouncer};
pub use engine::{EngineConfig, EngineState, SyncEngine};
pub use locks::TargetLocks;

use std::path::{Path, PathBuf};

/// Canonicalize a path for identity comparisons: resolve symlinks when
/// the file exists, otherwise make it absolute lexically. Falls back
/// to the input on error.
pub(crate) fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
