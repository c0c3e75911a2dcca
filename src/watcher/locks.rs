//! Per-target write serialization.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;

/// Registry of per-target mutexes, keyed by canonical target path.
///
/// Holding a target's mutex is required around the whole
/// load-update-rewrite-write sequence for that file. Entries are
/// created on first use and never removed; the registry is bounded by
/// the number of distinct target files.
pub struct TargetLocks {
    inner: RwLock<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl TargetLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// The mutex for a canonical target path, inserting on first use.
    ///
    /// The hot path is a read under the shared lock; insertion takes
    /// the write lock with a double-check.
    #[must_use]
    pub fn lock_for(&self, target: &Path) -> Arc<Mutex<()>> {
        if let Some(lock) = self.inner.read().get(target) {
            return Arc::clone(lock);
        }

        let mut locks = self.inner.write();
        // Double-check pattern
        if let Some(lock) = locks.get(target) {
            return Arc::clone(lock);
        }
        let lock = Arc::new(Mutex::new(()));
        locks.insert(target.to_path_buf(), Arc::clone(&lock));
        lock
    }

    /// Number of registered targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether no targets are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl Default for TargetLocks {
    fn default() -> Self {
        Self::new()
    }
}
