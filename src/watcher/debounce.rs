//! Per-source debouncing and rule matching.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::canonical;
use crate::model::SyncRule;

/// Leading-edge debouncer: an event within the window of the last
/// accepted event on the same path is dropped and does not reset the
/// window.
pub struct Debouncer {
    window: Duration,
    last_events: Mutex<HashMap<PathBuf, Instant>>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_events: Mutex::new(HashMap::new()),
        }
    }

    /// Whether an event on `path` should be processed now.
    pub fn accept(&self, path: &Path) -> bool {
        let now = Instant::now();
        let mut last_events = self.last_events.lock();

        if let Some(last) = last_events.get(path) {
            if now.duration_since(*last) < self.window {
                return false;
            }
        }
        last_events.insert(path.to_path_buf(), now);
        true
    }
}

/// Enabled rules whose canonical source path equals the event's
/// canonical path. A linear scan; rule counts stay small enough that
/// an index would not pay for itself.
#[must_use]
pub fn matching_rules(rules: &[SyncRule], event_path: &Path) -> Vec<SyncRule> {
    rules
        .iter()
        .filter(|rule| rule.enabled && canonical(&rule.source_file) == event_path)
        .cloned()
        .collect()
}
