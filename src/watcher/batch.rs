//! Per-source batching with restartable flush timers.
//!
//! At most one batch is pending per canonical source path. The first
//! matching event creates the batch and arms its timer; later accepted
//! events replace the rule snapshot and restart the timer; suppressed
//! events within the debounce window still extend the timer so a burst
//! flushes once, `batch_delay` after its last write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::model::SyncRule;

/// A flushed batch: one source path plus the rules matched at the last
/// contributing event.
#[derive(Debug)]
pub struct Batch {
    pub source: PathBuf,
    pub rules: Vec<SyncRule>,
}

struct Pending {
    rules: Vec<SyncRule>,
    timer: JoinHandle<()>,
}

/// Pending-batch registry. Timer expiry sends the source path on the
/// fire channel; the executor then claims the batch with [`take`].
///
/// [`take`]: BatchQueue::take
pub struct BatchQueue {
    delay: Duration,
    fire_tx: mpsc::Sender<PathBuf>,
    pending: Mutex<HashMap<PathBuf, Pending>>,
}

impl BatchQueue {
    /// Create a queue flushing batches after `delay` of quiet.
    #[must_use]
    pub fn new(delay: Duration, fire_tx: mpsc::Sender<PathBuf>) -> Self {
        Self {
            delay,
            fire_tx,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Create or update the batch for `source`, replacing its rule
    /// snapshot and restarting its timer.
    pub fn push(&self, source: PathBuf, rules: Vec<SyncRule>) {
        let mut pending = self.pending.lock();
        let timer = self.arm_timer(source.clone());

        if let Some(existing) = pending.insert(source, Pending { rules, timer }) {
            existing.timer.abort();
        }
    }

    /// Restart the timer of an existing batch without touching its
    /// rule snapshot. Returns false when no batch is pending.
    pub fn touch(&self, source: &Path) -> bool {
        let mut pending = self.pending.lock();
        let Some(entry) = pending.get_mut(source) else {
            return false;
        };
        entry.timer.abort();
        entry.timer = self.arm_timer(source.to_path_buf());
        true
    }

    /// Atomically claim the batch for `source` once its timer fired.
    pub fn take(&self, source: &Path) -> Option<Batch> {
        let entry = self.pending.lock().remove(source)?;
        entry.timer.abort();
        Some(Batch {
            source: source.to_path_buf(),
            rules: entry.rules,
        })
    }

    /// Number of pending batches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether no batches are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Cancel all pending timers and discard the batches.
    pub fn cancel_all(&self) {
        let mut pending = self.pending.lock();
        for (_, entry) in pending.drain() {
            entry.timer.abort();
        }
    }

    fn arm_timer(&self, source: PathBuf) -> JoinHandle<()> {
        let fire_tx = self.fire_tx.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fire_tx.send(source).await;
        })
    }
}
