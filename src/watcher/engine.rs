//! The sync engine: directory watches, event demultiplexing, batch
//! execution, and event emission.
//!
//! Three cooperating tasks, joined by bounded channels:
//! 1. the event pump, which debounces raw notify events, matches rules,
//!    and maintains batches (no file IO),
//! 2. the batch executor loop, which claims fired batches and runs
//!    them (concurrently across source files),
//! 3. the caller's consumer of [`SyncEngine::events`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use super::debounce::{matching_rules, Debouncer};
use super::executor::Executor;
use super::{canonical, BatchQueue, TargetLocks};
use crate::error::{Result, WatcherError};
use crate::keypath::KeyPath;
use crate::model::{SyncEvent, SyncRule};

/// Engine timing and capacity knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiet window below which repeat events on a source are dropped.
    pub debounce: Duration,
    /// Flush timer armed after the last contributing event of a batch.
    pub batch_delay: Duration,
    /// Bound of the outcome event channel.
    pub event_capacity: usize,
    /// Source load attempts per batch.
    pub load_retries: u32,
    /// Spacing between load attempts.
    pub retry_delay: Duration,
    /// Upper bound on waiting for in-flight batches during stop.
    /// `None` waits for them to drain.
    pub shutdown_deadline: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            batch_delay: Duration::from_millis(200),
            event_capacity: 100,
            load_retries: 3,
            retry_delay: Duration::from_millis(50),
            shutdown_deadline: None,
        }
    }
}

/// Engine lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

struct Running {
    shutdown_tx: watch::Sender<bool>,
    batches: Arc<BatchQueue>,
    pump: JoinHandle<()>,
    executor_loop: JoinHandle<()>,
}

/// Watches source files and propagates values to targets per the
/// configured rules.
pub struct SyncEngine {
    config: EngineConfig,
    rules: Arc<RwLock<Vec<SyncRule>>>,
    debouncer: Arc<Debouncer>,
    locks: Arc<TargetLocks>,
    state: Arc<Mutex<EngineState>>,
    event_tx: mpsc::Sender<SyncEvent>,
    event_rx: Option<mpsc::Receiver<SyncEvent>>,
    dropped: Arc<AtomicU64>,
    watcher: Arc<Mutex<Option<RecommendedWatcher>>>,
    watched_dirs: Arc<Mutex<HashSet<PathBuf>>>,
    running: Option<Running>,
}

impl SyncEngine {
    /// Create an engine with default timings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with explicit timings.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity);
        Self {
            debouncer: Arc::new(Debouncer::new(config.debounce)),
            config,
            rules: Arc::new(RwLock::new(Vec::new())),
            locks: Arc::new(TargetLocks::new()),
            state: Arc::new(Mutex::new(EngineState::Idle)),
            event_tx,
            event_rx: Some(event_rx),
            dropped: Arc::new(AtomicU64::new(0)),
            watcher: Arc::new(Mutex::new(None)),
            watched_dirs: Arc::new(Mutex::new(HashSet::new())),
            running: None,
        }
    }

    /// Swap in the live rule list. Batches already formed keep their
    /// snapshot; the new list applies from the next event on. While
    /// running, watches are registered for any new source directories.
    pub fn set_rules(&self, rules: Vec<SyncRule>) {
        for rule in &rules {
            for (side, key) in [("source", &rule.source_key), ("target", &rule.target_key)] {
                if let Err(err) = KeyPath::parse(key) {
                    tracing::warn!(
                        rule = %rule.id,
                        side,
                        key = %key,
                        error = %err,
                        "Rule has an invalid key path"
                    );
                }
            }
        }

        *self.rules.write() = rules;
        self.register_watches();
    }

    /// Current outcome receiver. The channel is created once; this
    /// returns `None` after the first call.
    pub fn events(&mut self) -> Option<mpsc::Receiver<SyncEvent>> {
        self.event_rx.take()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        *self.state.lock()
    }

    /// Events dropped because the outcome channel was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Start watching and processing.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::AlreadyRunning`] when called twice, or
    /// [`WatcherError::WatchFailed`] if the notifier cannot be created.
    pub async fn start(&mut self) -> Result<()> {
        {
            let state = self.state.lock();
            if matches!(*state, EngineState::Running | EngineState::Stopping) {
                return Err(WatcherError::AlreadyRunning.into());
            }
        }

        let (raw_tx, raw_rx) = mpsc::channel::<PathBuf>(256);
        let watcher = notify::recommended_watcher(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        for path in event.paths {
                            let _ = raw_tx.blocking_send(path);
                        }
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "File watcher error");
                }
            },
        )
        .map_err(|e| WatcherError::WatchFailed {
            path: "(init)".to_string(),
            reason: e.to_string(),
        })?;

        *self.watcher.lock() = Some(watcher);
        self.watched_dirs.lock().clear();
        self.register_watches();

        let (fire_tx, fire_rx) = mpsc::channel::<PathBuf>(100);
        let batches = Arc::new(BatchQueue::new(self.config.batch_delay, fire_tx));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let pump = tokio::spawn(event_pump(
            raw_rx,
            shutdown_rx.clone(),
            Arc::clone(&self.debouncer),
            Arc::clone(&self.rules),
            Arc::clone(&batches),
        ));

        let executor = Arc::new(Executor {
            config: self.config.clone(),
            locks: Arc::clone(&self.locks),
            event_tx: self.event_tx.clone(),
            dropped: Arc::clone(&self.dropped),
        });
        let executor_loop = tokio::spawn(executor_loop(
            fire_rx,
            shutdown_rx,
            executor,
            Arc::clone(&batches),
        ));

        self.running = Some(Running {
            shutdown_tx,
            batches,
            pump,
            executor_loop,
        });
        *self.state.lock() = EngineState::Running;
        tracing::info!("Sync engine started");
        Ok(())
    }

    /// Stop watching: pending batch timers are cancelled, in-flight
    /// target rewrites complete, then the worker tasks exit.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        *self.state.lock() = EngineState::Stopping;
        tracing::info!("Sync engine stopping");

        let _ = running.shutdown_tx.send(true);
        running.batches.cancel_all();
        *self.watcher.lock() = None;
        self.watched_dirs.lock().clear();

        let drain = async {
            let _ = running.pump.await;
            let _ = running.executor_loop.await;
        };
        match self.config.shutdown_deadline {
            Some(deadline) => {
                if tokio::time::timeout(deadline, drain).await.is_err() {
                    tracing::warn!("Shutdown deadline elapsed with batches in flight");
                }
            }
            None => drain.await,
        }

        *self.state.lock() = EngineState::Stopped;
        tracing::info!("Sync engine stopped");
    }

    /// Watch the parent directory of every enabled rule's source file,
    /// non-recursively. Failures are logged; the engine keeps running
    /// with whatever watches succeeded.
    fn register_watches(&self) {
        let mut guard = self.watcher.lock();
        let Some(watcher) = guard.as_mut() else {
            return;
        };

        let rules = self.rules.read();
        let mut watched = self.watched_dirs.lock();
        for rule in rules.iter().filter(|rule| rule.enabled) {
            let source = canonical(&rule.source_file);
            let Some(dir) = source.parent().map(Path::to_path_buf) else {
                continue;
            };
            if watched.contains(&dir) {
                continue;
            }
            match watcher.watch(&dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    tracing::info!(
                        dir = %dir.display(),
                        source = %source.display(),
                        "Watching directory"
                    );
                    watched.insert(dir);
                }
                Err(err) => {
                    tracing::error!(
                        dir = %dir.display(),
                        error = %err,
                        "Failed to watch directory"
                    );
                }
            }
        }
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Debounce, match, and batch raw filesystem events. Performs no file
/// IO.
async fn event_pump(
    mut raw_rx: mpsc::Receiver<PathBuf>,
    mut shutdown_rx: watch::Receiver<bool>,
    debouncer: Arc<Debouncer>,
    rules: Arc<RwLock<Vec<SyncRule>>>,
    batches: Arc<BatchQueue>,
) {
    tracing::debug!("Event pump started");
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            received = raw_rx.recv() => {
                let Some(path) = received else { break };
                handle_event(&path, &debouncer, &rules, &batches);
            }
        }
    }
    tracing::debug!("Event pump exited");
}

fn handle_event(
    path: &Path,
    debouncer: &Debouncer,
    rules: &RwLock<Vec<SyncRule>>,
    batches: &BatchQueue,
) {
    let event_path = canonical(path);

    if !debouncer.accept(&event_path) {
        // Still part of the burst: keep the pending batch open so the
        // flush lands after the last write.
        if batches.touch(&event_path) {
            tracing::debug!(
                path = %event_path.display(),
                "Debounced event extended pending batch"
            );
        }
        return;
    }

    tracing::debug!(path = %event_path.display(), "Received file event");

    let matched = {
        let rules = rules.read();
        matching_rules(&rules, &event_path)
    };
    if matched.is_empty() {
        return;
    }

    tracing::debug!(
        path = %event_path.display(),
        rules = matched.len(),
        "Matched rules for source file"
    );
    batches.push(event_path, matched);
}

/// Claim fired batches and execute them, concurrently across source
/// files. On shutdown, in-flight batches drain before exit.
async fn executor_loop(
    mut fire_rx: mpsc::Receiver<PathBuf>,
    mut shutdown_rx: watch::Receiver<bool>,
    executor: Arc<Executor>,
    batches: Arc<BatchQueue>,
) {
    tracing::debug!("Batch executor started");
    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            fired = fire_rx.recv() => {
                let Some(source) = fired else { break };
                if let Some(batch) = batches.take(&source) {
                    let executor = Arc::clone(&executor);
                    in_flight.spawn(async move { executor.execute(batch).await });
                }
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }
    while in_flight.join_next().await.is_some() {}
    tracing::debug!("Batch executor exited");
}
