//! Batch execution: load once, resolve per rule, rewrite per target.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::mpsc;

use super::engine::EngineConfig;
use super::{canonical, Batch, TargetLocks};
use crate::error::{Error, LoadError, Result};
use crate::keypath::KeyPath;
use crate::model::{FileFormat, SyncEvent, SyncRule};
use crate::rewrite::{self, Updates};
use crate::tree::{self, Value};

/// Executes flushed batches. Shared by all executor tasks; owns no
/// per-batch state.
pub(super) struct Executor {
    pub(super) config: EngineConfig,
    pub(super) locks: Arc<TargetLocks>,
    pub(super) event_tx: mpsc::Sender<SyncEvent>,
    pub(super) dropped: Arc<AtomicU64>,
}

impl Executor {
    /// Run one batch to completion, emitting exactly one event per
    /// rule.
    pub(super) async fn execute(&self, batch: Batch) {
        tracing::debug!(
            source = %batch.source.display(),
            rules = batch.rules.len(),
            "Processing batch"
        );

        let source_tree = match self.load_source_with_retry(&batch.source).await {
            Ok(tree) => tree,
            Err(err) => {
                tracing::error!(
                    source = %batch.source.display(),
                    error = %err,
                    "Failed to load source file"
                );
                for rule in &batch.rules {
                    self.emit(SyncEvent::failure(
                        &rule.id,
                        format!("failed to load source file: {err}"),
                    ));
                }
                return;
            }
        };

        // Resolve each rule's source value; rule failures never abort
        // the batch.
        let mut resolved: Vec<(SyncRule, Value)> = Vec::new();
        for rule in batch.rules {
            match read_source_value(&source_tree, &rule) {
                Ok(value) => resolved.push((rule, value)),
                Err(err) => self.emit(SyncEvent::failure(
                    &rule.id,
                    format!("failed to get source value: {err}"),
                )),
            }
        }

        // Group rules by canonical target path for serialized writes.
        let mut groups: IndexMap<std::path::PathBuf, Vec<(SyncRule, Value)>> = IndexMap::new();
        for (rule, value) in resolved {
            groups
                .entry(canonical(&rule.target_file))
                .or_default()
                .push((rule, value));
        }

        for (target, entries) in groups {
            self.process_target_group(&target, entries).await;
        }
    }

    /// Editors often replace files non-atomically; retry briefly on a
    /// torn read.
    async fn load_source_with_retry(&self, source: &Path) -> Result<Value> {
        let mut last_err = Error::internal("no load attempts made");
        for attempt in 0..self.config.load_retries {
            match tree::load_file(source) {
                Ok(tree) => return Ok(tree),
                Err(err) => {
                    last_err = err;
                    if attempt + 1 < self.config.load_retries {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }
        Err(last_err)
    }

    /// Apply all of one target's updates under its mutex.
    async fn process_target_group(&self, target: &Path, entries: Vec<(SyncRule, Value)>) {
        let lock = self.locks.lock_for(target);
        let _guard = lock.lock().await;

        tracing::debug!(
            target = %target.display(),
            rules = entries.len(),
            "Processing target group"
        );

        let format = FileFormat::detect(target);
        let content = match tokio::fs::read_to_string(target).await {
            Ok(content) => content,
            Err(err) => {
                let load_err = LoadError::new(target, format, &err);
                for (rule, _) in &entries {
                    self.emit(SyncEvent::failure(
                        &rule.id,
                        format!("failed to load target file: {load_err}"),
                    ));
                }
                return;
            }
        };

        // Best-effort tree for old values and target-path validation;
        // the rewrite itself works on the original bytes.
        let target_tree = tree::parse_str(format, &content).ok();

        let mut updates: Updates = IndexMap::new();
        let mut pending: Vec<(SyncRule, Value, Value)> = Vec::new();
        for (rule, new_value) in entries {
            let path = match KeyPath::parse(&rule.target_key) {
                Ok(path) => path,
                Err(err) => {
                    self.emit(SyncEvent::failure(
                        &rule.id,
                        format!("invalid target key '{}': {err}", rule.target_key),
                    ));
                    continue;
                }
            };

            if let Some(tree) = &target_tree {
                if let Err(err) = tree::validate_path(tree, &path) {
                    self.emit(SyncEvent::failure(&rule.id, err.to_string()));
                    continue;
                }
            }

            let old_value = target_tree
                .as_ref()
                .and_then(|tree| tree::get(tree, &path).ok())
                .cloned()
                .unwrap_or_default();

            updates.insert(path.to_string(), new_value.clone());
            pending.push((rule, old_value, new_value));
        }

        if updates.is_empty() {
            return;
        }

        if !format.supports_surgical() {
            tracing::debug!(
                target = %target.display(),
                "Target format has no surgical rewrite; reformatting whole file"
            );
        }

        match rewrite::apply_updates(format, &content, &updates) {
            Ok(new_content) => match tokio::fs::write(target, new_content).await {
                Ok(()) => {
                    tracing::info!(
                        target = %target.display(),
                        updates = updates.len(),
                        "Applied updates to target file"
                    );
                    for (rule, old_value, new_value) in pending {
                        self.emit(SyncEvent::success(&rule.id, old_value, new_value));
                    }
                }
                Err(err) => {
                    tracing::error!(
                        target = %target.display(),
                        error = %err,
                        "Failed to write target file"
                    );
                    for (rule, _, _) in pending {
                        self.emit(SyncEvent::failure(
                            &rule.id,
                            format!("failed to write target file: {err}"),
                        ));
                    }
                }
            },
            Err(err) => {
                tracing::error!(
                    target = %target.display(),
                    error = %err,
                    "Failed to rewrite target file"
                );
                for (rule, _, _) in pending {
                    self.emit(SyncEvent::failure(
                        &rule.id,
                        format!("failed to update target file: {err}"),
                    ));
                }
            }
        }
    }

    /// Non-blocking event emission; a full channel drops the event in
    /// favor of keeping sync alive.
    pub(super) fn emit(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    rule = %event.rule_id,
                    "Event channel full, dropping sync event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

fn read_source_value(source_tree: &Value, rule: &SyncRule) -> Result<Value> {
    let path = KeyPath::parse(&rule.source_key)?;
    Ok(tree::get(source_tree, &path)?.clone())
}
