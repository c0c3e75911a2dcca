//! Foreground sync service.
//!
//! Wires a [`SyncEngine`] to the loaded rules document, drains the
//! outcome channel into the log, and runs until Ctrl+C.

use tokio::sync::mpsc;

use crate::model::{RulesFile, SyncEvent};
use crate::watcher::SyncEngine;
use crate::Result;

/// The watch-mode service: one engine plus an event consumer.
pub struct SyncService {
    engine: SyncEngine,
    rule_count: usize,
}

impl SyncService {
    /// Build a service from a loaded rules document.
    #[must_use]
    pub fn new(document: &RulesFile) -> Self {
        let engine = SyncEngine::new();
        engine.set_rules(document.rules.clone());
        Self {
            engine,
            rule_count: document.rules.len(),
        }
    }

    /// Run until Ctrl+C, then drain and stop.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to start or the signal
    /// handler cannot be installed.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(rules = self.rule_count, "Starting sync service");

        let events = self.engine.events();
        self.engine.start().await?;

        let consumer = events.map(|rx| tokio::spawn(consume_events(rx)));

        tracing::info!("Sync service started. Press Ctrl+C to stop.");
        tokio::signal::ctrl_c().await?;

        tracing::info!("Shutting down sync service");
        self.engine.stop().await;
        if let Some(consumer) = consumer {
            consumer.abort();
        }

        let dropped = self.engine.dropped_events();
        if dropped > 0 {
            tracing::warn!(dropped, "Sync events were dropped during this run");
        }
        Ok(())
    }
}

/// The event sink: logs per-rule outcomes without ever blocking the
/// executor.
async fn consume_events(mut events: mpsc::Receiver<SyncEvent>) {
    while let Some(event) = events.recv().await {
        log_event(&event);
    }
}

fn log_event(event: &SyncEvent) {
    if event.success {
        tracing::info!(
            rule = %event.rule_id,
            old = %event.old_value,
            new = %event.new_value,
            "Sync successful"
        );
    } else {
        tracing::error!(
            rule = %event.rule_id,
            error = event.error.as_deref().unwrap_or("unknown"),
            "Sync failed"
        );
    }
}
