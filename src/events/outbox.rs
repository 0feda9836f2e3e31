//! Outbox Dispatcher
//!
//! Background worker that publishes outbox rows the executor could not
//! deliver right after commit, and marks them sent.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::publisher::EventPublisher;
use crate::config::OutboxConfig;
use crate::ledger::{LedgerError, LedgerStore};

/// Outbox Dispatcher
///
/// Rows younger than `min_age` are skipped so the executor's own immediate
/// publish gets the first attempt. Delivery is at-least-once: a row published
/// but not yet marked sent goes out again, and the consumer's idempotency
/// check absorbs the duplicate.
pub struct OutboxDispatcher {
    ledger: Arc<dyn LedgerStore>,
    publisher: EventPublisher,
    scan_interval: Duration,
    min_age: Duration,
    batch_size: usize,
}

impl OutboxDispatcher {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        publisher: EventPublisher,
        config: &OutboxConfig,
    ) -> Self {
        Self {
            ledger,
            publisher,
            scan_interval: Duration::from_millis(config.scan_interval_ms),
            min_age: Duration::from_millis(config.min_age_ms),
            batch_size: config.batch_size,
        }
    }

    /// Run until `shutdown` flips to true
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            scan_interval_ms = self.scan_interval.as_millis() as u64,
            min_age_ms = self.min_age.as_millis() as u64,
            "Starting outbox dispatcher"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Err(e) = self.dispatch_once().await {
                error!(error = %e, "Outbox scan failed");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.scan_interval) => {}
                _ = shutdown.changed() => {}
            }
        }

        info!("Outbox dispatcher stopped");
    }

    /// Publish one batch of pending rows; returns how many were delivered
    pub async fn dispatch_once(&self) -> Result<usize, LedgerError> {
        if !self.publisher.is_enabled() {
            debug!("Broker not available, outbox scan skipped");
            return Ok(0);
        }

        let pending = self
            .ledger
            .pending_outbox(self.batch_size, self.min_age)
            .await?;

        if pending.is_empty() {
            debug!("No pending outbox rows");
            return Ok(0);
        }

        info!(count = pending.len(), "Found pending outbox rows");

        let mut delivered = 0;
        for entry in &pending {
            if !self
                .publisher
                .publish(&entry.topic, entry.transfer_id, &entry.payload)
                .await
            {
                warn!(
                    outbox_id = entry.id,
                    transfer_id = %entry.transfer_id,
                    "Outbox row still undeliverable, will retry next scan"
                );
                // Broker is likely down; the rest of the batch would fail too
                break;
            }
            self.ledger.mark_outbox_sent(entry.id).await?;
            delivered += 1;
        }

        if delivered > 0 {
            info!(count = delivered, "Delivered outbox rows this scan");
        }
        Ok(delivered)
    }
}
