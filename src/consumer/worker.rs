//! Event Consumer Loop
//!
//! Single sequential poll-process-commit loop per instance. The offset of a
//! message is committed only when processing succeeded; a failed message is
//! re-published to the failed topic with its retry count incremented, and
//! left uncommitted so the broker can hand it out again.
//!
//! When the failed topic cannot take the message either, the consumer seeks
//! its partition back to it and skips the rest of that partition for the
//! batch. Nothing later on the partition is committed past it, and the next
//! poll starts from it again.

use std::time::Duration;

use rustc_hash::FxHashSet;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::processor::TransactionProcessor;
use crate::broker::{BrokerError, BrokerMessage, EventSource};
use crate::config::KafkaConfig;
use crate::events::{EventPublisher, FailedTransfer};

/// What happened to a message that could not be processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Sent to the failed topic with `retry_count + 1`
    Republished,
    /// Retry budget spent or no transfer id; logged and dropped
    DeadLettered,
    /// Failed topic unreachable; only the log keeps it
    Unrouted,
}

/// Per-batch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub received: usize,
    pub committed: usize,
    pub escalated: usize,
    /// Left for the next poll: the unrouted message and whatever followed it
    /// on its partition
    pub deferred: usize,
}

pub struct EventConsumer {
    /// `None` when the broker was unavailable at startup
    source: Option<Box<dyn EventSource>>,
    processor: TransactionProcessor,
    publisher: EventPublisher,
    batch_size: usize,
    poll_timeout: Duration,
    idle_interval: Duration,
}

impl EventConsumer {
    pub fn new(
        source: Option<Box<dyn EventSource>>,
        processor: TransactionProcessor,
        publisher: EventPublisher,
        config: &KafkaConfig,
    ) -> Self {
        Self {
            source,
            processor,
            publisher,
            batch_size: config.batch_size.max(1),
            poll_timeout: config.poll_timeout(),
            idle_interval: config.idle_interval(),
        }
    }

    /// Run until `shutdown` flips to true. Shutdown is observed between
    /// batches; a message in flight finishes first.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        if self.source.is_none() {
            warn!("Consumer not started - broker not available. Service will idle.");
            while !*shutdown.borrow() {
                tokio::select! {
                    _ = tokio::time::sleep(self.idle_interval) => {}
                    _ = shutdown.changed() => {}
                }
            }
            info!("Idle consumer stopped");
            return;
        }

        info!(batch_size = self.batch_size, "Starting message consumption");
        while !*shutdown.borrow() {
            let back_off = match self.poll_once().await {
                Ok(stats) => stats.deferred > 0,
                Err(e) => {
                    error!(error = %e, "Consumer poll failed");
                    true
                }
            };
            if back_off {
                tokio::select! {
                    _ = tokio::time::sleep(self.idle_interval) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
        info!("Message consumption stopped");
    }

    /// Pull and handle one bounded batch
    pub async fn poll_once(&mut self) -> Result<BatchStats, BrokerError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(BatchStats::default());
        };

        let batch = source.poll_batch(self.batch_size, self.poll_timeout).await?;
        let mut stats = BatchStats {
            received: batch.len(),
            ..BatchStats::default()
        };
        if !batch.is_empty() {
            debug!(count = batch.len(), "Received batch");
        }

        // Partitions rewound in this batch; their later messages wait
        let mut rewound: FxHashSet<i32> = FxHashSet::default();

        for message in &batch {
            if rewound.contains(&message.partition) {
                stats.deferred += 1;
                continue;
            }
            let outcome = self.processor.process(&message.payload).await;
            match outcome.reason() {
                None => {
                    if let Err(e) = source.commit(message).await {
                        // Uncommitted means redelivered; dedup absorbs it
                        warn!(
                            topic = %message.topic,
                            partition = message.partition,
                            offset = message.offset,
                            error = %e,
                            "Offset commit failed"
                        );
                    } else {
                        stats.committed += 1;
                    }
                }
                Some(reason) => {
                    let escalation =
                        escalate(&self.publisher, self.processor.max_retries(), message, reason)
                            .await;
                    stats.escalated += 1;
                    if escalation == Escalation::Unrouted {
                        source.seek(message).await?;
                        rewound.insert(message.partition);
                        stats.deferred += 1;
                        warn!(
                            topic = %message.topic,
                            partition = message.partition,
                            offset = message.offset,
                            "Partition rewound to unrouted message"
                        );
                    }
                }
            }
        }

        Ok(stats)
    }
}

/// Route an unprocessable message to the failed topic
pub async fn escalate(
    publisher: &EventPublisher,
    max_retries: u32,
    message: &BrokerMessage,
    reason: &str,
) -> Escalation {
    let raw: Value = serde_json::from_slice(&message.payload)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&message.payload).into_owned()));

    let Some(failed) = FailedTransfer::escalate(&raw, format!("Processing failed: {}", reason))
    else {
        error!(
            topic = %message.topic,
            partition = message.partition,
            offset = message.offset,
            reason,
            "Dead-lettered message without transaction id"
        );
        return Escalation::DeadLettered;
    };

    if failed.retry_count > max_retries {
        error!(
            transfer_id = %failed.transaction_id,
            retry_count = failed.retry_count,
            reason,
            "Retry budget exhausted, dead-lettered"
        );
        return Escalation::DeadLettered;
    }

    if publisher.publish_failed(&failed).await {
        warn!(
            transfer_id = %failed.transaction_id,
            retry_count = failed.retry_count,
            "Sent to failed topic"
        );
        Escalation::Republished
    } else {
        error!(
            transfer_id = %failed.transaction_id,
            reason,
            "Could not send to failed topic"
        );
        Escalation::Unrouted
    }
}
