//! Transaction Processor
//!
//! Idempotency gate and side-effect dispatcher for one event. A key is
//! recorded as processed only after every step succeeded, so a failed
//! dispatch is retried in full on redelivery.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::dedup::DedupStore;
use super::side_effects::{FailureDisposition, SideEffectError, SideEffects};
use crate::events::{CompletedTransfer, FailedTransfer, TransferEvent};

/// Result of processing one message
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// Side effects ran and the key was recorded
    Processed,
    /// Seen before; nothing dispatched
    AlreadyProcessed,
    /// Undecodable payload, missing id or unknown event kind
    Rejected(String),
    /// Dispatch or dedup lookup failed
    Failed(String),
}

impl ProcessOutcome {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessOutcome::Processed | ProcessOutcome::AlreadyProcessed)
    }

    /// Failure reason carried to the failed topic
    pub fn reason(&self) -> Option<&str> {
        match self {
            ProcessOutcome::Rejected(r) | ProcessOutcome::Failed(r) => Some(r),
            _ => None,
        }
    }
}

pub struct TransactionProcessor {
    dedup: Arc<dyn DedupStore>,
    effects: Arc<dyn SideEffects>,
    max_retries: u32,
}

impl TransactionProcessor {
    pub fn new(dedup: Arc<dyn DedupStore>, effects: Arc<dyn SideEffects>, max_retries: u32) -> Self {
        Self {
            dedup,
            effects,
            max_retries,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decode and process a raw broker payload
    pub async fn process(&self, payload: &[u8]) -> ProcessOutcome {
        match TransferEvent::decode(payload) {
            Ok(event) => self.process_event(&event).await,
            Err(e) => {
                warn!(error = %e, "Rejected transfer event");
                ProcessOutcome::Rejected(e.to_string())
            }
        }
    }

    pub async fn process_event(&self, event: &TransferEvent) -> ProcessOutcome {
        let transfer_id = event.transfer_id();
        let key = event.dedup_key();

        match self.dedup.contains(&key).await {
            Ok(true) => {
                info!(transfer_id = %transfer_id, key = %key, "Event already processed, skipping");
                return ProcessOutcome::AlreadyProcessed;
            }
            Ok(false) => {}
            Err(e) => {
                error!(transfer_id = %transfer_id, error = %e, "Idempotency lookup failed");
                return ProcessOutcome::Failed(e.to_string());
            }
        }

        let dispatched = match event {
            TransferEvent::Transaction(completed) => self.dispatch_completed(completed).await,
            TransferEvent::FailedTransaction(failed) => self.dispatch_failed(failed).await,
        };
        if let Err(e) = dispatched {
            error!(
                transfer_id = %transfer_id,
                event_type = event.event_type(),
                error = %e,
                "Event dispatch failed"
            );
            return ProcessOutcome::Failed(e.to_string());
        }

        // Side effects already ran; failing here would only repeat them
        if let Err(e) = self.dedup.insert(&key).await {
            error!(transfer_id = %transfer_id, key = %key, error = %e, "Failed to record processed event");
        }

        info!(
            transfer_id = %transfer_id,
            event_type = event.event_type(),
            "Successfully processed event"
        );
        ProcessOutcome::Processed
    }

    async fn dispatch_completed(&self, event: &CompletedTransfer) -> Result<(), SideEffectError> {
        debug!(transfer_id = %event.transaction_id, amount = %event.amount, "Dispatching completed transfer");
        self.effects.regulatory_check(event).await?;
        self.effects.update_analytics(event).await?;
        self.effects.send_notification(event).await?;
        Ok(())
    }

    async fn dispatch_failed(&self, event: &FailedTransfer) -> Result<(), SideEffectError> {
        warn!(
            transfer_id = %event.transaction_id,
            error = %event.error_message,
            retry_count = event.retry_count,
            "Processing failed transaction"
        );
        self.effects
            .record_failure(event, self.disposition(event.retry_count))
            .await
    }

    pub fn disposition(&self, retry_count: u32) -> FailureDisposition {
        if retry_count < self.max_retries {
            FailureDisposition::RetryEligible
        } else {
            FailureDisposition::PermanentlyFailed
        }
    }
}
