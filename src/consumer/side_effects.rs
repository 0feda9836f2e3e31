//! Downstream side effects of a transfer event

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::core_types::TransferId;
use crate::events::{CompletedTransfer, FailedTransfer};
use crate::ledger::LedgerStore;

/// Amounts above this are flagged for regulatory review
pub const HIGH_VALUE_THRESHOLD: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 2);

/// What becomes of a failed transfer after it has been recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Below the retry budget; an external re-submission may pick it up
    RetryEligible,
    PermanentlyFailed,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SideEffectError {
    #[error("Regulatory check failed: {0}")]
    Regulatory(String),

    #[error("Analytics update failed: {0}")]
    Analytics(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Failure recording failed: {0}")]
    Investigation(String),
}

/// The independent steps run for every event. A failing step fails the
/// whole dispatch; none of them share state.
#[async_trait]
pub trait SideEffects: Send + Sync {
    async fn regulatory_check(&self, event: &CompletedTransfer) -> Result<(), SideEffectError>;

    async fn update_analytics(&self, event: &CompletedTransfer) -> Result<(), SideEffectError>;

    async fn send_notification(&self, event: &CompletedTransfer) -> Result<(), SideEffectError>;

    async fn record_failure(
        &self,
        event: &FailedTransfer,
        disposition: FailureDisposition,
    ) -> Result<(), SideEffectError>;
}

/// Default side effects: structured log records, plus a look-up of the
/// audit row when a ledger is attached.
#[derive(Default)]
pub struct LoggingSideEffects {
    ledger: Option<Arc<dyn LedgerStore>>,
}

impl LoggingSideEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            ledger: Some(ledger),
        }
    }

    /// Ledger trouble is logged, never fatal to the event
    async fn confirm_ledger_row(&self, transfer_id: TransferId) {
        let Some(ledger) = &self.ledger else {
            return;
        };
        match ledger.get_transaction(transfer_id).await {
            Ok(Some(record)) => {
                info!(transfer_id = %transfer_id, status = %record.status, "Found transaction in ledger")
            }
            Ok(None) => warn!(transfer_id = %transfer_id, "Transaction not found in ledger"),
            Err(e) => warn!(transfer_id = %transfer_id, error = %e, "Ledger lookup failed"),
        }
    }
}

#[async_trait]
impl SideEffects for LoggingSideEffects {
    async fn regulatory_check(&self, event: &CompletedTransfer) -> Result<(), SideEffectError> {
        if event.amount > HIGH_VALUE_THRESHOLD {
            info!(
                transfer_id = %event.transaction_id,
                amount = %event.amount,
                currency = %event.currency,
                "High-value transaction detected"
            );
        }
        debug!(transfer_id = %event.transaction_id, "Regulatory reporting completed");
        Ok(())
    }

    async fn update_analytics(&self, event: &CompletedTransfer) -> Result<(), SideEffectError> {
        debug!(transfer_id = %event.transaction_id, "Analytics updated");
        Ok(())
    }

    async fn send_notification(&self, event: &CompletedTransfer) -> Result<(), SideEffectError> {
        debug!(
            transfer_id = %event.transaction_id,
            from_customer = event.from_account.customer.id,
            to_customer = event.to_account.customer.id,
            "Notifications sent"
        );
        self.confirm_ledger_row(event.transaction_id).await;
        Ok(())
    }

    async fn record_failure(
        &self,
        event: &FailedTransfer,
        disposition: FailureDisposition,
    ) -> Result<(), SideEffectError> {
        error!(
            transfer_id = %event.transaction_id,
            error = %event.error_message,
            retry_count = event.retry_count,
            "Transaction processing failed"
        );
        match disposition {
            FailureDisposition::RetryEligible => info!(
                transfer_id = %event.transaction_id,
                attempt = event.retry_count + 1,
                "Transaction eligible for retry"
            ),
            FailureDisposition::PermanentlyFailed => error!(
                transfer_id = %event.transaction_id,
                "Transaction exceeded max retries, marked permanently failed"
            ),
        }
        self.confirm_ledger_row(event.transaction_id).await;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every call; individual steps can be switched to fail
    #[derive(Default)]
    pub(crate) struct RecordingSideEffects {
        pub calls: Mutex<Vec<String>>,
        pub failures: Mutex<Vec<(TransferId, FailureDisposition)>>,
        pub fail_step: Mutex<Option<&'static str>>,
        pub fail_id: Mutex<Option<TransferId>>,
    }

    impl RecordingSideEffects {
        pub fn fail_on(&self, step: &'static str) {
            *self.fail_step.lock().unwrap() = Some(step);
        }

        /// Fail every step for one transfer
        pub fn fail_for(&self, id: TransferId) {
            *self.fail_id.lock().unwrap() = Some(id);
        }

        pub fn heal(&self) {
            *self.fail_step.lock().unwrap() = None;
            *self.fail_id.lock().unwrap() = None;
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, step: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(step)).count()
        }

        fn call(&self, step: &'static str, id: TransferId) -> Result<(), SideEffectError> {
            self.calls.lock().unwrap().push(format!("{}:{}", step, id));
            if *self.fail_step.lock().unwrap() == Some(step)
                || *self.fail_id.lock().unwrap() == Some(id)
            {
                return Err(SideEffectError::Notification(format!("{} down", step)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SideEffects for RecordingSideEffects {
        async fn regulatory_check(&self, e: &CompletedTransfer) -> Result<(), SideEffectError> {
            self.call("regulatory", e.transaction_id)
        }

        async fn update_analytics(&self, e: &CompletedTransfer) -> Result<(), SideEffectError> {
            self.call("analytics", e.transaction_id)
        }

        async fn send_notification(&self, e: &CompletedTransfer) -> Result<(), SideEffectError> {
            self.call("notification", e.transaction_id)
        }

        async fn record_failure(
            &self,
            e: &FailedTransfer,
            disposition: FailureDisposition,
        ) -> Result<(), SideEffectError> {
            self.call("failure", e.transaction_id)?;
            self.failures
                .lock()
                .unwrap()
                .push((e.transaction_id, disposition));
            Ok(())
        }
    }

    #[test]
    fn test_high_value_threshold() {
        assert_eq!(HIGH_VALUE_THRESHOLD.to_string(), "10000.00");
    }

    #[tokio::test]
    async fn test_logging_side_effects_never_fail_without_ledger() {
        use crate::events::TransferEvent;
        use crate::events::types::tests::sample_payload;

        let TransferEvent::Transaction(event) = TransferEvent::from_value(sample_payload()).unwrap()
        else {
            panic!("expected completed event");
        };
        let effects = LoggingSideEffects::new();
        effects.regulatory_check(&event).await.unwrap();
        effects.update_analytics(&event).await.unwrap();
        effects.send_notification(&event).await.unwrap();

        let failed = FailedTransfer::from_completed(&event, "boom").unwrap();
        effects
            .record_failure(&failed, FailureDisposition::PermanentlyFailed)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_logging_side_effects_tolerate_missing_ledger_row() {
        use crate::events::TransferEvent;
        use crate::events::types::tests::sample_payload;
        use crate::ledger::MemoryLedger;

        let TransferEvent::Transaction(event) = TransferEvent::from_value(sample_payload()).unwrap()
        else {
            panic!("expected completed event");
        };
        let effects = LoggingSideEffects::with_ledger(Arc::new(MemoryLedger::new()));
        assert!(effects.send_notification(&event).await.is_ok());
    }
}
