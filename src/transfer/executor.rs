//! Transfer Executor
//!
//! Runs one money movement from request to terminal phase. The balance
//! writes, the audit row and the outbox row for the completed event share a
//! single ledger commit; publication happens strictly after it and can never
//! unwind it.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use super::error::{ErrorKind, TransferError};
use super::id::TransferIdSource;
use super::state::TransferPhase;
use super::types::{TransferReceipt, TransferRequest, ValidatedShape};
use crate::account::{Account, AccountGuard, Customer};
use crate::config::TransferConfig;
use crate::core_types::{AccountId, TransferId};
use crate::events::{CompletedTransfer, EventPublisher, FailedTransfer, TransferEvent};
use crate::ledger::{
    LedgerError, LedgerStore, LedgerTx, NewOutboxEntry, TransactionRecord, TransactionStatus,
};

/// Error annotation on the failed event raised when the post-commit publish
/// is lost
const PUBLISH_FAILED_MESSAGE: &str = "Transaction committed but completed event was not delivered";

/// Work done inside the ledger transaction, ready to commit
struct Staged {
    record: TransactionRecord,
    completed: CompletedTransfer,
    payload: String,
    outbox_id: i64,
}

/// State carried into compensation once the audit row is flushed
struct Flushed {
    record: TransactionRecord,
    from_owner: Customer,
    to_owner: Customer,
}

pub struct TransferExecutor {
    ledger: Arc<dyn LedgerStore>,
    publisher: EventPublisher,
    ids: Arc<dyn TransferIdSource>,
    config: TransferConfig,
}

impl TransferExecutor {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        publisher: EventPublisher,
        ids: Arc<dyn TransferIdSource>,
        config: TransferConfig,
    ) -> Self {
        Self {
            ledger,
            publisher,
            ids,
            config,
        }
    }

    /// Execute one transfer.
    ///
    /// `Ok` means the ledger commit succeeded; the receipt's `phase` tells
    /// whether the completed event reached the broker as well.
    pub async fn execute(&self, req: TransferRequest) -> Result<TransferReceipt, TransferError> {
        let shape = req
            .validate_shape(self.config.max_transfer_amount, &self.config.default_currency)
            .inspect_err(|e| {
                warn!(
                    from = req.from_account_id,
                    to = req.to_account_id,
                    error = %e,
                    "Transfer rejected"
                );
            })?;

        info!(
            from = req.from_account_id,
            to = req.to_account_id,
            amount = %shape.amount,
            currency = %shape.currency,
            "Processing transfer"
        );

        let mut phase = TransferPhase::Initiated;
        let mut flushed: Option<Flushed> = None;

        let mut tx = match self.ledger.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                error!(error = %e, "Failed to open ledger transaction");
                return Err(e.into());
            }
        };

        let staged = match self
            .stage(tx.as_mut(), &req, &shape, &mut phase, &mut flushed)
            .await
        {
            Ok(staged) => staged,
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    warn!(error = %rb, "Rollback failed");
                }
                return Err(self.abort(phase, flushed, e).await);
            }
        };

        let transfer_id = staged.record.transfer_id;
        if let Err(e) = tx.commit().await {
            if !self.commit_landed(transfer_id, &e).await {
                return Err(self.abort(phase, flushed, e.into()).await);
            }
        }
        advance(&mut phase, TransferPhase::Committed);

        info!(
            transfer_id = %transfer_id,
            from = staged.record.from_account_id,
            to = staged.record.to_account_id,
            amount = %staged.record.amount,
            "Transfer committed"
        );

        let delivered = self
            .publisher
            .publish(&self.publisher.topics().completed, transfer_id, &staged.payload)
            .await;

        if delivered {
            if let Err(e) = self.ledger.mark_outbox_sent(staged.outbox_id).await {
                // The dispatcher resends it; consumers dedup by transfer id
                warn!(transfer_id = %transfer_id, error = %e, "Failed to mark outbox row sent");
            }
            advance(&mut phase, TransferPhase::Published);
        } else {
            advance(&mut phase, TransferPhase::CommitSucceededPublishFailed);
            warn!(
                transfer_id = %transfer_id,
                outbox_id = staged.outbox_id,
                "Completed event not delivered, left in outbox"
            );
            if self.config.report_publish_failures {
                self.report_publish_failure(&staged.completed).await;
            }
        }

        Ok(TransferReceipt::from_record(&staged.record, phase))
    }

    /// Everything between `begin` and `commit`
    async fn stage(
        &self,
        tx: &mut dyn LedgerTx,
        req: &TransferRequest,
        shape: &ValidatedShape,
        phase: &mut TransferPhase,
        flushed: &mut Option<Flushed>,
    ) -> Result<Staged, TransferError> {
        let amount = shape.amount;
        let (mut from, mut to) =
            lock_pair(tx, req.from_account_id, req.to_account_id, amount).await?;

        for account in [&from, &to] {
            if account.currency != shape.currency {
                return Err(TransferError::CurrencyMismatch {
                    account_id: account.id,
                    expected: shape.currency.clone(),
                    actual: account.currency.clone(),
                });
            }
        }
        AccountGuard::check_daily_ceiling(&from, amount)?;

        let from_owner = owner(tx, &from).await?;
        let to_owner = owner(tx, &to).await?;
        advance(phase, TransferPhase::Validated);

        let mut record = TransactionRecord {
            id: None,
            transfer_id: self.ids.next_id(),
            from_account_id: from.id,
            to_account_id: to.id,
            from_balance_before: from.balance,
            from_balance_after: from.balance - amount,
            to_balance_before: to.balance,
            to_balance_after: to.balance + amount,
            amount,
            currency: shape.currency.clone(),
            description: req.description.clone(),
            status: TransactionStatus::Pending,
            processed_by: self.config.processed_by.clone(),
            source: self.config.source.clone(),
            error_message: None,
            timestamp: Utc::now(),
        };
        record.id = Some(self.insert_with_fresh_id(tx, &mut record).await?);
        *flushed = Some(Flushed {
            record: record.clone(),
            from_owner: from_owner.clone(),
            to_owner: to_owner.clone(),
        });

        AccountGuard::apply_balance(tx, &mut from, record.from_balance_after).await?;
        AccountGuard::apply_balance(tx, &mut to, record.to_balance_after).await?;
        advance(phase, TransferPhase::BalancesApplied);

        tx.set_status(record.transfer_id, TransactionStatus::Completed)
            .await?;
        record.status = TransactionStatus::Completed;

        let completed = CompletedTransfer::from_record(&record, &from_owner, &to_owner);
        let payload = TransferEvent::Transaction(completed.clone()).to_payload()?;
        let outbox_id = tx
            .enqueue_outbox(&NewOutboxEntry {
                transfer_id: record.transfer_id,
                topic: self.publisher.topics().completed.clone(),
                payload: payload.clone(),
            })
            .await?;

        Ok(Staged {
            record,
            completed,
            payload,
            outbox_id,
        })
    }

    /// Insert the pending audit row, drawing a new identifier on collision
    async fn insert_with_fresh_id(
        &self,
        tx: &mut dyn LedgerTx,
        record: &mut TransactionRecord,
    ) -> Result<i64, TransferError> {
        let attempts = self.config.max_id_attempts.max(1);
        for attempt in 1..=attempts {
            match tx.insert_transaction(record).await {
                Ok(row_id) => return Ok(row_id),
                Err(LedgerError::DuplicateTransferId(taken)) => {
                    warn!(transfer_id = %taken, attempt, "Transfer identifier collision");
                    record.transfer_id = self.ids.next_id();
                }
                Err(e) => return Err(e.into()),
            }
        }
        error!(attempts, "Could not allocate a transfer identifier");
        Err(TransferError::IdExhausted(attempts))
    }

    /// A commit error does not prove the commit failed: the server may have
    /// applied it before the connection dropped. Read the audit row back
    /// before compensating, or a landed transfer gets a failed twin.
    async fn commit_landed(&self, transfer_id: TransferId, err: &LedgerError) -> bool {
        match self.ledger.get_transaction(transfer_id).await {
            Ok(Some(record)) if record.status == TransactionStatus::Completed => {
                warn!(
                    transfer_id = %transfer_id,
                    error = %err,
                    "Commit reported an error but the transfer is recorded as completed"
                );
                true
            }
            Ok(_) => false,
            Err(lookup) => {
                // Unknown outcome; compensation still runs and the duplicate
                // transfer id check stops a second row if the commit landed
                error!(
                    transfer_id = %transfer_id,
                    error = %err,
                    lookup_error = %lookup,
                    "Could not verify commit outcome"
                );
                false
            }
        }
    }

    /// Terminal failure before commit. The unit of work is already rolled
    /// back; a flushed audit row is re-recorded as failed on its own commit.
    async fn abort(
        &self,
        mut phase: TransferPhase,
        flushed: Option<Flushed>,
        err: TransferError,
    ) -> TransferError {
        advance(&mut phase, TransferPhase::Aborted);

        match err.kind() {
            ErrorKind::Persistence => error!(error = %err, "Transfer aborted"),
            _ => warn!(error = %err, "Transfer aborted"),
        }

        let Some(flushed) = flushed else {
            return err;
        };
        self.record_failure(flushed, &err).await;
        err
    }

    async fn record_failure(&self, flushed: Flushed, err: &TransferError) {
        let Flushed {
            mut record,
            from_owner,
            to_owner,
        } = flushed;
        record.id = None;
        record.status = TransactionStatus::Failed;
        record.error_message = Some(err.to_string());
        let transfer_id = record.transfer_id;

        let original = CompletedTransfer::from_record(&record, &from_owner, &to_owner);
        let payload = match FailedTransfer::from_completed(&original, err.to_string())
            .and_then(|failed| TransferEvent::FailedTransaction(failed).to_payload())
        {
            Ok(payload) => payload,
            Err(e) => {
                error!(transfer_id = %transfer_id, error = %e, "Failed to encode failed event");
                return;
            }
        };

        let entry = NewOutboxEntry {
            transfer_id,
            topic: self.publisher.topics().failed.clone(),
            payload,
        };
        let outbox_id = match self.ledger.record_failed(&record, &entry).await {
            Ok(id) => id,
            Err(e) => {
                error!(transfer_id = %transfer_id, error = %e, "Failed to record failed transfer");
                return;
            }
        };
        info!(transfer_id = %transfer_id, "Recorded failed transfer");

        if self
            .publisher
            .publish(&entry.topic, transfer_id, &entry.payload)
            .await
            && let Err(e) = self.ledger.mark_outbox_sent(outbox_id).await
        {
            warn!(transfer_id = %transfer_id, error = %e, "Failed to mark outbox row sent");
        }
    }

    /// Operator channel for a committed transfer whose event was lost
    async fn report_publish_failure(&self, completed: &CompletedTransfer) {
        match FailedTransfer::from_completed(completed, PUBLISH_FAILED_MESSAGE) {
            Ok(failed) => {
                self.publisher.publish_failed(&failed).await;
            }
            Err(e) => error!(
                transfer_id = %completed.transaction_id,
                error = %e,
                "Failed to encode publish-failure event"
            ),
        }
    }
}

/// Lock both accounts in ascending id order so two opposite transfers
/// between the same pair cannot deadlock.
async fn lock_pair(
    tx: &mut dyn LedgerTx,
    from_id: AccountId,
    to_id: AccountId,
    amount: Decimal,
) -> Result<(Account, Account), TransferError> {
    if from_id < to_id {
        let from = AccountGuard::validate_for_transfer(tx, from_id, Some(amount)).await?;
        let to = AccountGuard::validate_for_transfer(tx, to_id, None).await?;
        Ok((from, to))
    } else {
        let to = AccountGuard::validate_for_transfer(tx, to_id, None).await?;
        let from = AccountGuard::validate_for_transfer(tx, from_id, Some(amount)).await?;
        Ok((from, to))
    }
}

async fn owner(tx: &mut dyn LedgerTx, account: &Account) -> Result<Customer, TransferError> {
    tx.customer(account.customer_id).await?.ok_or_else(|| {
        TransferError::DatabaseError(format!(
            "Customer {} of account {} not found",
            account.customer_id, account.id
        ))
    })
}

fn advance(phase: &mut TransferPhase, next: TransferPhase) {
    debug_assert!(phase.can_advance_to(next), "{} -> {}", phase, next);
    debug!(from = %phase, to = %next, "Transfer phase");
    *phase = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountClass, AccountStatus, CustomerType};
    use crate::broker::MemoryBroker;
    use crate::config::TopicConfig;
    use crate::core_types::TransferId;
    use crate::ledger::{LedgerFault, MemoryLedger};
    use std::collections::VecDeque;
    use std::str::FromStr;
    use std::sync::Mutex;

    /// Hands out a fixed sequence of identifiers
    struct ScriptedIds(Mutex<VecDeque<i64>>);

    impl ScriptedIds {
        fn new(ids: &[i64]) -> Arc<Self> {
            Arc::new(Self(Mutex::new(ids.iter().copied().collect())))
        }
    }

    impl TransferIdSource for ScriptedIds {
        fn next_id(&self) -> TransferId {
            TransferId::new(self.0.lock().unwrap().pop_front().unwrap_or(999_999))
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn customer(id: i64, customer_type: CustomerType) -> Customer {
        Customer {
            id,
            name: format!("Customer {}", id),
            customer_type,
            personal_id: (customer_type == CustomerType::Individual).then(|| "123456789".into()),
            business_number: (customer_type == CustomerType::Business).then(|| "514000000".into()),
            vip_tier: None,
        }
    }

    fn account(id: i64, owner: i64, class: AccountClass, balance: &str) -> Account {
        Account {
            id,
            customer_id: owner,
            account_number: format!("ACC-{}", id),
            class,
            currency: "ILS".to_string(),
            balance: dec(balance),
            status: AccountStatus::Active,
        }
    }

    struct Fixture {
        ledger: MemoryLedger,
        broker: MemoryBroker,
        executor: TransferExecutor,
    }

    async fn fixture_with(ids: Arc<dyn TransferIdSource>, config: TransferConfig) -> Fixture {
        let ledger = MemoryLedger::new();
        ledger.add_customer(customer(501, CustomerType::Individual)).await;
        ledger.add_customer(customer(502, CustomerType::Business)).await;
        ledger
            .add_account(account(1, 501, AccountClass::Checking, "1500.00"))
            .await;
        ledger
            .add_account(account(2, 502, AccountClass::Business, "8000.00"))
            .await;
        ledger
            .add_account(account(3, 501, AccountClass::Savings, "50.00"))
            .await;
        ledger
            .add_account(account(4, 502, AccountClass::Checking, "5000000.00"))
            .await;

        let broker = MemoryBroker::default();
        let publisher = EventPublisher::new(Arc::new(broker.clone()), TopicConfig::default());
        let executor = TransferExecutor::new(Arc::new(ledger.clone()), publisher, ids, config);
        Fixture {
            ledger,
            broker,
            executor,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(ScriptedIds::new(&[100, 101, 102]), TransferConfig::default()).await
    }

    #[tokio::test]
    async fn test_happy_path_moves_funds_and_publishes() {
        let f = fixture().await;
        let receipt = f
            .executor
            .execute(TransferRequest::new(1, 2, dec("300")).with_description("rent"))
            .await
            .unwrap();

        assert_eq!(receipt.transfer_id, TransferId::new(100));
        assert_eq!(receipt.amount, dec("300.00"));
        assert_eq!(receipt.status, TransactionStatus::Completed);
        assert_eq!(receipt.phase, TransferPhase::Published);
        assert_eq!(f.ledger.balance(1).await, Some(dec("1200.00")));
        assert_eq!(f.ledger.balance(2).await, Some(dec("8300.00")));

        let records = f.ledger.transactions().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].is_consistent());
        assert_eq!(records[0].status, TransactionStatus::Completed);
        assert_eq!(records[0].processed_by, "bank-core-service");

        let events = f.broker.json_messages("completedTransactions");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["event_type"], "transaction");
        assert_eq!(events[0]["transaction_id"], 100);
        assert_eq!(events[0]["from_account"]["balance_after"], 1200.0);
        assert_eq!(events[0]["to_account"]["customer"]["type"], "business");
        assert_eq!(events[0]["metadata"]["status"], "completed");

        assert!(f.ledger.outbox().await.iter().all(|e| e.sent_at.is_some()));
    }

    #[tokio::test]
    async fn test_reverse_direction_locks_in_id_order() {
        let f = fixture().await;
        let receipt = f
            .executor
            .execute(TransferRequest::new(2, 1, dec("8000")))
            .await
            .unwrap();
        assert_eq!(receipt.from_account_id, 2);
        assert_eq!(f.ledger.balance(2).await, Some(dec("0.00")));
        assert_eq!(f.ledger.balance(1).await, Some(dec("9500.00")));
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balances() {
        let f = fixture().await;
        let err = f
            .executor
            .execute(TransferRequest::new(3, 2, dec("100")))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransferError::InsufficientFunds {
                account_id: 3,
                balance: dec("50.00"),
                required: dec("100.00"),
            }
        );
        assert_eq!(f.ledger.balance(3).await, Some(dec("50.00")));
        assert_eq!(f.ledger.balance(2).await, Some(dec("8000.00")));
        assert!(f.ledger.transactions().await.is_empty());
        assert!(f.broker.messages("completedTransactions").is_empty());
    }

    #[tokio::test]
    async fn test_ceiling_exceeded_names_limit_and_class() {
        let f = fixture().await;
        let err = f
            .executor
            .execute(TransferRequest::new(4, 2, dec("2000000")))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransferError::CeilingExceeded {
                amount: dec("2000000.00"),
                limit: dec("100000.00"),
                class: AccountClass::Checking,
            }
        );
        assert_eq!(f.ledger.balance(4).await, Some(dec("5000000.00")));
        assert!(f.ledger.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_currency_mismatch() {
        let f = fixture().await;
        let err = f
            .executor
            .execute(TransferRequest::new(1, 2, dec("10")).with_currency("USD"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransferError::CurrencyMismatch { account_id: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_and_inactive_accounts() {
        let f = fixture().await;
        let err = f
            .executor
            .execute(TransferRequest::new(1, 77, dec("10")))
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::AccountNotFound(77));

        let mut frozen = account(5, 501, AccountClass::Checking, "100.00");
        frozen.status = AccountStatus::Frozen;
        f.ledger.add_account(frozen).await;
        let err = f
            .executor
            .execute(TransferRequest::new(5, 1, dec("10")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INACTIVE_ACCOUNT");
    }

    #[tokio::test]
    async fn test_request_shape_never_opens_transaction() {
        let f = fixture().await;
        f.ledger.inject_fault(LedgerFault::Unavailable).await;
        let err = f
            .executor
            .execute(TransferRequest::new(1, 1, dec("10")))
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::SameAccount);
    }

    #[tokio::test]
    async fn test_id_collision_draws_new_identifier() {
        let f = fixture_with(ScriptedIds::new(&[100, 100, 101]), TransferConfig::default()).await;
        f.executor
            .execute(TransferRequest::new(1, 2, dec("10")))
            .await
            .unwrap();
        let second = f
            .executor
            .execute(TransferRequest::new(1, 2, dec("10")))
            .await
            .unwrap();
        assert_eq!(second.transfer_id, TransferId::new(101));
        assert_eq!(f.ledger.balance(1).await, Some(dec("1480.00")));
    }

    #[tokio::test]
    async fn test_id_exhaustion() {
        let config = TransferConfig {
            max_id_attempts: 2,
            ..TransferConfig::default()
        };
        let f = fixture_with(ScriptedIds::new(&[7, 7, 7, 7]), config).await;
        f.executor
            .execute(TransferRequest::new(1, 2, dec("10")))
            .await
            .unwrap();
        let err = f
            .executor
            .execute(TransferRequest::new(1, 2, dec("10")))
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::IdExhausted(2));
        assert_eq!(f.ledger.transactions().await.len(), 1);
        assert_eq!(f.ledger.balance(1).await, Some(dec("1490.00")));
    }

    #[tokio::test]
    async fn test_failure_after_flush_records_failed_row() {
        let f = fixture().await;
        f.ledger.inject_fault(LedgerFault::WriteBalance).await;

        let err = f
            .executor
            .execute(TransferRequest::new(1, 2, dec("300")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);

        assert_eq!(f.ledger.balance(1).await, Some(dec("1500.00")));
        assert_eq!(f.ledger.balance(2).await, Some(dec("8000.00")));

        let records = f.ledger.transactions().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, TransactionStatus::Failed);
        assert!(records[0].error_message.as_deref().unwrap().contains("injected fault"));

        let failed = f.broker.json_messages("failedTransactions");
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0]["event_type"], "failed_transaction");
        assert_eq!(failed[0]["retry_count"], 0);
        assert_eq!(failed[0]["original_event"]["transaction_id"], 100);
        assert!(f.broker.messages("completedTransactions").is_empty());
    }

    #[tokio::test]
    async fn test_commit_failure_compensates() {
        let f = fixture().await;
        f.ledger.inject_fault(LedgerFault::Commit).await;
        let err = f
            .executor
            .execute(TransferRequest::new(1, 2, dec("300")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(f.ledger.balance(1).await, Some(dec("1500.00")));
        let records = f.ledger.transactions().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_lost_commit_ack_is_not_compensated() {
        let f = fixture().await;
        f.ledger.inject_fault(LedgerFault::CommitAckLost).await;
        let receipt = f
            .executor
            .execute(TransferRequest::new(1, 2, dec("300")))
            .await
            .unwrap();
        assert_eq!(receipt.status, TransactionStatus::Completed);
        assert_eq!(receipt.phase, TransferPhase::Published);
        assert_eq!(f.ledger.balance(1).await, Some(dec("1200.00")));
        assert_eq!(f.ledger.balance(2).await, Some(dec("8300.00")));

        let records = f.ledger.transactions().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, TransactionStatus::Completed);
        assert!(f.broker.messages("failedTransactions").is_empty());
        assert_eq!(f.broker.messages("completedTransactions").len(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_commit() {
        let f = fixture().await;
        f.broker.set_fail_sends(true);

        let receipt = f
            .executor
            .execute(TransferRequest::new(1, 2, dec("300")))
            .await
            .unwrap();
        assert_eq!(receipt.phase, TransferPhase::CommitSucceededPublishFailed);
        assert_eq!(receipt.status, TransactionStatus::Completed);
        assert_eq!(f.ledger.balance(1).await, Some(dec("1200.00")));

        let outbox = f.ledger.outbox().await;
        assert_eq!(outbox.len(), 1);
        assert!(outbox[0].sent_at.is_none());
        assert_eq!(outbox[0].topic, "completedTransactions");
    }

    #[tokio::test]
    async fn test_ledger_unavailable_surfaces_persistence_error() {
        let f = fixture().await;
        f.ledger.inject_fault(LedgerFault::Unavailable).await;
        let err = f
            .executor
            .execute(TransferRequest::new(1, 2, dec("10")))
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 500);
    }
}
