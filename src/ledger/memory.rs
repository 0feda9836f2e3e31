//! In-memory ledger store
//!
//! Units of work are serialised through one async mutex: `begin` takes the
//! lock, writes go to a staged copy of the state, and `commit` swaps the copy
//! in. Dropping or rolling back a unit of work discards the copy. This gives
//! the same observable behaviour as row locks on the two accounts, only
//! coarser.
//!
//! Used by tests and by the binary when no database is configured.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    LedgerError, LedgerStore, LedgerTx, NewOutboxEntry, OutboxEntry, TransactionRecord,
    TransactionStatus,
};
use crate::account::{Account, Customer};
use crate::core_types::{AccountId, CustomerId, TransferId};

/// Failure switches for exercising compensation paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerFault {
    /// Every call fails as if the database were unreachable
    Unavailable,
    InsertTransaction,
    WriteBalance,
    SetStatus,
    EnqueueOutbox,
    Commit,
    /// Commit lands but the caller sees an error, as when the connection
    /// drops before the acknowledgement arrives
    CommitAckLost,
    RecordFailed,
}

#[derive(Debug, Clone, Default)]
struct LedgerState {
    accounts: BTreeMap<AccountId, Account>,
    customers: FxHashMap<CustomerId, Customer>,
    transactions: Vec<TransactionRecord>,
    outbox: Vec<OutboxEntry>,
    faults: FxHashSet<LedgerFault>,
}

impl LedgerState {
    fn check(&self, fault: LedgerFault) -> Result<(), LedgerError> {
        if self.faults.contains(&LedgerFault::Unavailable) {
            return Err(LedgerError::Database("connection refused".to_string()));
        }
        if self.faults.contains(&fault) {
            return Err(LedgerError::Database(format!("injected fault: {:?}", fault)));
        }
        Ok(())
    }

    fn position(&self, transfer_id: TransferId) -> Option<usize> {
        self.transactions.iter().position(|t| t.transfer_id == transfer_id)
    }

    fn push_transaction(&mut self, record: &TransactionRecord) -> Result<i64, LedgerError> {
        if self.position(record.transfer_id).is_some() {
            return Err(LedgerError::DuplicateTransferId(record.transfer_id));
        }
        let id = self.transactions.len() as i64 + 1;
        let mut stored = record.clone();
        stored.id = Some(id);
        self.transactions.push(stored);
        Ok(id)
    }

    fn push_outbox(&mut self, entry: &NewOutboxEntry) -> i64 {
        let id = self.outbox.len() as i64 + 1;
        self.outbox.push(OutboxEntry {
            id,
            transfer_id: entry.transfer_id,
            topic: entry.topic.clone(),
            payload: entry.payload.clone(),
            created_at: Utc::now(),
            sent_at: None,
        });
        id
    }
}

/// In-memory `LedgerStore`
#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_customer(&self, customer: Customer) {
        self.state.lock().await.customers.insert(customer.id, customer);
    }

    pub async fn add_account(&self, account: Account) {
        self.state.lock().await.accounts.insert(account.id, account);
    }

    pub async fn inject_fault(&self, fault: LedgerFault) {
        self.state.lock().await.faults.insert(fault);
    }

    pub async fn clear_faults(&self) {
        self.state.lock().await.faults.clear();
    }

    /// Committed audit records in insertion order
    pub async fn transactions(&self) -> Vec<TransactionRecord> {
        self.state.lock().await.transactions.clone()
    }

    /// All outbox rows, sent or not
    pub async fn outbox(&self) -> Vec<OutboxEntry> {
        self.state.lock().await.outbox.clone()
    }

    /// Committed balance of an account
    pub async fn balance(&self, id: AccountId) -> Option<Decimal> {
        self.state.lock().await.accounts.get(&id).map(|a| a.balance)
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<LedgerState>,
    staged: LedgerState,
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        self.staged.check(LedgerFault::Unavailable)?;
        Ok(self.staged.accounts.get(&id).cloned())
    }

    async fn customer(&mut self, id: CustomerId) -> Result<Option<Customer>, LedgerError> {
        self.staged.check(LedgerFault::Unavailable)?;
        Ok(self.staged.customers.get(&id).cloned())
    }

    async fn insert_transaction(&mut self, record: &TransactionRecord) -> Result<i64, LedgerError> {
        self.staged.check(LedgerFault::InsertTransaction)?;
        self.staged.push_transaction(record)
    }

    async fn write_balance(&mut self, id: AccountId, balance: Decimal) -> Result<(), LedgerError> {
        self.staged.check(LedgerFault::WriteBalance)?;
        if balance < Decimal::ZERO {
            return Err(LedgerError::NegativeBalance(id));
        }
        let account = self
            .staged
            .accounts
            .get_mut(&id)
            .ok_or_else(|| LedgerError::Database(format!("account {} vanished", id)))?;
        account.balance = balance;
        Ok(())
    }

    async fn set_status(
        &mut self,
        transfer_id: TransferId,
        status: TransactionStatus,
    ) -> Result<(), LedgerError> {
        self.staged.check(LedgerFault::SetStatus)?;
        let idx = self
            .staged
            .position(transfer_id)
            .ok_or(LedgerError::TransactionNotFound(transfer_id))?;
        let record = &mut self.staged.transactions[idx];
        if !record.status.can_transition_to(status) {
            return Err(LedgerError::InvalidTransition {
                transfer_id,
                from: record.status,
                to: status,
            });
        }
        record.status = status;
        Ok(())
    }

    async fn enqueue_outbox(&mut self, entry: &NewOutboxEntry) -> Result<i64, LedgerError> {
        self.staged.check(LedgerFault::EnqueueOutbox)?;
        Ok(self.staged.push_outbox(entry))
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        let MemoryTx { mut guard, staged } = *self;
        guard.check(LedgerFault::Commit)?;
        let ack_lost = guard.faults.contains(&LedgerFault::CommitAckLost);
        *guard = staged;
        if ack_lost {
            return Err(LedgerError::Database("connection reset after COMMIT".to_string()));
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        Ok(())
    }
}

fn page(records: Vec<TransactionRecord>, skip: i64, limit: i64) -> Vec<TransactionRecord> {
    records
        .into_iter()
        .skip(skip.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError> {
        let guard = self.state.clone().lock_owned().await;
        guard.check(LedgerFault::Unavailable)?;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn record_failed(
        &self,
        record: &TransactionRecord,
        outbox: &NewOutboxEntry,
    ) -> Result<i64, LedgerError> {
        let mut state = self.state.lock().await;
        state.check(LedgerFault::RecordFailed)?;
        let mut staged = state.clone();
        let mut failed = record.clone();
        failed.status = TransactionStatus::Failed;
        staged.push_transaction(&failed)?;
        let outbox_id = staged.push_outbox(outbox);
        *state = staged;
        Ok(outbox_id)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        let state = self.state.lock().await;
        state.check(LedgerFault::Unavailable)?;
        Ok(state.accounts.get(&id).cloned())
    }

    async fn get_transaction(
        &self,
        transfer_id: TransferId,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        let state = self.state.lock().await;
        state.check(LedgerFault::Unavailable)?;
        Ok(state
            .position(transfer_id)
            .map(|idx| state.transactions[idx].clone()))
    }

    async fn account_history(
        &self,
        account_id: AccountId,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let state = self.state.lock().await;
        state.check(LedgerFault::Unavailable)?;
        let matching = state
            .transactions
            .iter()
            .rev()
            .filter(|t| t.from_account_id == account_id || t.to_account_id == account_id)
            .cloned()
            .collect();
        Ok(page(matching, skip, limit))
    }

    async fn list_transactions(
        &self,
        status: Option<TransactionStatus>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let state = self.state.lock().await;
        state.check(LedgerFault::Unavailable)?;
        let matching = state
            .transactions
            .iter()
            .rev()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        Ok(page(matching, skip, limit))
    }

    async fn pending_outbox(
        &self,
        limit: usize,
        min_age: Duration,
    ) -> Result<Vec<OutboxEntry>, LedgerError> {
        let state = self.state.lock().await;
        state.check(LedgerFault::Unavailable)?;
        let cutoff = Utc::now() - chrono::Duration::from_std(min_age).unwrap_or_default();
        Ok(state
            .outbox
            .iter()
            .filter(|e| e.sent_at.is_none() && e.created_at <= cutoff)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_outbox_sent(&self, outbox_id: i64) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        state.check(LedgerFault::Unavailable)?;
        if let Some(entry) = state.outbox.iter_mut().find(|e| e.id == outbox_id) {
            entry.sent_at.get_or_insert_with(Utc::now);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), LedgerError> {
        self.state.lock().await.check(LedgerFault::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountClass, AccountStatus, CustomerType};

    fn account(id: AccountId, balance: i64) -> Account {
        Account {
            id,
            customer_id: 1,
            account_number: format!("ACC-{}", id),
            class: AccountClass::Checking,
            currency: "ILS".to_string(),
            balance: Decimal::new(balance * 100, 2),
            status: AccountStatus::Active,
        }
    }

    fn record(transfer_id: i64) -> TransactionRecord {
        TransactionRecord {
            id: None,
            transfer_id: TransferId::new(transfer_id),
            from_account_id: 1,
            to_account_id: 2,
            from_balance_before: Decimal::new(100_00, 2),
            from_balance_after: Decimal::new(90_00, 2),
            to_balance_before: Decimal::ZERO,
            to_balance_after: Decimal::new(10_00, 2),
            amount: Decimal::new(10_00, 2),
            currency: "ILS".to_string(),
            description: None,
            status: TransactionStatus::Pending,
            processed_by: "test".to_string(),
            source: "test".to_string(),
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    async fn seeded() -> MemoryLedger {
        let ledger = MemoryLedger::new();
        ledger
            .add_customer(Customer {
                id: 1,
                name: "Dana Levi".to_string(),
                customer_type: CustomerType::Individual,
                personal_id: Some("123456789".to_string()),
                business_number: None,
                vip_tier: None,
            })
            .await;
        ledger.add_account(account(1, 100)).await;
        ledger.add_account(account(2, 0)).await;
        ledger
    }

    #[tokio::test]
    async fn test_commit_applies_staged_writes() {
        let ledger = seeded().await;
        let mut tx = ledger.begin().await.unwrap();
        tx.insert_transaction(&record(7)).await.unwrap();
        tx.write_balance(1, Decimal::new(90_00, 2)).await.unwrap();
        tx.write_balance(2, Decimal::new(10_00, 2)).await.unwrap();
        tx.set_status(TransferId::new(7), TransactionStatus::Completed)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(ledger.balance(1).await, Some(Decimal::new(90_00, 2)));
        let stored = ledger.get_transaction(TransferId::new(7)).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Completed);
        assert_eq!(stored.id, Some(1));
    }

    #[tokio::test]
    async fn test_drop_discards_staged_writes() {
        let ledger = seeded().await;
        {
            let mut tx = ledger.begin().await.unwrap();
            tx.write_balance(1, Decimal::ZERO).await.unwrap();
        }
        assert_eq!(ledger.balance(1).await, Some(Decimal::new(100_00, 2)));
        assert!(ledger.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_transfer_id_keeps_tx_usable() {
        let ledger = seeded().await;
        let mut tx = ledger.begin().await.unwrap();
        tx.insert_transaction(&record(7)).await.unwrap();
        let err = tx.insert_transaction(&record(7)).await.unwrap_err();
        assert_eq!(err, LedgerError::DuplicateTransferId(TransferId::new(7)));
        tx.insert_transaction(&record(8)).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(ledger.transactions().await.len(), 2);
    }

    #[tokio::test]
    async fn test_negative_balance_rejected() {
        let ledger = seeded().await;
        let mut tx = ledger.begin().await.unwrap();
        let err = tx.write_balance(1, Decimal::new(-1, 2)).await.unwrap_err();
        assert_eq!(err, LedgerError::NegativeBalance(1));
    }

    #[tokio::test]
    async fn test_terminal_status_is_final() {
        let ledger = seeded().await;
        let mut tx = ledger.begin().await.unwrap();
        tx.insert_transaction(&record(7)).await.unwrap();
        tx.set_status(TransferId::new(7), TransactionStatus::Failed)
            .await
            .unwrap();
        let err = tx
            .set_status(TransferId::new(7), TransactionStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_commit_fault_discards_everything() {
        let ledger = seeded().await;
        ledger.inject_fault(LedgerFault::Commit).await;
        let mut tx = ledger.begin().await.unwrap();
        tx.write_balance(1, Decimal::ZERO).await.unwrap();
        assert!(tx.commit().await.is_err());
        assert_eq!(ledger.balance(1).await, Some(Decimal::new(100_00, 2)));
    }

    #[tokio::test]
    async fn test_lost_commit_ack_still_applies_writes() {
        let ledger = seeded().await;
        ledger.inject_fault(LedgerFault::CommitAckLost).await;
        let mut tx = ledger.begin().await.unwrap();
        tx.write_balance(1, Decimal::ZERO).await.unwrap();
        assert!(tx.commit().await.is_err());
        assert_eq!(ledger.balance(1).await, Some(Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_outbox_pending_and_mark_sent() {
        let ledger = seeded().await;
        let entry = NewOutboxEntry {
            transfer_id: TransferId::new(7),
            topic: "completed_transfers".to_string(),
            payload: "{}".to_string(),
        };
        let id = ledger.record_failed(&record(7), &entry).await.unwrap();

        let pending = ledger.pending_outbox(10, Duration::ZERO).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(
            ledger
                .pending_outbox(10, Duration::from_secs(3600))
                .await
                .unwrap()
                .is_empty()
        );

        ledger.mark_outbox_sent(id).await.unwrap();
        assert!(ledger.pending_outbox(10, Duration::ZERO).await.unwrap().is_empty());

        let failed = ledger.get_transaction(TransferId::new(7)).await.unwrap().unwrap();
        assert_eq!(failed.status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_history_newest_first_with_paging() {
        let ledger = seeded().await;
        let entry = NewOutboxEntry {
            transfer_id: TransferId::new(0),
            topic: "failed_transfers".to_string(),
            payload: "{}".to_string(),
        };
        for id in 1..=3 {
            ledger.record_failed(&record(id), &entry).await.unwrap();
        }
        let page = ledger.account_history(1, 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].transfer_id, TransferId::new(2));

        let completed = ledger
            .list_transactions(Some(TransactionStatus::Completed), 0, 10)
            .await
            .unwrap();
        assert!(completed.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_fault() {
        let ledger = seeded().await;
        ledger.inject_fault(LedgerFault::Unavailable).await;
        assert!(ledger.health_check().await.is_err());
        assert!(ledger.begin().await.is_err());
        ledger.clear_faults().await;
        assert!(ledger.health_check().await.is_ok());
    }
}
