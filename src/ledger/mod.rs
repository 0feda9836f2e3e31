//! Ledger Store
//!
//! Transactional storage for accounts and the transfer audit trail.
//!
//! # Contract
//!
//! - `LedgerStore::begin` opens one unit of work. Everything written through
//!   the returned `LedgerTx` lands on `commit` or not at all.
//! - `LedgerTx::lock_account` is a read-for-update: the row stays locked for
//!   the rest of the unit of work, so concurrent transfers touching the same
//!   accounts serialize.
//! - `insert_transaction` reports an identifier collision as
//!   `LedgerError::DuplicateTransferId` and leaves the unit of work usable, so
//!   the caller can retry with a fresh identifier.
//! - Outbox rows written through `enqueue_outbox` commit with the ledger
//!   change that produced them.

pub mod memory;
pub mod postgres;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::{Account, Customer};
use crate::core_types::{AccountId, CustomerId, TransferId};

pub use memory::{LedgerFault, MemoryLedger};
pub use postgres::PgLedger;
pub use types::{NewOutboxEntry, OutboxEntry, TransactionRecord, TransactionStatus};

/// Ledger store errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Transfer identifier {0} already exists")]
    DuplicateTransferId(TransferId),

    #[error("Transaction {0} not found")]
    TransactionNotFound(TransferId),

    #[error("Invalid status transition for {transfer_id}: {from} -> {to}")]
    InvalidTransition {
        transfer_id: TransferId,
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error("Account {0} balance cannot be negative")]
    NegativeBalance(AccountId),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Database(e.to_string())
    }
}

/// One open ledger transaction
#[async_trait]
pub trait LedgerTx: Send {
    /// Read an account and lock its row until commit/rollback
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, LedgerError>;

    /// Read an account owner (for event snapshots)
    async fn customer(&mut self, id: CustomerId) -> Result<Option<Customer>, LedgerError>;

    /// Insert the audit record and flush it; returns the storage row id
    async fn insert_transaction(&mut self, record: &TransactionRecord) -> Result<i64, LedgerError>;

    /// Overwrite an account balance (not visible to others until commit)
    async fn write_balance(&mut self, id: AccountId, balance: Decimal) -> Result<(), LedgerError>;

    /// Move an audit record to its terminal status
    async fn set_status(
        &mut self,
        transfer_id: TransferId,
        status: TransactionStatus,
    ) -> Result<(), LedgerError>;

    /// Stage an event for publication; returns the outbox row id
    async fn enqueue_outbox(&mut self, entry: &NewOutboxEntry) -> Result<i64, LedgerError>;

    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError>;
}

/// Ledger store - owns accounts and transaction records durably
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a unit of work
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError>;

    /// Persist a failed audit record (and its failed event) in a standalone
    /// commit, after the transfer's own unit of work was rolled back.
    ///
    /// Returns the outbox row id of the failed event.
    async fn record_failed(
        &self,
        record: &TransactionRecord,
        outbox: &NewOutboxEntry,
    ) -> Result<i64, LedgerError>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError>;

    async fn get_transaction(
        &self,
        transfer_id: TransferId,
    ) -> Result<Option<TransactionRecord>, LedgerError>;

    /// Transactions touching an account, newest first
    async fn account_history(
        &self,
        account_id: AccountId,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, LedgerError>;

    /// All transactions, newest first, optionally filtered by status
    async fn list_transactions(
        &self,
        status: Option<TransactionStatus>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, LedgerError>;

    /// Unsent outbox rows at least `min_age` old, oldest first
    async fn pending_outbox(
        &self,
        limit: usize,
        min_age: Duration,
    ) -> Result<Vec<OutboxEntry>, LedgerError>;

    async fn mark_outbox_sent(&self, outbox_id: i64) -> Result<(), LedgerError>;

    async fn health_check(&self) -> Result<(), LedgerError>;
}
