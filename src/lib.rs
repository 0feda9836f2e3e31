//! BankFlow - account-to-account transfers
//!
//! A transactional ledger with a phase-tracked transfer executor, an
//! outbox-backed event publisher and an idempotent downstream consumer.
//!
//! # Modules
//!
//! - [`core_types`] - Identifier types (AccountId, TransferId, ...)
//! - [`money`] - Amount normalization and ceilings
//! - [`account`] - Accounts, owners and the transfer-time guard
//! - [`ledger`] - Ledger store trait with PostgreSQL and in-memory backends
//! - [`transfer`] - Transfer executor and its phase machine
//! - [`events`] - Event wire types, publisher and outbox dispatcher
//! - [`broker`] - Message broker seam (Kafka, in-memory)
//! - [`consumer`] - Idempotent event processing loop
//! - [`gateway`] - HTTP API
//! - [`config`] / [`logging`] / [`db`] - Process plumbing

// Core types - must be first!
pub mod core_types;

pub mod money;

// Ledger side
pub mod account;
pub mod db;
pub mod ledger;
pub mod transfer;

// Event side
pub mod broker;
pub mod consumer;
pub mod events;

// Service plumbing
pub mod config;
pub mod gateway;
pub mod logging;

// Convenient re-exports at crate root
pub use core_types::{AccountId, CustomerId, TransferId};
pub use ledger::{LedgerStore, MemoryLedger, PgLedger, TransactionRecord, TransactionStatus};
pub use transfer::{TransferError, TransferExecutor, TransferReceipt, TransferRequest};
