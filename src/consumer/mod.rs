//! Event consumption: idempotent processing of transfer events

pub mod dedup;
pub mod processor;
pub mod side_effects;
pub mod worker;

pub use dedup::{DedupError, DedupStore, MemoryDedupStore, PgDedupStore};
pub use processor::{ProcessOutcome, TransactionProcessor};
pub use side_effects::{FailureDisposition, LoggingSideEffects, SideEffectError, SideEffects};
pub use worker::{BatchStats, Escalation, EventConsumer};
