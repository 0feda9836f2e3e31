//! Ledger record types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::{AccountId, TransferId};

/// Audit-record lifecycle: `Pending -> Completed | Failed`, nothing after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Failed)
    }

    /// Monotonic transition check
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Completed)
                | (TransactionStatus::Pending, TransactionStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown transaction status: {}", other)),
        }
    }
}

/// Ledger transaction record - the audit trail of one transfer.
///
/// Never deleted. The four balance snapshots always satisfy
/// `from_after = from_before - amount` and `to_after = to_before + amount`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    /// Storage row id (assigned by the store on insert)
    pub id: Option<i64>,
    pub transfer_id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub from_balance_before: Decimal,
    pub from_balance_after: Decimal,
    pub to_balance_before: Decimal,
    pub to_balance_after: Decimal,
    pub amount: Decimal,
    pub currency: String,
    pub description: Option<String>,
    pub status: TransactionStatus,
    /// Which service executed the transfer
    pub processed_by: String,
    /// Which entry point received it
    pub source: String,
    /// Failure reason for `Failed` records
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    /// Check the snapshot arithmetic and the shape invariants
    pub fn is_consistent(&self) -> bool {
        self.amount > Decimal::ZERO
            && self.from_account_id != self.to_account_id
            && self.from_balance_after == self.from_balance_before - self.amount
            && self.to_balance_after == self.to_balance_before + self.amount
    }
}

/// Outbox row waiting to be published to the broker
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    pub id: i64,
    pub transfer_id: TransferId,
    pub topic: String,
    /// Serialized event JSON
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Outbox row to be written inside a ledger transaction
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutboxEntry {
    pub transfer_id: TransferId,
    pub topic: String,
    pub payload: String,
}
