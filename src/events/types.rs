//! Transfer events as they travel over the broker
//!
//! Wire shape (amounts as JSON numbers, timestamps RFC 3339 with `Z`):
//!
//! ```json
//! {"event_type": "transaction", "timestamp": "2025-07-30T13:45:00Z",
//!  "transaction_id": 98765,
//!  "from_account": {"id": 1001, "balance_before": 1500.0, "balance_after": 1200.0,
//!                   "customer": {"id": 501, "name": "David Levi", "type": "individual",
//!                                "personal_id": "203948293"}},
//!  "to_account": {...}, "amount": 300.0, "currency": "ILS",
//!  "description": "Monthly service payment",
//!  "metadata": {"processed_by": "bank-core-service", "source": "api/v1/transfer",
//!               "status": "completed"}}
//! ```
//!
//! A failed event wraps the completed payload it supersedes in
//! `original_event` and carries `error_message` and `retry_count`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::account::{Customer, CustomerType};
use crate::core_types::{AccountId, CustomerId, TransferId};
use crate::ledger::TransactionRecord;

pub const EVENT_TRANSACTION: &str = "transaction";
pub const EVENT_FAILED_TRANSACTION: &str = "failed_transaction";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventDecodeError {
    #[error("Malformed event payload: {0}")]
    Malformed(String),

    #[error("Transaction event missing transaction_id")]
    MissingTransferId,

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Invalid {event_type} event {transfer_id}: {reason}")]
    InvalidPayload {
        event_type: String,
        transfer_id: i64,
        reason: String,
    },
}

/// Owner snapshot embedded in an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub id: CustomerId,
    pub name: String,
    #[serde(rename = "type")]
    pub customer_type: CustomerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vip_tier: Option<String>,
}

impl From<&Customer> for CustomerSnapshot {
    /// Individuals expose their personal id, businesses their business
    /// number; the VIP tier appears for either when set.
    fn from(c: &Customer) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            customer_type: c.customer_type,
            personal_id: match c.customer_type {
                CustomerType::Individual => c.personal_id.clone(),
                CustomerType::Business => None,
            },
            business_number: match c.customer_type {
                CustomerType::Business => c.business_number.clone(),
                CustomerType::Individual => None,
            },
            vip_tier: c.vip_tier.clone(),
        }
    }
}

/// Account side of a transfer with its before/after balances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: AccountId,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance_before: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance_after: Decimal,
    pub customer: CustomerSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub processed_by: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Projection of a terminal ledger record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTransfer {
    pub timestamp: DateTime<Utc>,
    pub transaction_id: TransferId,
    pub from_account: AccountSnapshot,
    pub to_account: AccountSnapshot,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub description: Option<String>,
    pub metadata: EventMetadata,
}

fn default_currency() -> String {
    "ILS".to_string()
}

impl CompletedTransfer {
    pub fn from_record(record: &TransactionRecord, from: &Customer, to: &Customer) -> Self {
        Self {
            timestamp: record.timestamp,
            transaction_id: record.transfer_id,
            from_account: AccountSnapshot {
                id: record.from_account_id,
                balance_before: record.from_balance_before,
                balance_after: record.from_balance_after,
                customer: from.into(),
            },
            to_account: AccountSnapshot {
                id: record.to_account_id,
                balance_before: record.to_balance_before,
                balance_after: record.to_balance_after,
                customer: to.into(),
            },
            amount: record.amount,
            currency: record.currency.clone(),
            description: record.description.clone(),
            metadata: EventMetadata {
                processed_by: record.processed_by.clone(),
                source: record.source.clone(),
                status: Some(record.status.as_str().to_string()),
            },
        }
    }
}

/// A transfer or an event-processing attempt that failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTransfer {
    pub timestamp: DateTime<Utc>,
    pub transaction_id: TransferId,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub retry_count: u32,
    /// The completed-shaped payload this failure supersedes, kept verbatim
    #[serde(default)]
    pub original_event: Value,
}

impl FailedTransfer {
    /// First failure of a transfer, raised by the producing side
    pub fn from_completed(
        completed: &CompletedTransfer,
        error_message: impl Into<String>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            timestamp: Utc::now(),
            transaction_id: completed.transaction_id,
            error_message: error_message.into(),
            retry_count: 0,
            original_event: serde_json::to_value(TransferEvent::Transaction(completed.clone()))?,
        })
    }

    /// Wrap a raw payload that could not be processed.
    ///
    /// A payload that is itself a failed event is re-wrapped rather than
    /// nested: its `original_event` is carried over and its `retry_count`
    /// incremented. Returns `None` when the payload has no usable
    /// transaction id.
    pub fn escalate(raw: &Value, error_message: impl Into<String>) -> Option<Self> {
        let transaction_id = raw.get("transaction_id").and_then(Value::as_i64)?;
        // Out-of-range counts saturate so they stay over any retry budget
        let retry_count = raw
            .get("retry_count")
            .and_then(Value::as_u64)
            .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX));
        let is_failed =
            raw.get("event_type").and_then(Value::as_str) == Some(EVENT_FAILED_TRANSACTION);
        let original_event = match raw.get("original_event") {
            Some(original) if is_failed && !original.is_null() => original.clone(),
            _ => raw.clone(),
        };

        Some(Self {
            timestamp: Utc::now(),
            transaction_id: TransferId::new(transaction_id),
            error_message: error_message.into(),
            retry_count: retry_count.saturating_add(1),
            original_event,
        })
    }
}

/// Closed set of event kinds, discriminated by `event_type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum TransferEvent {
    Transaction(CompletedTransfer),
    FailedTransaction(FailedTransfer),
}

impl TransferEvent {
    pub fn transfer_id(&self) -> TransferId {
        match self {
            TransferEvent::Transaction(e) => e.transaction_id,
            TransferEvent::FailedTransaction(e) => e.transaction_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            TransferEvent::Transaction(_) => EVENT_TRANSACTION,
            TransferEvent::FailedTransaction(_) => EVENT_FAILED_TRANSACTION,
        }
    }

    /// Idempotency key. Each retry of a failure is a distinct event.
    pub fn dedup_key(&self) -> String {
        match self {
            TransferEvent::Transaction(e) => format!("{}:{}", EVENT_TRANSACTION, e.transaction_id),
            TransferEvent::FailedTransaction(e) => format!(
                "{}:{}:{}",
                EVENT_FAILED_TRANSACTION, e.transaction_id, e.retry_count
            ),
        }
    }

    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a raw broker payload.
    ///
    /// A missing `event_type` means `transaction`. The transfer id is checked
    /// before the event kind so a payload without one is always reported as
    /// such.
    pub fn decode(payload: &[u8]) -> Result<Self, EventDecodeError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| EventDecodeError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: Value) -> Result<Self, EventDecodeError> {
        let object = value
            .as_object_mut()
            .ok_or_else(|| EventDecodeError::Malformed("expected a JSON object".to_string()))?;

        let transfer_id = object
            .get("transaction_id")
            .and_then(Value::as_i64)
            .ok_or(EventDecodeError::MissingTransferId)?;

        let event_type = object
            .entry("event_type")
            .or_insert_with(|| Value::String(EVENT_TRANSACTION.to_string()))
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| EventDecodeError::UnknownEventType("<non-string>".to_string()))?;
        if event_type != EVENT_TRANSACTION && event_type != EVENT_FAILED_TRANSACTION {
            return Err(EventDecodeError::UnknownEventType(event_type));
        }

        serde_json::from_value(value).map_err(|e| EventDecodeError::InvalidPayload {
            event_type,
            transfer_id,
            reason: e.to_string(),
        })
    }
}
