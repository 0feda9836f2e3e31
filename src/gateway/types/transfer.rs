//! Transfer request/response DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core_types::{AccountId, TransferId};
use crate::ledger::{TransactionRecord, TransactionStatus};
use crate::transfer::{TransferReceipt, TransferRequest};

/// POST /api/v1/transfer body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TransferRequestDto {
    #[validate(range(min = 1, message = "must be a positive integer"))]
    pub from_account_id: AccountId,
    #[validate(range(min = 1, message = "must be a positive integer"))]
    pub to_account_id: AccountId,
    pub amount: Decimal,
    #[validate(length(equal = 3, message = "must be a 3-letter code"))]
    #[serde(default = "default_currency")]
    pub currency: String,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub description: Option<String>,
}

fn default_currency() -> String {
    "ILS".to_string()
}

impl From<TransferRequestDto> for TransferRequest {
    fn from(dto: TransferRequestDto) -> Self {
        TransferRequest {
            from_account_id: dto.from_account_id,
            to_account_id: dto.to_account_id,
            amount: dto.amount,
            currency: Some(dto.currency),
            description: dto.description,
        }
    }
}

/// 201 payload of a committed transfer
#[derive(Debug, Serialize)]
pub struct TransferResponseData {
    pub transaction_id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub timestamp: DateTime<Utc>,
}

impl From<TransferReceipt> for TransferResponseData {
    fn from(r: TransferReceipt) -> Self {
        Self {
            transaction_id: r.transfer_id,
            from_account_id: r.from_account_id,
            to_account_id: r.to_account_id,
            amount: r.amount,
            currency: r.currency,
            description: r.description,
            status: r.status,
            timestamp: r.timestamp,
        }
    }
}

/// Full audit record
#[derive(Debug, Serialize)]
pub struct TransactionData {
    pub id: Option<i64>,
    pub transaction_id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    #[serde(with = "rust_decimal::serde::float")]
    pub from_balance_before: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub from_balance_after: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub to_balance_before: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub to_balance_after: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub processed_by: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<TransactionRecord> for TransactionData {
    fn from(r: TransactionRecord) -> Self {
        Self {
            id: r.id,
            transaction_id: r.transfer_id,
            from_account_id: r.from_account_id,
            to_account_id: r.to_account_id,
            from_balance_before: r.from_balance_before,
            from_balance_after: r.from_balance_after,
            to_balance_before: r.to_balance_before,
            to_balance_after: r.to_balance_after,
            amount: r.amount,
            currency: r.currency,
            description: r.description,
            status: r.status,
            processed_by: r.processed_by,
            source: r.source,
            error_message: r.error_message,
            timestamp: r.timestamp,
        }
    }
}

/// Paging for list endpoints
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PageQuery {
    #[validate(range(min = 0))]
    #[serde(default)]
    pub skip: i64,
    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub status: Option<String>,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: &'static str,
    pub database: &'static str,
    pub broker: &'static str,
    pub version: &'static str,
}
