//! Transfer request and receipt types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::error::TransferError;
use super::state::TransferPhase;
use crate::core_types::{AccountId, TransferId};
use crate::ledger::{TransactionRecord, TransactionStatus};
use crate::money::{check_ceiling, normalize_amount};

/// Longest accepted free-text description
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// One money movement as received from the inbound interface
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Decimal,
    /// Falls back to the configured default currency
    pub currency: Option<String>,
    pub description: Option<String>,
}

impl TransferRequest {
    pub fn new(from_account_id: AccountId, to_account_id: AccountId, amount: Decimal) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
            currency: None,
            description: None,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Request-shape checks. Nothing here touches the ledger.
    ///
    /// Returns the amount normalized to the ledger scale and the upper-cased
    /// currency code.
    pub fn validate_shape(
        &self,
        max_amount: Decimal,
        default_currency: &str,
    ) -> Result<ValidatedShape, TransferError> {
        if self.from_account_id <= 0 {
            return Err(TransferError::InvalidAccountId(self.from_account_id));
        }
        if self.to_account_id <= 0 {
            return Err(TransferError::InvalidAccountId(self.to_account_id));
        }
        if self.from_account_id == self.to_account_id {
            return Err(TransferError::SameAccount);
        }

        let amount = normalize_amount(self.amount)?;
        check_ceiling(amount, max_amount)?;

        let currency = self
            .currency
            .as_deref()
            .unwrap_or(default_currency)
            .to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(TransferError::InvalidCurrency(currency));
        }

        if let Some(desc) = &self.description
            && desc.chars().count() > MAX_DESCRIPTION_LEN
        {
            return Err(TransferError::DescriptionTooLong {
                max: MAX_DESCRIPTION_LEN,
            });
        }

        Ok(ValidatedShape { amount, currency })
    }
}

/// Output of [`TransferRequest::validate_shape`]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedShape {
    pub amount: Decimal,
    pub currency: String,
}

/// What the caller gets back for a committed transfer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReceipt {
    pub transfer_id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Decimal,
    pub currency: String,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub timestamp: DateTime<Utc>,
    /// `Published` or `CommitSucceededPublishFailed`
    #[serde(skip)]
    pub phase: TransferPhase,
}

impl TransferReceipt {
    pub fn from_record(record: &TransactionRecord, phase: TransferPhase) -> Self {
        Self {
            transfer_id: record.transfer_id,
            from_account_id: record.from_account_id,
            to_account_id: record.to_account_id,
            amount: record.amount,
            currency: record.currency.clone(),
            description: record.description.clone(),
            status: record.status,
            timestamp: record.timestamp,
            phase,
        }
    }
}
