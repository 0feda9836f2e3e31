//! Transfer Error Types
//!
//! Three families, matching where the transfer stops:
//! - request-shape errors never open a ledger transaction
//! - validation errors roll the ledger transaction back cleanly
//! - persistence errors roll back and go through compensation

use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::{AccountClass, AccountStatus};
use crate::core_types::{AccountId, TransferId};
use crate::ledger::LedgerError;
use crate::money::MoneyError;

/// Which family an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RequestShape,
    Validation,
    NotFound,
    Persistence,
}

/// Transfer error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    // === Request-Shape Errors ===
    #[error("Transfer amount must be positive")]
    InvalidAmount,

    #[error("Cannot transfer to the same account")]
    SameAccount,

    #[error("Account IDs must be positive integers (got {0})")]
    InvalidAccountId(AccountId),

    #[error("Transfer amount {amount} exceeds maximum limit {limit}")]
    AmountTooLarge { amount: Decimal, limit: Decimal },

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("Description exceeds {max} characters")]
    DescriptionTooLong { max: usize },

    // === Validation Errors ===
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    #[error("Account {account_id} is not active (status: {status})")]
    InactiveAccount {
        account_id: AccountId,
        status: AccountStatus,
    },

    #[error("Insufficient funds in account {account_id}. Balance: {balance}, Required: {required}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: Decimal,
        required: Decimal,
    },

    #[error("Currency mismatch: account {account_id} holds {actual}, transfer requested {expected}")]
    CurrencyMismatch {
        account_id: AccountId,
        expected: String,
        actual: String,
    },

    #[error("Transfer amount {amount} exceeds daily limit {limit} for account type {class}")]
    CeilingExceeded {
        amount: Decimal,
        limit: Decimal,
        class: AccountClass,
    },

    #[error("Account {0} balance cannot be negative")]
    NegativeBalance(AccountId),

    // === Lookup Errors ===
    #[error("Transaction {0} not found")]
    TransactionNotFound(TransferId),

    // === Persistence Errors ===
    #[error("Could not allocate a unique transfer identifier after {0} attempts")]
    IdExhausted(u32),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Event encoding failed: {0}")]
    EventEncoding(String),
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::InvalidAmount
            | TransferError::SameAccount
            | TransferError::InvalidAccountId(_)
            | TransferError::AmountTooLarge { .. }
            | TransferError::InvalidCurrency(_)
            | TransferError::DescriptionTooLong { .. } => ErrorKind::RequestShape,
            TransferError::AccountNotFound(_)
            | TransferError::InactiveAccount { .. }
            | TransferError::InsufficientFunds { .. }
            | TransferError::CurrencyMismatch { .. }
            | TransferError::CeilingExceeded { .. }
            | TransferError::NegativeBalance(_) => ErrorKind::Validation,
            TransferError::TransactionNotFound(_) => ErrorKind::NotFound,
            TransferError::IdExhausted(_)
            | TransferError::DatabaseError(_)
            | TransferError::EventEncoding(_) => ErrorKind::Persistence,
        }
    }

    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::SameAccount => "SAME_ACCOUNT",
            TransferError::InvalidAccountId(_) => "INVALID_ACCOUNT_ID",
            TransferError::AmountTooLarge { .. } => "AMOUNT_TOO_LARGE",
            TransferError::InvalidCurrency(_) => "INVALID_CURRENCY",
            TransferError::DescriptionTooLong { .. } => "DESCRIPTION_TOO_LONG",
            TransferError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            TransferError::InactiveAccount { .. } => "INACTIVE_ACCOUNT",
            TransferError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            TransferError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            TransferError::CeilingExceeded { .. } => "CEILING_EXCEEDED",
            TransferError::NegativeBalance(_) => "NEGATIVE_BALANCE",
            TransferError::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            TransferError::IdExhausted(_) => "ID_EXHAUSTED",
            TransferError::DatabaseError(_) => "DATABASE_ERROR",
            TransferError::EventEncoding(_) => "EVENT_ENCODING",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::RequestShape | ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Persistence => 500,
        }
    }
}

impl From<LedgerError> for TransferError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NegativeBalance(id) => TransferError::NegativeBalance(id),
            LedgerError::TransactionNotFound(id) => TransferError::TransactionNotFound(id),
            other => TransferError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for TransferError {
    fn from(e: serde_json::Error) -> Self {
        TransferError::EventEncoding(e.to_string())
    }
}

impl From<MoneyError> for TransferError {
    fn from(e: MoneyError) -> Self {
        match e {
            MoneyError::InvalidAmount => TransferError::InvalidAmount,
            MoneyError::AboveCeiling { amount, limit } => {
                TransferError::AmountTooLarge { amount, limit }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransferError::SameAccount.code(), "SAME_ACCOUNT");
        assert_eq!(
            TransferError::InsufficientFunds {
                account_id: 1,
                balance: Decimal::new(50_00, 2),
                required: Decimal::new(100_00, 2),
            }
            .code(),
            "INSUFFICIENT_FUNDS"
        );
        assert_eq!(TransferError::IdExhausted(5).code(), "ID_EXHAUSTED");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::InvalidAmount.http_status(), 400);
        assert_eq!(TransferError::AccountNotFound(9).http_status(), 400);
        assert_eq!(
            TransferError::TransactionNotFound(TransferId::new(1)).http_status(),
            404
        );
        assert_eq!(TransferError::DatabaseError("down".into()).http_status(), 500);
    }

    #[test]
    fn test_display_names_limit_and_class() {
        let err = TransferError::CeilingExceeded {
            amount: Decimal::new(2_000_000_00, 2),
            limit: Decimal::new(100_000_00, 2),
            class: AccountClass::Checking,
        };
        assert_eq!(
            err.to_string(),
            "Transfer amount 2000000.00 exceeds daily limit 100000.00 for account type checking"
        );
    }

    #[test]
    fn test_from_ledger_error() {
        let err: TransferError = LedgerError::NegativeBalance(3).into();
        assert_eq!(err, TransferError::NegativeBalance(3));
        let err: TransferError = LedgerError::Database("gone".into()).into();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }
}
