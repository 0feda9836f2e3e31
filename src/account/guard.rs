//! Account Guard
//!
//! Eligibility checks and balance mutation for the two accounts of a
//! transfer. Every call runs inside the caller's ledger transaction, so the
//! rows read here stay locked until the caller commits or rolls back.

use rust_decimal::Decimal;

use super::models::Account;
use crate::core_types::AccountId;
use crate::ledger::LedgerTx;
use crate::transfer::TransferError;

pub struct AccountGuard;

impl AccountGuard {
    /// Lock and load an account, then check it can take part in a transfer.
    ///
    /// `required_amount` is only passed for the source account.
    pub async fn validate_for_transfer(
        tx: &mut dyn LedgerTx,
        account_id: AccountId,
        required_amount: Option<Decimal>,
    ) -> Result<Account, TransferError> {
        let account = tx
            .lock_account(account_id)
            .await?
            .ok_or(TransferError::AccountNotFound(account_id))?;

        if !account.is_active() {
            return Err(TransferError::InactiveAccount {
                account_id,
                status: account.status,
            });
        }

        match required_amount {
            Some(required) if account.balance < required => {
                return Err(TransferError::InsufficientFunds {
                    account_id,
                    balance: account.balance,
                    required,
                });
            }
            _ => {}
        }

        Ok(account)
    }

    /// Write a new balance through the open transaction (visible on commit)
    pub async fn apply_balance(
        tx: &mut dyn LedgerTx,
        account: &mut Account,
        new_balance: Decimal,
    ) -> Result<(), TransferError> {
        if new_balance < Decimal::ZERO {
            return Err(TransferError::NegativeBalance(account.id));
        }
        if !account.is_active() {
            return Err(TransferError::InactiveAccount {
                account_id: account.id,
                status: account.status,
            });
        }

        tx.write_balance(account.id, new_balance).await?;
        account.balance = new_balance;
        Ok(())
    }

    /// Per-class cap on a single transfer out of `account`
    pub fn check_daily_ceiling(account: &Account, amount: Decimal) -> Result<(), TransferError> {
        let limit = account.class.daily_ceiling();
        if amount > limit {
            return Err(TransferError::CeilingExceeded {
                amount,
                limit,
                class: account.class,
            });
        }
        Ok(())
    }
}
