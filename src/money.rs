//! Money Module
//!
//! All monetary values are `rust_decimal::Decimal` with a fixed scale of two
//! decimal places, matching the `NUMERIC(15, 2)` ledger columns.
//!
//! ## Usage
//! ```rust
//! use bankflow::money::{format_amount, normalize_amount};
//! use rust_decimal::Decimal;
//! use std::str::FromStr;
//!
//! let amount = normalize_amount(Decimal::from_str("300.004").unwrap()).unwrap();
//! assert_eq!(format_amount(amount), "300.00");
//! ```

use rust_decimal::prelude::*;
use thiserror::Error;

/// Fixed number of fractional digits for every balance and amount
pub const MONEY_SCALE: u32 = 2;

/// Absolute per-transfer ceiling enforced before a ledger transaction opens
pub const SYSTEM_TRANSFER_CEILING: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 2);

/// Money conversion errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Amount {amount} exceeds maximum limit {limit}")]
    AboveCeiling { amount: Decimal, limit: Decimal },
}

/// Round a client amount to the ledger scale and require it to stay positive.
///
/// Rounding uses banker's rounding, so `0.005` becomes `0.00` and is rejected.
pub fn normalize_amount(amount: Decimal) -> Result<Decimal, MoneyError> {
    let rounded = amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven);
    if rounded <= Decimal::ZERO {
        return Err(MoneyError::InvalidAmount);
    }
    Ok(with_scale(rounded))
}

/// Reject amounts above `limit`
pub fn check_ceiling(amount: Decimal, limit: Decimal) -> Result<(), MoneyError> {
    if amount > limit {
        return Err(MoneyError::AboveCeiling { amount, limit });
    }
    Ok(())
}

/// Format with exactly two fractional digits
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

/// Force the ledger scale without changing the value (`1200` -> `1200.00`)
pub fn with_scale(amount: Decimal) -> Decimal {
    let mut d = amount;
    if d.scale() < MONEY_SCALE {
        d.rescale(MONEY_SCALE);
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_normalize_rounds_to_two_places() {
        assert_eq!(normalize_amount(dec("300")).unwrap(), dec("300.00"));
        assert_eq!(normalize_amount(dec("10.125")).unwrap(), dec("10.12"));
        assert_eq!(normalize_amount(dec("10.135")).unwrap(), dec("10.14"));
    }

    #[test]
    fn test_normalize_rejects_non_positive() {
        assert_eq!(normalize_amount(dec("0")), Err(MoneyError::InvalidAmount));
        assert_eq!(normalize_amount(dec("-5")), Err(MoneyError::InvalidAmount));
        assert_eq!(normalize_amount(dec("0.004")), Err(MoneyError::InvalidAmount));
    }

    #[test]
    fn test_system_ceiling_value() {
        assert_eq!(SYSTEM_TRANSFER_CEILING, dec("10000000.00"));
        assert!(check_ceiling(dec("10000000.00"), SYSTEM_TRANSFER_CEILING).is_ok());
        assert!(matches!(
            check_ceiling(dec("10000000.01"), SYSTEM_TRANSFER_CEILING),
            Err(MoneyError::AboveCeiling { .. })
        ));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec("1200")), "1200.00");
        assert_eq!(format_amount(dec("8300.5")), "8300.50");
    }
}
