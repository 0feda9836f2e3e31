//! Core types used throughout the system
//!
//! Identifier aliases shared by the ledger, the executor and the event
//! pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account ID - storage row id of an account.
///
/// # Constraints:
/// - **Positive**: ids `<= 0` are rejected before any ledger transaction opens
/// - **Immutable**: assigned by the store, never reused
pub type AccountId = i64;

/// Customer ID - owner reference of an account
pub type CustomerId = i64;

/// Transfer identifier.
///
/// Globally unique across the ledger and distinct from the storage row id.
/// It is the broker partition key and the consumer idempotency key, so it
/// travels on the wire as a plain JSON integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(i64);

impl TransferId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TransferId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl FromStr for TransferId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_id_is_plain_integer_on_the_wire() {
        let id = TransferId::new(98765);
        assert_eq!(serde_json::to_string(&id).unwrap(), "98765");
        let back: TransferId = serde_json::from_str("98765").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_transfer_id_parse_and_display() {
        let id: TransferId = "42".parse().unwrap();
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<TransferId>().is_err());
    }
}
