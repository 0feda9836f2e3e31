//! Data models for accounts and their owners

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::{AccountId, CustomerId};

// ============================================================================
// Account Class
// ============================================================================

/// Account class. Each class maps to one daily-ceiling tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountClass {
    Checking,
    Savings,
    Business,
    Vip,
}

impl AccountClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountClass::Checking => "checking",
            AccountClass::Savings => "savings",
            AccountClass::Business => "business",
            AccountClass::Vip => "vip",
        }
    }

    /// Per-transfer cap for this class, highest privilege first.
    ///
    /// NOTE: this is a static cap on a single transfer, not a rolling
    /// 24-hour sum over the account's outgoing transfers.
    pub fn daily_ceiling(&self) -> Decimal {
        match self {
            AccountClass::Vip => Decimal::new(1_000_000_00, 2),
            AccountClass::Business => Decimal::new(500_000_00, 2),
            AccountClass::Checking | AccountClass::Savings => Decimal::new(100_000_00, 2),
        }
    }
}

impl fmt::Display for AccountClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "checking" => Ok(AccountClass::Checking),
            "savings" => Ok(AccountClass::Savings),
            "business" => Ok(AccountClass::Business),
            "vip" => Ok(AccountClass::Vip),
            other => Err(format!("unknown account class: {}", other)),
        }
    }
}

// ============================================================================
// Account Status
// ============================================================================

/// Account lifecycle status. Balances move only while `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Frozen,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Frozen => "frozen",
            AccountStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(AccountStatus::Active),
            "inactive" => Ok(AccountStatus::Inactive),
            "frozen" => Ok(AccountStatus::Frozen),
            "closed" => Ok(AccountStatus::Closed),
            other => Err(format!("unknown account status: {}", other)),
        }
    }
}

// ============================================================================
// Account
// ============================================================================

/// Ledger account.
///
/// Invariants: `balance >= 0`, `currency` never changes after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub customer_id: CustomerId,
    pub account_number: String,
    pub class: AccountClass,
    pub currency: String,
    pub balance: Decimal,
    pub status: AccountStatus,
}

impl Account {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Quick eligibility check used by read paths; the transfer path goes
    /// through `AccountGuard` instead.
    pub fn can_transfer(&self, amount: Decimal) -> bool {
        self.is_active() && amount > Decimal::ZERO && self.balance >= amount
    }
}

// ============================================================================
// Customer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    Individual,
    Business,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerType::Individual => "individual",
            CustomerType::Business => "business",
        }
    }
}

impl FromStr for CustomerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "individual" => Ok(CustomerType::Individual),
            "business" => Ok(CustomerType::Business),
            other => Err(format!("unknown customer type: {}", other)),
        }
    }
}

/// Account owner. Individuals carry a personal id, businesses a business
/// number; either may hold a VIP tier (Gold, Platinum, Diamond).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub customer_type: CustomerType,
    pub personal_id: Option<String>,
    pub business_number: Option<String>,
    pub vip_tier: Option<String>,
}

impl Customer {
    pub fn is_vip(&self) -> bool {
        self.vip_tier.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_ceiling_tiers_are_ordered_by_privilege() {
        assert_eq!(AccountClass::Vip.daily_ceiling(), Decimal::from_str("1000000.00").unwrap());
        assert_eq!(
            AccountClass::Business.daily_ceiling(),
            Decimal::from_str("500000.00").unwrap()
        );
        assert_eq!(
            AccountClass::Checking.daily_ceiling(),
            Decimal::from_str("100000.00").unwrap()
        );
        assert_eq!(AccountClass::Savings.daily_ceiling(), AccountClass::Checking.daily_ceiling());
        assert!(AccountClass::Vip.daily_ceiling() > AccountClass::Business.daily_ceiling());
    }

    #[test]
    fn test_class_and_status_parse() {
        assert_eq!(AccountClass::from_str("VIP").unwrap(), AccountClass::Vip);
        assert!(AccountClass::from_str("gold").is_err());
        assert_eq!(AccountStatus::from_str("frozen").unwrap(), AccountStatus::Frozen);
        assert_eq!(AccountStatus::Closed.to_string(), "closed");
        assert_eq!(CustomerType::from_str("business").unwrap(), CustomerType::Business);
    }

    #[test]
    fn test_can_transfer() {
        let mut account = Account {
            id: 1001,
            customer_id: 501,
            account_number: "ACC-1001".to_string(),
            class: AccountClass::Checking,
            currency: "ILS".to_string(),
            balance: Decimal::new(1500_00, 2),
            status: AccountStatus::Active,
        };
        assert!(account.can_transfer(Decimal::new(300_00, 2)));
        assert!(!account.can_transfer(Decimal::new(2000_00, 2)));
        assert!(!account.can_transfer(Decimal::ZERO));

        account.status = AccountStatus::Frozen;
        assert!(!account.can_transfer(Decimal::new(300_00, 2)));
    }
}
