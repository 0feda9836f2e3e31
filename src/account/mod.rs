//! Accounts, their owners, and the transfer-time account checks

pub mod guard;
pub mod models;

pub use guard::AccountGuard;
pub use models::{Account, AccountClass, AccountStatus, Customer, CustomerType};
