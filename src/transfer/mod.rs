//! Transfer Execution
//!
//! Moves funds between two accounts inside one ledger transaction and hands
//! the result to the event pipeline.
//!
//! # Phases
//!
//! ```text
//! INITIATED → VALIDATED → BALANCES_APPLIED → COMMITTED → PUBLISHED
//!     ↓           ↓              ↓               ↓
//!  ABORTED     ABORTED        ABORTED     COMMIT_SUCCEEDED_PUBLISH_FAILED
//! ```
//!
//! # Safety Invariants
//!
//! 1. **One Commit**: the audit row, both balance writes, the status flip and
//!    the completed event's outbox row land together or not at all
//! 2. **Commit Before Publish**: nothing is sent to the broker until the
//!    ledger commit returns
//! 3. **No Unwind After Commit**: publish failures are logged and left to the
//!    outbox; they never reach the caller as errors
//! 4. **Ordered Locks**: accounts are locked in ascending id order

pub mod error;
pub mod executor;
pub mod id;
pub mod state;
pub mod types;

pub use error::{ErrorKind, TransferError};
pub use executor::TransferExecutor;
pub use id::{SnowflakeIds, TransferIdSource};
pub use state::TransferPhase;
pub use types::{TransferReceipt, TransferRequest};
