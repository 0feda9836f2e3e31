//! Transfer execution phases
//!
//! ```text
//! INITIATED → VALIDATED → BALANCES_APPLIED → COMMITTED → PUBLISHED
//!     ↓           ↓              ↓               ↓
//!  ABORTED     ABORTED        ABORTED     COMMIT_SUCCEEDED_PUBLISH_FAILED
//! ```
//!
//! Everything before `COMMITTED` is undone by rollback. After `COMMITTED`
//! the transfer stands no matter what happens to publication.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferPhase {
    /// Request accepted, no ledger transaction yet
    Initiated,

    /// Both accounts locked and checked, ceiling passed
    Validated,

    /// Audit row flushed and both balances written (not yet durable)
    BalancesApplied,

    /// Ledger commit returned success
    Committed,

    /// Terminal: completed event delivered to the broker
    Published,

    /// Terminal: nothing durable except an optional failed audit row
    Aborted,

    /// Terminal: transfer stands, event left in the outbox for redelivery
    CommitSucceededPublishFailed,
}

impl TransferPhase {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferPhase::Published
                | TransferPhase::Aborted
                | TransferPhase::CommitSucceededPublishFailed
        )
    }

    pub fn can_advance_to(&self, next: TransferPhase) -> bool {
        use TransferPhase::*;
        matches!(
            (self, next),
            (Initiated, Validated)
                | (Validated, BalancesApplied)
                | (BalancesApplied, Committed)
                | (Committed, Published)
                | (Committed, CommitSucceededPublishFailed)
                | (Initiated, Aborted)
                | (Validated, Aborted)
                | (BalancesApplied, Aborted)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferPhase::Initiated => "INITIATED",
            TransferPhase::Validated => "VALIDATED",
            TransferPhase::BalancesApplied => "BALANCES_APPLIED",
            TransferPhase::Committed => "COMMITTED",
            TransferPhase::Published => "PUBLISHED",
            TransferPhase::Aborted => "ABORTED",
            TransferPhase::CommitSucceededPublishFailed => "COMMIT_SUCCEEDED_PUBLISH_FAILED",
        }
    }
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
