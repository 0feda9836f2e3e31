use std::sync::Arc;

use crate::events::EventPublisher;
use crate::ledger::LedgerStore;
use crate::transfer::TransferExecutor;

/// Gateway application state (shared)
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<TransferExecutor>,
    /// Read side for transaction queries and health
    pub ledger: Arc<dyn LedgerStore>,
    pub publisher: EventPublisher,
}

impl AppState {
    pub fn new(
        executor: Arc<TransferExecutor>,
        ledger: Arc<dyn LedgerStore>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            executor,
            ledger,
            publisher,
        }
    }
}
