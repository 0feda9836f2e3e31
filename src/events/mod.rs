//! Transfer events: wire format, publication, and the outbox

pub mod outbox;
pub mod publisher;
pub mod types;

pub use outbox::OutboxDispatcher;
pub use publisher::EventPublisher;
pub use types::{
    AccountSnapshot, CompletedTransfer, CustomerSnapshot, EventDecodeError, EventMetadata,
    FailedTransfer, TransferEvent,
};
