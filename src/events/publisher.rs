//! Event Publisher
//!
//! Best-effort delivery of transfer events. `publish` never returns an
//! error: broker trouble is logged and reported as `false`, so the caller's
//! ledger commit is never blocked or unwound by it. Without a producer the
//! publisher runs in ledger-only mode and every publish reports `false`.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::types::{FailedTransfer, TransferEvent};
use crate::broker::MessageProducer;
use crate::config::TopicConfig;
use crate::core_types::TransferId;

#[derive(Clone)]
pub struct EventPublisher {
    producer: Option<Arc<dyn MessageProducer>>,
    topics: TopicConfig,
}

impl EventPublisher {
    pub fn new(producer: Arc<dyn MessageProducer>, topics: TopicConfig) -> Self {
        Self {
            producer: Some(producer),
            topics,
        }
    }

    /// Ledger-only mode
    pub fn disabled(topics: TopicConfig) -> Self {
        Self {
            producer: None,
            topics,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.producer.is_some()
    }

    pub fn topics(&self) -> &TopicConfig {
        &self.topics
    }

    /// Topic an event belongs on
    pub fn topic_for(&self, event: &TransferEvent) -> &str {
        match event {
            TransferEvent::Transaction(_) => &self.topics.completed,
            TransferEvent::FailedTransaction(_) => &self.topics.failed,
        }
    }

    /// Send one payload keyed by transfer id. Returns whether the broker
    /// acknowledged it.
    pub async fn publish(&self, topic: &str, key: TransferId, payload: &str) -> bool {
        let Some(producer) = &self.producer else {
            warn!(topic, transfer_id = %key, "Broker not available, skipping message");
            return false;
        };

        match producer
            .send(topic, key.to_string().as_bytes(), payload.as_bytes())
            .await
        {
            Ok(()) => {
                debug!(topic, transfer_id = %key, "Sent transfer event");
                true
            }
            Err(e) => {
                error!(topic, transfer_id = %key, error = %e, "Failed to send transfer event");
                false
            }
        }
    }

    /// Serialize and publish an event to its topic
    pub async fn publish_event(&self, event: &TransferEvent) -> bool {
        match event.to_payload() {
            Ok(payload) => {
                self.publish(self.topic_for(event), event.transfer_id(), &payload)
                    .await
            }
            Err(e) => {
                error!(transfer_id = %event.transfer_id(), error = %e, "Failed to encode event");
                false
            }
        }
    }

    pub async fn publish_failed(&self, event: &FailedTransfer) -> bool {
        self.publish_event(&TransferEvent::FailedTransaction(event.clone()))
            .await
    }

    pub async fn health_check(&self) -> bool {
        match &self.producer {
            Some(p) => p.health_check().await.is_ok(),
            None => false,
        }
    }
}
