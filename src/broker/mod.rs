//! Message broker seam
//!
//! The broker is a partitioned, ordered-per-key, at-least-once log. The
//! producer side only needs `MessageProducer`; the consumer loop only needs
//! `EventSource`. Messages are partitioned by key, and the key is always the
//! transfer identifier, so every event of one transfer lands in one
//! partition in production order.

#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::KafkaConfig;

#[cfg(feature = "kafka")]
pub use kafka::{KafkaProducer, KafkaSource};
pub use memory::{MemoryBroker, MemorySource};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to send to {topic}: {reason}")]
    Send { topic: String, reason: String },

    #[error("Failed to consume: {0}")]
    Consume(String),

    #[error("Failed to commit offset: {0}")]
    Commit(String),

    #[error("Invalid broker configuration: {0}")]
    Config(String),

    #[error("Kafka is enabled in the config but this build lacks the `kafka` feature")]
    NotCompiledIn,
}

/// One delivered message, with enough coordinates to commit it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
}

impl BrokerMessage {
    pub fn key_str(&self) -> Option<String> {
        self.key
            .as_ref()
            .map(|k| String::from_utf8_lossy(k).to_string())
    }
}

/// Producer side of the broker
#[async_trait]
pub trait MessageProducer: Send + Sync {
    /// Send and wait for the broker acknowledgement
    async fn send(&self, topic: &str, key: &[u8], payload: &[u8]) -> Result<(), BrokerError>;

    async fn health_check(&self) -> Result<(), BrokerError>;
}

/// Consumer side of the broker, bound to one group and one topic
#[async_trait]
pub trait EventSource: Send {
    /// Wait up to `timeout` for at most `max` messages. An empty batch means
    /// nothing arrived in time.
    async fn poll_batch(
        &mut self,
        max: usize,
        timeout: Duration,
    ) -> Result<Vec<BrokerMessage>, BrokerError>;

    /// Commit the group offset past `message`
    async fn commit(&mut self, message: &BrokerMessage) -> Result<(), BrokerError>;

    /// Rewind `message`'s partition so the next poll starts at `message`
    async fn seek(&mut self, message: &BrokerMessage) -> Result<(), BrokerError>;
}

/// Build the configured producer. `Ok(None)` means Kafka is switched off in
/// the config and the service runs ledger-only.
pub fn producer_from_config(
    config: &KafkaConfig,
) -> Result<Option<Arc<dyn MessageProducer>>, BrokerError> {
    if !config.enabled {
        return Ok(None);
    }
    kafka_producer(config).map(Some)
}

/// Build a consumer for `topic` in the configured group, or `Ok(None)` when
/// Kafka is switched off
pub fn source_from_config(
    config: &KafkaConfig,
    topic: &str,
) -> Result<Option<Box<dyn EventSource>>, BrokerError> {
    if !config.enabled {
        return Ok(None);
    }
    kafka_source(config, topic).map(Some)
}

#[cfg(feature = "kafka")]
fn kafka_producer(config: &KafkaConfig) -> Result<Arc<dyn MessageProducer>, BrokerError> {
    Ok(Arc::new(KafkaProducer::new(config)?))
}

#[cfg(not(feature = "kafka"))]
fn kafka_producer(_config: &KafkaConfig) -> Result<Arc<dyn MessageProducer>, BrokerError> {
    Err(BrokerError::NotCompiledIn)
}

#[cfg(feature = "kafka")]
fn kafka_source(config: &KafkaConfig, topic: &str) -> Result<Box<dyn EventSource>, BrokerError> {
    Ok(Box::new(KafkaSource::new(config, topic)?))
}

#[cfg(not(feature = "kafka"))]
fn kafka_source(_config: &KafkaConfig, _topic: &str) -> Result<Box<dyn EventSource>, BrokerError> {
    Err(BrokerError::NotCompiledIn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled() -> KafkaConfig {
        KafkaConfig {
            enabled: false,
            ..KafkaConfig::default()
        }
    }

    #[test]
    fn test_disabled_config_builds_nothing() {
        assert!(producer_from_config(&disabled()).unwrap().is_none());
        assert!(source_from_config(&disabled(), "completedTransactions").unwrap().is_none());
    }

    #[cfg(not(feature = "kafka"))]
    #[test]
    fn test_enabled_without_feature_is_an_error() {
        let config = KafkaConfig::default();
        assert!(config.enabled);
        assert_eq!(producer_from_config(&config).err(), Some(BrokerError::NotCompiledIn));
        assert_eq!(
            source_from_config(&config, "completedTransactions").err(),
            Some(BrokerError::NotCompiledIn)
        );
    }

    #[cfg(feature = "kafka")]
    #[tokio::test]
    async fn test_enabled_builds_kafka_clients() {
        let config = KafkaConfig {
            brokers: "127.0.0.1:1".to_string(),
            ..KafkaConfig::default()
        };
        assert!(producer_from_config(&config).unwrap().is_some());
        assert!(source_from_config(&config, "completedTransactions").unwrap().is_some());
    }
}
