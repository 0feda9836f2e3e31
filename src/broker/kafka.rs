//! Kafka implementation of the broker seam (feature `kafka`)
//!
//! Producer: `acks=all` plus `enable.idempotence=true`, so a retried send
//! never creates a second copy of the same record.
//! Consumer: manual offset commit, `auto.offset.reset=earliest`.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::Message as KafkaMessage;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::topic_partition_list::{Offset, TopicPartitionList};
use tokio::time::Instant;

use super::{BrokerError, BrokerMessage, EventSource, MessageProducer};
use crate::config::KafkaConfig;

/// Linger after the first message of a batch before handing it over
const BATCH_LINGER: Duration = Duration::from_millis(10);
const SEEK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct KafkaProducer {
    producer: FutureProducer,
    send_timeout: Duration,
    /// Must all exist for the health check to pass
    required_topics: Vec<String>,
}

impl KafkaProducer {
    pub fn new(config: &KafkaConfig) -> Result<Self, BrokerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("retry.backoff.ms", "1000")
            .set("request.timeout.ms", "30000")
            .set("message.timeout.ms", config.message_timeout_ms.to_string())
            .create()
            .map_err(|e| BrokerError::Config(format!("Failed to create Kafka producer: {}", e)))?;

        tracing::info!(brokers = %config.brokers, "Kafka producer created");
        Ok(Self {
            producer,
            send_timeout: Duration::from_millis(config.message_timeout_ms),
            required_topics: config.topics.all().iter().map(|t| t.to_string()).collect(),
        })
    }
}

#[async_trait]
impl MessageProducer for KafkaProducer {
    async fn send(&self, topic: &str, key: &[u8], payload: &[u8]) -> Result<(), BrokerError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);
        self.producer
            .send(record, self.send_timeout)
            .await
            .map_err(|(e, _)| BrokerError::Send {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), BrokerError> {
        let producer = self.producer.clone();
        let required = self.required_topics.clone();
        tokio::task::spawn_blocking(move || {
            let metadata = producer
                .client()
                .fetch_metadata(None, Duration::from_secs(5))
                .map_err(|e| BrokerError::Unavailable(e.to_string()))?;
            let present: Vec<&str> = metadata.topics().iter().map(|t| t.name()).collect();
            let missing = missing_topics(&required, &present);
            if missing.is_empty() {
                Ok(())
            } else {
                Err(BrokerError::Unavailable(format!(
                    "Missing topics: {}",
                    missing.join(", ")
                )))
            }
        })
        .await
        .map_err(|e| BrokerError::Unavailable(e.to_string()))?
    }
}

fn missing_topics<'a>(required: &'a [String], present: &[&str]) -> Vec<&'a str> {
    required
        .iter()
        .map(String::as_str)
        .filter(|t| !present.contains(t))
        .collect()
}

pub struct KafkaSource {
    consumer: StreamConsumer,
}

impl KafkaSource {
    /// Create a consumer in `config.group_id` subscribed to `topic`
    pub fn new(config: &KafkaConfig, topic: &str) -> Result<Self, BrokerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(|e| BrokerError::Config(format!("Failed to create Kafka consumer: {}", e)))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| BrokerError::Unavailable(format!("Failed to subscribe: {}", e)))?;

        tracing::info!(topic, group_id = %config.group_id, "Kafka consumer subscribed");
        Ok(Self { consumer })
    }
}

#[async_trait]
impl EventSource for KafkaSource {
    async fn poll_batch(
        &mut self,
        max: usize,
        timeout: Duration,
    ) -> Result<Vec<BrokerMessage>, BrokerError> {
        let deadline = Instant::now() + timeout;
        let mut batch = Vec::new();

        while batch.len() < max {
            let wait = if batch.is_empty() {
                deadline.saturating_duration_since(Instant::now())
            } else {
                BATCH_LINGER
            };
            if wait.is_zero() {
                break;
            }
            match tokio::time::timeout(wait, self.consumer.recv()).await {
                Ok(Ok(m)) => batch.push(BrokerMessage {
                    topic: m.topic().to_string(),
                    partition: m.partition(),
                    offset: m.offset(),
                    key: m.key().map(|k| k.to_vec()),
                    payload: m.payload().map(|p| p.to_vec()).unwrap_or_default(),
                }),
                Ok(Err(e)) if batch.is_empty() => return Err(BrokerError::Consume(e.to_string())),
                Ok(Err(_)) | Err(_) => break,
            }
        }

        Ok(batch)
    }

    async fn commit(&mut self, message: &BrokerMessage) -> Result<(), BrokerError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(&message.topic, message.partition, Offset::Offset(message.offset + 1))
            .map_err(|e| BrokerError::Commit(e.to_string()))?;
        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| BrokerError::Commit(e.to_string()))
    }

    async fn seek(&mut self, message: &BrokerMessage) -> Result<(), BrokerError> {
        // librdkafka purges the partition's fetch queue on seek
        self.consumer
            .seek(
                &message.topic,
                message.partition,
                Offset::Offset(message.offset),
                SEEK_TIMEOUT,
            )
            .map_err(|e| BrokerError::Consume(format!("Failed to seek: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Run with: KAFKA_BOOTSTRAP_SERVERS=localhost:9092 cargo test -- --ignored

    fn test_config(group_id: &str) -> KafkaConfig {
        KafkaConfig {
            brokers: std::env::var("KAFKA_BOOTSTRAP_SERVERS")
                .unwrap_or_else(|_| "localhost:9092".to_string()),
            group_id: group_id.to_string(),
            message_timeout_ms: 10000,
            ..KafkaConfig::default()
        }
    }

    #[test]
    fn test_missing_topics() {
        let required: Vec<String> = KafkaConfig::default()
            .topics
            .all()
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(
            missing_topics(&required, &["completedTransactions", "__consumer_offsets"]),
            vec!["pendingTransactions", "failedTransactions"]
        );
        let all: Vec<&str> = required.iter().map(String::as_str).collect();
        assert!(missing_topics(&required, &all).is_empty());
    }

    #[tokio::test]
    async fn test_clients_build_without_broker() {
        // librdkafka connects lazily; construction never touches the network
        let config = KafkaConfig {
            brokers: "127.0.0.1:1".to_string(),
            ..KafkaConfig::default()
        };
        assert!(KafkaProducer::new(&config).is_ok());
        assert!(KafkaSource::new(&config, "completedTransactions").is_ok());
    }

    #[tokio::test]
    #[ignore = "requires Kafka broker"]
    async fn test_send_poll_seek_commit() {
        let suffix = chrono::Utc::now().timestamp_millis();
        let topic = format!("bankflow-test-{}", suffix);
        let config = test_config(&format!("bankflow-test-group-{}", suffix));

        let producer = KafkaProducer::new(&config).expect("producer");
        producer
            .send(&topic, b"100", br#"{"transaction_id":100}"#)
            .await
            .expect("send");

        let mut source = KafkaSource::new(&config, &topic).expect("consumer");
        let mut first = Vec::new();
        for _ in 0..30 {
            first = source.poll_batch(10, Duration::from_secs(1)).await.unwrap();
            if !first.is_empty() {
                break;
            }
        }
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].key_str().as_deref(), Some("100"));

        // Rewound message comes back at the same offset
        source.seek(&first[0]).await.expect("seek");
        let again = source.poll_batch(10, Duration::from_secs(5)).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].offset, first[0].offset);
        assert_eq!(again[0].payload, first[0].payload);

        source.commit(&again[0]).await.expect("commit");
    }
}
