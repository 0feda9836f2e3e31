//! In-process broker with Kafka-like semantics
//!
//! - a topic is a fixed number of append-only partitions
//! - a message goes to `hash(key) % partitions`
//! - a subscriber's read position advances on poll, not on commit, and
//!   `seek` moves it back
//! - committed offsets are kept per consumer group; a new subscriber of the
//!   same group starts from them, so uncommitted messages are redelivered
//!   after a restart or rebalance

use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rustc_hash::{FxHashMap, FxHasher};
use tokio::time::Instant;

use super::{BrokerError, BrokerMessage, EventSource, MessageProducer};

const POLL_TICK: Duration = Duration::from_millis(5);

#[derive(Debug, Clone)]
struct StoredMessage {
    /// Global send order, for inspection only
    seq: u64,
    key: Option<Vec<u8>>,
    payload: Vec<u8>,
}

#[derive(Default)]
struct BrokerState {
    topics: FxHashMap<String, Vec<Vec<StoredMessage>>>,
    /// (group, topic, partition) -> next offset to read
    committed: FxHashMap<(String, String, i32), i64>,
    next_seq: u64,
    fail_sends: bool,
}

/// In-memory broker shared by producers and subscribers
#[derive(Clone)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    partitions: usize,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(3)
    }
}

impl MemoryBroker {
    pub fn new(partitions: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState::default())),
            partitions: partitions.max(1),
        }
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn partition_for(&self, key: &[u8]) -> usize {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() % self.partitions as u64) as usize
    }

    /// Make every following `send` fail until switched back
    pub fn set_fail_sends(&self, fail: bool) {
        self.state().fail_sends = fail;
    }

    /// Every message ever sent to `topic`, in send order
    pub fn messages(&self, topic: &str) -> Vec<BrokerMessage> {
        let state = self.state();
        let mut all: Vec<(u64, BrokerMessage)> = state
            .topics
            .get(topic)
            .map(|partitions| {
                partitions
                    .iter()
                    .enumerate()
                    .flat_map(|(p, log)| {
                        log.iter().enumerate().map(move |(offset, m)| {
                            (
                                m.seq,
                                BrokerMessage {
                                    topic: topic.to_string(),
                                    partition: p as i32,
                                    offset: offset as i64,
                                    key: m.key.clone(),
                                    payload: m.payload.clone(),
                                },
                            )
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        all.sort_by_key(|(seq, _)| *seq);
        all.into_iter().map(|(_, m)| m).collect()
    }

    /// Payloads of `topic` decoded as JSON, in send order
    pub fn json_messages(&self, topic: &str) -> Vec<serde_json::Value> {
        self.messages(topic)
            .iter()
            .filter_map(|m| serde_json::from_slice(&m.payload).ok())
            .collect()
    }

    /// Committed offset of one partition for a group
    pub fn committed_offset(&self, group: &str, topic: &str, partition: i32) -> Option<i64> {
        self.state()
            .committed
            .get(&(group.to_string(), topic.to_string(), partition))
            .copied()
    }

    /// Join `group` on `topic`, starting from the group's committed offsets
    pub fn subscribe(&self, group: &str, topic: &str) -> MemorySource {
        let state = self.state();
        let positions = (0..self.partitions as i32)
            .map(|p| {
                state
                    .committed
                    .get(&(group.to_string(), topic.to_string(), p))
                    .copied()
                    .unwrap_or(0)
            })
            .collect();
        MemorySource {
            broker: self.clone(),
            group: group.to_string(),
            topic: topic.to_string(),
            positions,
        }
    }
}

#[async_trait]
impl MessageProducer for MemoryBroker {
    async fn send(&self, topic: &str, key: &[u8], payload: &[u8]) -> Result<(), BrokerError> {
        let partition = self.partition_for(key);
        let partitions = self.partitions;
        let mut state = self.state();
        if state.fail_sends {
            return Err(BrokerError::Send {
                topic: topic.to_string(),
                reason: "broker unreachable".to_string(),
            });
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        let logs = state
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| vec![Vec::new(); partitions]);
        logs[partition].push(StoredMessage {
            seq,
            key: Some(key.to_vec()),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn health_check(&self) -> Result<(), BrokerError> {
        if self.state().fail_sends {
            return Err(BrokerError::Unavailable("broker unreachable".to_string()));
        }
        Ok(())
    }
}

/// One group member reading one topic of a `MemoryBroker`
pub struct MemorySource {
    broker: MemoryBroker,
    group: String,
    topic: String,
    positions: Vec<i64>,
}

impl MemorySource {
    fn drain(&mut self, max: usize) -> Vec<BrokerMessage> {
        let state = self.broker.state();
        let Some(logs) = state.topics.get(&self.topic) else {
            return Vec::new();
        };
        let mut batch = Vec::new();
        for (p, log) in logs.iter().enumerate() {
            while batch.len() < max {
                let offset = self.positions[p];
                let Some(m) = log.get(offset as usize) else {
                    break;
                };
                batch.push(BrokerMessage {
                    topic: self.topic.clone(),
                    partition: p as i32,
                    offset,
                    key: m.key.clone(),
                    payload: m.payload.clone(),
                });
                self.positions[p] += 1;
            }
        }
        batch
    }
}

#[async_trait]
impl EventSource for MemorySource {
    async fn poll_batch(
        &mut self,
        max: usize,
        timeout: Duration,
    ) -> Result<Vec<BrokerMessage>, BrokerError> {
        let deadline = Instant::now() + timeout;
        loop {
            let batch = self.drain(max);
            if !batch.is_empty() || Instant::now() >= deadline {
                return Ok(batch);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(POLL_TICK.min(remaining)).await;
        }
    }

    async fn commit(&mut self, message: &BrokerMessage) -> Result<(), BrokerError> {
        let mut state = self.broker.state();
        let slot = state
            .committed
            .entry((self.group.clone(), self.topic.clone(), message.partition))
            .or_insert(0);
        *slot = (*slot).max(message.offset + 1);
        Ok(())
    }

    async fn seek(&mut self, message: &BrokerMessage) -> Result<(), BrokerError> {
        let position = usize::try_from(message.partition)
            .ok()
            .and_then(|p| self.positions.get_mut(p))
            .ok_or_else(|| {
                BrokerError::Consume(format!("Unknown partition {}", message.partition))
            })?;
        *position = message.offset;
        Ok(())
    }
}
