//! Transfer identifier generation
//!
//! Identifiers are time-ordered 63-bit integers so two executors never pick
//! the same value by chance:
//!
//! ```text
//! | 41 bits: ms since 2024-01-01 | 8 bits: machine id | 14 bits: sequence |
//! ```
//!
//! The store's unique constraint still backs this up; a collision makes the
//! executor draw again.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core_types::TransferId;

/// 2024-01-01T00:00:00Z in unix milliseconds
const CUSTOM_EPOCH_MS: u64 = 1_704_067_200_000;
const MACHINE_BITS: u32 = 8;
const SEQUENCE_BITS: u32 = 14;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_MASK: u64 = (1 << 41) - 1;

/// Source of fresh transfer identifiers
pub trait TransferIdSource: Send + Sync {
    fn next_id(&self) -> TransferId;
}

struct SnowflakeState {
    sequence: u64,
    last_timestamp: u64,
}

/// Snowflake ID generator
pub struct SnowflakeIds {
    machine_id: u8,
    state: Mutex<SnowflakeState>,
}

impl SnowflakeIds {
    pub fn new(machine_id: u8) -> Self {
        Self {
            machine_id,
            state: Mutex::new(SnowflakeState {
                sequence: 0,
                last_timestamp: 0,
            }),
        }
    }

    fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(CUSTOM_EPOCH_MS)
            .saturating_sub(CUSTOM_EPOCH_MS)
    }

    fn generate(&self, now: u64) -> i64 {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        // Never step back in time; a stalled or rewound clock keeps counting
        // on the last timestamp.
        let mut timestamp = now.max(state.last_timestamp);
        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                timestamp += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        let id = ((timestamp & TIMESTAMP_MASK) << (MACHINE_BITS + SEQUENCE_BITS))
            | ((self.machine_id as u64) << SEQUENCE_BITS)
            | state.sequence;
        id as i64
    }
}

impl TransferIdSource for SnowflakeIds {
    fn next_id(&self) -> TransferId {
        TransferId::new(self.generate(Self::now_ms()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_positive_and_increasing() {
        let ids = SnowflakeIds::new(3);
        let mut last = 0i64;
        for _ in 0..10_000 {
            let id = ids.next_id().value();
            assert!(id > 0);
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn test_machine_id_is_embedded() {
        let ids = SnowflakeIds::new(0xAB);
        let id = ids.generate(1000) as u64;
        assert_eq!((id >> SEQUENCE_BITS) & 0xFF, 0xAB);
        assert_eq!(id >> (MACHINE_BITS + SEQUENCE_BITS), 1000);
    }

    #[test]
    fn test_sequence_overflow_borrows_next_millisecond() {
        let ids = SnowflakeIds::new(1);
        let first = ids.generate(500);
        let mut last = first;
        for _ in 0..SEQUENCE_MASK + 5 {
            let id = ids.generate(500);
            assert!(id > last);
            last = id;
        }
        assert!((last as u64) >> (MACHINE_BITS + SEQUENCE_BITS) > 500);
    }

    #[test]
    fn test_rewound_clock_stays_monotonic() {
        let ids = SnowflakeIds::new(1);
        let a = ids.generate(10_000);
        let b = ids.generate(9_000);
        assert!(b > a);
    }
}
