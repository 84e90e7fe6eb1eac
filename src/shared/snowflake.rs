//! Snowflake ID Generator
//!
//! Time-sortable unique message IDs generated in-process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Hub epoch (2024-01-01T00:00:00.000Z)
pub const HUB_EPOCH: u64 = 1704067200000;

/// Snowflake ID generator
pub struct SnowflakeGenerator {
    machine_id: u64,
    // upper 52 bits: milliseconds since epoch, lower 12 bits: sequence
    state: AtomicU64,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator
    pub fn new(machine_id: u64) -> Self {
        Self {
            machine_id: machine_id & 0x3FF, // 10 bits
            state: AtomicU64::new(0),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let now = current_timestamp().saturating_sub(HUB_EPOCH);

        let mut current = self.state.load(Ordering::Relaxed);
        let (timestamp, sequence) = loop {
            let last_ts = current >> 12;
            let last_seq = current & 0xFFF;

            let (ts, seq) = if now > last_ts {
                (now, 0)
            } else if last_seq < 0xFFF {
                (last_ts, last_seq + 1)
            } else {
                // Sequence exhausted for this millisecond: borrow the next one
                (last_ts + 1, 0)
            };

            let next = (ts << 12) | seq;
            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => break (ts, seq),
                Err(actual) => current = actual,
            }
        };

        ((timestamp << 22) | (self.machine_id << 12) | sequence) as i64
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(HUB_EPOCH)
}

/// Extract timestamp from snowflake ID
pub fn extract_timestamp(snowflake: i64) -> u64 {
    ((snowflake as u64) >> 22) + HUB_EPOCH
}
