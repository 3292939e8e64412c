use std::sync::atomic::{AtomicU64, Ordering};
use chrono::Utc;

/// 2015-01-01T00:00:00Z in unix milliseconds.
pub const SNOWFLAKE_EPOCH_MS: i64 = 1_420_070_400_000;

/// Snowflake-shaped message nonces, strictly increasing within one generator.
#[derive(Debug, Default)]
pub struct NonceGenerator {
    last: AtomicU64,
}

impl NonceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.next_at(Utc::now().timestamp_millis())
    }

    /// Two calls in the same millisecond (or a clock going backwards) still
    /// produce distinct values: the low bits act as a sequence.
    pub fn next_at(&self, unix_millis: i64) -> u64 {
        let candidate = ((unix_millis - SNOWFLAKE_EPOCH_MS).max(0) as u64) << 22;
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let next = candidate.max(previous + 1);
            match self.last.compare_exchange_weak(previous, next, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return next,
                Err(actual) => previous = actual,
            }
        }
    }
}
