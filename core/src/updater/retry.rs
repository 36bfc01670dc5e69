use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Backoff range is empty: min {min_ms}ms is greater than max {max_ms}ms")]
pub struct InvalidBackoffRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

/// Uniform random pause between attempts of the same batch.
///
/// Every retry draws a fresh delay from the same fixed range; there is no exponential
/// growth and no ceiling on the number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBackoff {
    min_ms: u64,
    max_ms: u64,
}

impl RetryBackoff {
    pub const DEFAULT_MIN_MS: u64 = 50;
    pub const DEFAULT_MAX_MS: u64 = 500;

    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self, InvalidBackoffRange> {
        if min_ms > max_ms {
            return Err(InvalidBackoffRange { min_ms, max_ms });
        }
        Ok(Self { min_ms, max_ms })
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    pub fn next_delay(&self) -> Duration {
        Duration::from_millis(rand::rng().random_range(self.min_ms..=self.max_ms))
    }
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self { min_ms: Self::DEFAULT_MIN_MS, max_ms: Self::DEFAULT_MAX_MS }
    }
}

/// Blocks the worker between retries.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
