use serde::{Deserialize, Serialize};

use crate::updater::{InvalidBackoffRange, RetryBackoff};

fn default_min_backoff_ms() -> u64 {
    RetryBackoff::DEFAULT_MIN_MS
}

fn default_max_backoff_ms() -> u64 {
    RetryBackoff::DEFAULT_MAX_MS
}

/// Pause taken before resending a batch that failed with a transient error.
///
/// Each retry sleeps for a uniformly random number of milliseconds in
/// `min_backoff_ms..=max_backoff_ms`. Retries are unbounded.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    #[serde(default = "default_min_backoff_ms")]
    pub min_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { min_backoff_ms: default_min_backoff_ms(), max_backoff_ms: default_max_backoff_ms() }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Result<RetryBackoff, InvalidBackoffRange> {
        RetryBackoff::new(self.min_backoff_ms, self.max_backoff_ms)
    }
}
