use std::time::Duration;

use tokio::time::Instant;
use tracing::info;

use crate::helpers::{format_duration, rows_per_second};

/// Cumulative totals for one run. Only ever increase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunCounters {
    pub rows_updated: u64,
    pub transactions_committed: u64,
    pub retries: u64,
}

impl RunCounters {
    pub(crate) fn record_commit(&mut self, rows: usize) {
        self.transactions_committed += 1;
        self.rows_updated += rows as u64;
    }

    pub(crate) fn record_retry(&mut self) {
        self.retries += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressReport {
    pub counters: RunCounters,
    pub elapsed: Duration,
    /// Set on the forced report emitted once the input is exhausted.
    pub is_final: bool,
}

/// Receives rate-limited progress snapshots.
pub trait ProgressSink: Send + Sync {
    fn report(&self, report: &ProgressReport);
}

/// Writes progress through `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingProgressSink;

impl ProgressSink for LoggingProgressSink {
    fn report(&self, report: &ProgressReport) {
        let counters = &report.counters;
        info!(
            "{}: {} transactions, {} retries, {} rows updated ({} elapsed, {} rows/s)",
            if report.is_final { "Finished" } else { "Progress" },
            counters.transactions_committed,
            counters.retries,
            counters.rows_updated,
            format_duration(report.elapsed),
            rows_per_second(counters.rows_updated, report.elapsed)
        );
    }
}

/// Time gate deciding when a non-forced report is due.
#[derive(Debug, Clone, Copy)]
pub struct ProgressGate {
    interval: Duration,
    started_at: Instant,
    last_reported_at: Instant,
}

impl ProgressGate {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

    pub fn start(interval: Duration) -> Self {
        let now = Instant::now();
        Self { interval, started_at: now, last_reported_at: now }
    }

    /// Returns true when a report should be emitted now, and if so moves the gate forward.
    pub fn try_pass(&mut self, force: bool) -> bool {
        let now = Instant::now();
        if force || now.duration_since(self.last_reported_at) >= self.interval {
            self.last_reported_at = now;
            return true;
        }
        false
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
