use std::{num::NonZeroUsize, sync::Arc, time::Duration};

use tokio::io::AsyncBufRead;
use tracing::{debug, warn};

use crate::{
    input::{Identifier, LineSource, LineSourceError},
    updater::{
        backend::{BackendError, UpdateBackend},
        progress::{LoggingProgressSink, ProgressGate, ProgressReport, ProgressSink, RunCounters},
        retry::{RetryBackoff, Sleeper, TokioSleeper},
    },
};

#[derive(Debug, Clone, Copy)]
pub struct UpdaterSettings {
    /// Identifiers accumulated before a batch is flushed.
    pub batch_size: NonZeroUsize,
    pub backoff: RetryBackoff,
    pub progress_interval: Duration,
}

impl UpdaterSettings {
    pub const DEFAULT_BATCH_SIZE: usize = 1000;
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::new(Self::DEFAULT_BATCH_SIZE).expect("non-zero constant"),
            backoff: RetryBackoff::default(),
            progress_interval: ProgressGate::DEFAULT_INTERVAL,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum UpdaterError {
    #[error("Could not read identifiers: {0}")]
    Input(#[from] LineSourceError),

    #[error(
        "Batch {batch_number} ({batch_len} ids starting at {first_identifier}) failed: {source}"
    )]
    Backend {
        batch_number: u64,
        batch_len: usize,
        first_identifier: Identifier,
        #[source]
        source: BackendError,
    },
}

/// Drains a [`LineSource`] into fixed-size batches and applies each one through an
/// [`UpdateBackend`], one committed transaction per batch.
///
/// Batches go out strictly in input order on a single control path. A batch that fails
/// with a retryable error is resent unchanged after a random pause, as many times as it
/// takes; any other failure ends the run.
pub struct BatchUpdater<B> {
    backend: B,
    settings: UpdaterSettings,
    sleeper: Arc<dyn Sleeper>,
    sink: Arc<dyn ProgressSink>,
    counters: RunCounters,
    progress: ProgressGate,
}

impl<B> BatchUpdater<B>
where
    B: UpdateBackend,
{
    pub fn new(backend: B, settings: UpdaterSettings) -> Self {
        Self::with_collaborators(
            backend,
            settings,
            Arc::new(TokioSleeper),
            Arc::new(LoggingProgressSink),
        )
    }

    pub fn with_collaborators(
        backend: B,
        settings: UpdaterSettings,
        sleeper: Arc<dyn Sleeper>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            backend,
            progress: ProgressGate::start(settings.progress_interval),
            settings,
            sleeper,
            sink,
            counters: RunCounters::default(),
        }
    }

    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    /// Runs until the source is exhausted or a fatal error occurs.
    ///
    /// On success a final report is always emitted. Nothing is reported after a failure;
    /// batches committed before it stay committed.
    pub async fn run<R>(
        &mut self,
        source: &mut LineSource<R>,
    ) -> Result<RunCounters, UpdaterError>
    where
        R: AsyncBufRead + Unpin,
    {
        let batch_size = self.settings.batch_size.get();
        self.progress = ProgressGate::start(self.settings.progress_interval);

        let mut batch: Vec<Identifier> = Vec::with_capacity(batch_size);
        while let Some(identifier) = source.next().await? {
            batch.push(identifier);
            if batch.len() >= batch_size {
                self.flush(&batch).await?;
                batch.clear();
                self.maybe_report(false);
            }
        }

        self.flush(&batch).await?;
        self.maybe_report(true);

        Ok(self.counters)
    }

    async fn flush(&mut self, batch: &[Identifier]) -> Result<(), UpdaterError> {
        let Some(&first_identifier) = batch.first() else {
            return Ok(());
        };
        let batch_number = self.counters.transactions_committed + 1;

        self.apply_batch(batch).await.map_err(|source| UpdaterError::Backend {
            batch_number,
            batch_len: batch.len(),
            first_identifier,
            source,
        })
    }

    /// Applies one batch, retrying transient failures until it commits.
    ///
    /// An empty batch never reaches the backend and leaves the counters untouched.
    pub async fn apply_batch(&mut self, batch: &[Identifier]) -> Result<(), BackendError> {
        if batch.is_empty() {
            return Ok(());
        }

        loop {
            match self.backend.apply(batch).await {
                Ok(()) => {
                    self.counters.record_commit(batch.len());
                    debug!(
                        "Committed batch of {} ids (transaction {})",
                        batch.len(),
                        self.counters.transactions_committed
                    );
                    return Ok(());
                }
                Err(e) if e.is_retryable() => {
                    self.counters.record_retry();
                    let backoff = self.settings.backoff.next_delay();
                    warn!(
                        "Batch of {} ids starting at {} hit a {}. Retrying in {:?} (retry {} of the run)",
                        batch.len(),
                        batch[0],
                        e,
                        backoff,
                        self.counters.retries
                    );
                    self.sleeper.sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Emits a report when forced or when the progress interval has passed.
    pub fn maybe_report(&mut self, force_final: bool) -> bool {
        if !self.progress.try_pass(force_final) {
            return false;
        }

        self.sink.report(&ProgressReport {
            counters: self.counters,
            elapsed: self.progress.elapsed(),
            is_final: force_final,
        });
        true
    }
}
