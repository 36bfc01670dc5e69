mod backend;
mod batch;
mod progress;
mod retry;

pub use backend::{BackendError, BoxError, UpdateBackend};
pub use batch::{BatchUpdater, UpdaterError, UpdaterSettings};
pub use progress::{LoggingProgressSink, ProgressGate, ProgressReport, ProgressSink, RunCounters};
pub use retry::{InvalidBackoffRange, RetryBackoff, Sleeper, TokioSleeper};
