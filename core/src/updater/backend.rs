use async_trait::async_trait;

use crate::input::Identifier;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failed batch apply, classified by whether the same batch can simply be sent again.
///
/// Backends decide the classification; the updater only ever branches on
/// [`BackendError::is_retryable`].
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("transient backend failure: {0}")]
    Retryable(#[source] BoxError),

    #[error("{0}")]
    Fatal(#[source] BoxError),
}

impl BackendError {
    pub fn retryable(error: impl Into<BoxError>) -> Self {
        BackendError::Retryable(error.into())
    }

    pub fn fatal(error: impl Into<BoxError>) -> Self {
        BackendError::Fatal(error.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Retryable(_))
    }
}

/// Applies one batch of identifiers as a single atomic unit of work.
///
/// Implementations must either commit every row of the batch or none of them, so a
/// retryable failure never leaves a partial write behind.
#[async_trait]
pub trait UpdateBackend: Send {
    async fn apply(&mut self, batch: &[Identifier]) -> Result<(), BackendError>;
}

#[async_trait]
impl<B> UpdateBackend for &mut B
where
    B: UpdateBackend + ?Sized,
{
    async fn apply(&mut self, batch: &[Identifier]) -> Result<(), BackendError> {
        (**self).apply(batch).await
    }
}
