use std::{num::NonZeroUsize, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    manifest::{
        config::RetryConfig,
        storage::{DatabaseDetails, TargetDetails},
    },
    updater::{InvalidBackoffRange, UpdaterSettings},
};

fn default_batch_size() -> usize {
    UpdaterSettings::DEFAULT_BATCH_SIZE
}

fn default_progress_interval_secs() -> u64 {
    10
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Manifest {
    pub database: DatabaseDetails,

    pub target: TargetDetails,

    /// Maximum number of identifiers committed per transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Minimum number of seconds between two progress lines.
    #[serde(default = "default_progress_interval_secs")]
    pub progress_interval_secs: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum UpdaterSettingsError {
    #[error("batch_size must be greater than zero")]
    BatchSizeMustBePositive,

    #[error("{0}")]
    InvalidBackoffRange(#[from] InvalidBackoffRange),
}

impl Manifest {
    pub fn updater_settings(&self) -> Result<UpdaterSettings, UpdaterSettingsError> {
        let batch_size = NonZeroUsize::new(self.batch_size)
            .ok_or(UpdaterSettingsError::BatchSizeMustBePositive)?;

        Ok(UpdaterSettings {
            batch_size,
            backoff: self.retry.backoff()?,
            progress_interval: Duration::from_secs(self.progress_interval_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        database:
          url: postgres://localhost:5432/app
        target:
          table: events
          key_column: code
          value_column: remarks
    "#;

    #[test]
    fn test_defaults() {
        let manifest: Manifest = serde_yaml::from_str(MINIMAL).unwrap();

        assert_eq!(manifest.batch_size, 1000);
        assert_eq!(manifest.progress_interval_secs, 10);
        assert_eq!(manifest.retry, RetryConfig::default());

        let settings = manifest.updater_settings().unwrap();
        assert_eq!(settings.batch_size.get(), 1000);
        assert_eq!(settings.progress_interval, Duration::from_secs(10));
        assert_eq!(settings.backoff.min(), Duration::from_millis(50));
        assert_eq!(settings.backoff.max(), Duration::from_millis(500));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut manifest: Manifest = serde_yaml::from_str(MINIMAL).unwrap();
        manifest.batch_size = 0;

        assert!(matches!(
            manifest.updater_settings(),
            Err(UpdaterSettingsError::BatchSizeMustBePositive)
        ));
    }
}
