use std::{fmt, path::PathBuf, time::Duration};

use tokio::{
    fs::File,
    io::{stdin, AsyncBufRead, BufReader},
    time::Instant,
};
use tracing::{info, warn};

use crate::{
    database::postgres::{
        client::{PostgresClient, PostgresConnectionError},
        update::PostgresUpdateBackend,
    },
    helpers::format_duration,
    input::LineSource,
    manifest::{
        core::UpdaterSettingsError,
        yaml::{read_manifest, ReadManifestError},
    },
    updater::{BatchUpdater, RunCounters, UpdaterError},
};

/// Where identifiers are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Stdin,
}

impl InputSource {
    /// `-` means stdin, anything else is a file path.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            InputSource::Stdin
        } else {
            InputSource::File(PathBuf::from(arg))
        }
    }

    async fn open(&self) -> Result<Box<dyn AsyncBufRead + Unpin + Send>, std::io::Error> {
        match self {
            InputSource::File(path) => Ok(Box::new(BufReader::new(File::open(path).await?))),
            InputSource::Stdin => Ok(Box::new(BufReader::new(stdin()))),
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::File(path) => write!(f, "{}", path.display()),
            InputSource::Stdin => write!(f, "<stdin>"),
        }
    }
}

pub struct StartDetails {
    pub manifest_path: PathBuf,
    pub input: InputSource,
    /// Takes precedence over `batch_size` from the manifest.
    pub batch_size_override: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub counters: RunCounters,
    pub elapsed: Duration,
}

#[derive(thiserror::Error, Debug)]
pub enum StartUpdaterError {
    #[error("Could not read manifest: {0}")]
    CouldNotReadManifest(#[from] ReadManifestError),

    #[error("Invalid updater settings: {0}")]
    InvalidSettings(#[from] UpdaterSettingsError),

    #[error("Could not open the id file {0}: {1}")]
    CouldNotOpenInput(InputSource, std::io::Error),

    #[error("Could not connect to postgres: {0}")]
    PostgresConnection(#[from] PostgresConnectionError),

    #[error("Update run failed: {0}")]
    UpdateFailed(#[from] UpdaterError),
}

pub async fn start_updater(details: StartDetails) -> Result<RunSummary, StartUpdaterError> {
    info!("Reading configuration from {}...", details.manifest_path.display());
    let mut manifest = read_manifest(&details.manifest_path)?;
    if let Some(batch_size) = details.batch_size_override {
        manifest.batch_size = batch_size;
    }
    let settings = manifest.updater_settings()?;

    info!("Opening the id file {}...", details.input);
    let reader = details
        .input
        .open()
        .await
        .map_err(|e| StartUpdaterError::CouldNotOpenInput(details.input.clone(), e))?;
    let mut source = LineSource::new(reader);

    info!("Obtaining the database connection...");
    let client = PostgresClient::new(&manifest.database).await?;
    let backend = PostgresUpdateBackend::new(client, manifest.target.clone());

    info!(
        "Updating {}.{} keyed by {} in batches of {}",
        manifest.target.table,
        manifest.target.value_column,
        manifest.target.key_column,
        settings.batch_size
    );
    let started_at = Instant::now();
    let mut updater = BatchUpdater::new(backend, settings);
    let counters = match updater.run(&mut source).await {
        Ok(counters) => counters,
        Err(e) => {
            let committed = updater.counters();
            warn!(
                "Stopped after {} committed transactions ({} rows, {} retries), those stay committed",
                committed.transactions_committed, committed.rows_updated, committed.retries
            );
            return Err(e.into());
        }
    };
    let elapsed = started_at.elapsed();

    info!(
        "All done in {}, total {} transactions, {} rows updated, {} retries.",
        format_duration(elapsed),
        counters.transactions_committed,
        counters.rows_updated,
        counters.retries
    );

    Ok(RunSummary { counters, elapsed })
}
