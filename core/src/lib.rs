// public
pub mod input;
pub mod manifest;
pub mod updater;

mod database;
pub use database::postgres::{
    client::{PostgresClient, PostgresConnectionError, PostgresError},
    query_builder::build_bulk_update_sql,
    update::{is_retryable_sql_state, PostgresUpdateBackend},
};

mod helpers;
pub use helpers::{format_duration, rows_per_second};

mod logger;
pub use logger::{setup_logger, InvalidLogFilter};

mod start;
pub use start::{start_updater, InputSource, RunSummary, StartDetails, StartUpdaterError};

// export 3rd party dependencies
pub use async_trait::async_trait;
pub use tracing::error as updater_error;
