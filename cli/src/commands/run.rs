use std::path::PathBuf;

use bulk_updater::{
    format_duration, start_updater, updater_error, InputSource, StartDetails, StartUpdaterError,
};

use crate::{
    cli_interface::CLI,
    console::{print_error_message, print_success_message},
};

pub async fn run(cli: &CLI) -> Result<(), StartUpdaterError> {
    let details = StartDetails {
        manifest_path: PathBuf::from(&cli.config),
        input: InputSource::from_arg(&cli.input),
        batch_size_override: cli.batch_size,
    };

    match start_updater(details).await {
        Ok(summary) => {
            print_success_message(&format!(
                "Updated {} rows in {} transactions ({} retries) in {}",
                summary.counters.rows_updated,
                summary.counters.transactions_committed,
                summary.counters.retries,
                format_duration(summary.elapsed)
            ));
            Ok(())
        }
        Err(e) => {
            updater_error!("FATAL: {}", e);
            print_error_message(&format!("bulk-updater failed: {}", e));
            Err(e)
        }
    }
}
