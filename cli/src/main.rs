#[cfg(feature = "jemalloc")]
use jemallocator::Jemalloc;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::process::ExitCode;

use bulk_updater::setup_logger;
use clap::Parser;

use crate::{cli_interface::CLI, console::print_error_message};

mod cli_interface;
mod commands;
mod console;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CLI::parse();

    if let Err(e) = setup_logger(&cli.log_level) {
        print_error_message(&e.to_string());
        return ExitCode::FAILURE;
    }

    match commands::run::run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
