use clap::Parser;

#[allow(clippy::upper_case_acronyms)]
#[derive(Parser, Debug)]
#[clap(
    name = "bulk-updater",
    version,
    about = "Applies a bulk UPDATE to a postgres table from a file of ids, one transaction per batch",
    long_about = None
)]
pub struct CLI {
    /// The yaml config holding the database connection and the target table.
    #[clap(default_value = "updater.yaml")]
    pub config: String,

    /// The file of ids to update, one per line. Use `-` to read from stdin.
    #[clap(default_value = "updater.txt")]
    pub input: String,

    /// optional - Overrides `batch_size` from the config.
    #[clap(long, short)]
    pub batch_size: Option<usize>,

    /// Log level (`debug`) or filter directives (`bulk_updater=debug,warn`). `RUST_LOG`
    /// directives are added on top.
    #[clap(long, default_value = "info")]
    pub log_level: String,
}
