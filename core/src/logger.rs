use tracing::debug;
use tracing_subscriber::{
    filter::{Directive, ParseError},
    fmt::format::{Format, Writer},
    EnvFilter,
};

struct CustomTimer;

impl tracing_subscriber::fmt::time::FormatTime for CustomTimer {
    fn format_time(&self, writer: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Local::now();
        write!(writer, "{} - {}", now.format("%d %B"), now.format("%H:%M:%S%.3f"))
    }
}

#[derive(thiserror::Error, Debug)]
#[error("Invalid log filter {filter:?}: {source}")]
pub struct InvalidLogFilter {
    filter: String,
    #[source]
    source: ParseError,
}

impl InvalidLogFilter {
    fn new(filter: &str, source: ParseError) -> Self {
        Self { filter: filter.to_string(), source }
    }
}

/// Builds the filter from a `--log-level` value, which is either a bare level such as
/// `debug` or a list of directives like `bulk_updater=debug,warn`.
///
/// `env_directives` (normally `RUST_LOG`) are added afterwards and win for the targets they
/// name.
pub fn build_filter(
    log_level: &str,
    env_directives: Option<&str>,
) -> Result<EnvFilter, InvalidLogFilter> {
    let mut filter =
        EnvFilter::try_new(log_level.trim()).map_err(|e| InvalidLogFilter::new(log_level, e))?;

    for raw in env_directives.unwrap_or_default().split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let directive = raw.parse::<Directive>().map_err(|e| InvalidLogFilter::new(raw, e))?;
        filter = filter.add_directive(directive);
    }

    Ok(filter)
}

/// Installs the global subscriber. A second call keeps the first subscriber.
pub fn setup_logger(log_level: &str) -> Result<(), InvalidLogFilter> {
    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(log_level, env_directives.as_deref())?;

    let format = Format::default().with_timer(CustomTimer).with_level(true).with_target(false);

    let subscriber =
        tracing_subscriber::fmt().with_env_filter(filter).event_format(format).finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        debug!("Logger has already been set up, continuing...");
    }

    Ok(())
}
