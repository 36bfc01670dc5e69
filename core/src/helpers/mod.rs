use std::path::Path;

use dotenv::from_path;

mod duration;
pub use duration::{format_duration, rows_per_second};

/// Loads a `.env` file sitting next to the config, if any, so `${VAR}` references resolve.
pub fn load_env_from_config_path(config_path: &Path) {
    let dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let _ = from_path(dir.join(".env"));
}
