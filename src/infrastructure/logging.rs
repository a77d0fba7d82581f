use crate::infrastructure::error::InfraError;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "calendar.log";
const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber writing to `logs_dir/calendar.log`. `RUST_LOG` overrides
/// the default `info` filter. Later calls leave the first subscriber in place.
pub fn init_logging(logs_dir: &Path) -> Result<PathBuf, InfraError> {
    fs::create_dir_all(logs_dir)?;
    let path = logs_dir.join(LOG_FILE);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init();
    if installed.is_err() {
        tracing::debug!(path = %path.display(), "tracing subscriber already installed");
    }
    Ok(path)
}
