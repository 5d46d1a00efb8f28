//! Logging setup
//!
//! The binary installs a console subscriber once. A prediction run
//! additionally appends to its own log file for exactly the duration of
//! the run: the file is opened when the run starts and closed when the
//! run's closure returns, on success and on failure alike.

use crate::error::Result;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "survey_inference=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global console subscriber; later calls are no-ops
pub fn init_console() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run `f` with events also appended to the log file at `path`
pub fn with_run_log<T>(path: &Path, f: impl FnOnce() -> T) -> Result<T> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let subscriber = tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .with(fmt::layer().with_writer(std::io::stderr));

    Ok(tracing::subscriber::with_default(subscriber, f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_receives_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Prediction_Logs").join("Prediction_Log.txt");

        let value = with_run_log(&path, || {
            tracing::info!(rows = 3, "Start of Prediction");
            42
        })
        .unwrap();
        assert_eq!(value, 42);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Start of Prediction"));
        assert!(contents.contains("rows=3"));
    }

    #[test]
    fn test_run_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        with_run_log(&path, || tracing::info!("first run")).unwrap();
        with_run_log(&path, || tracing::info!("second run")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("first run"));
        assert!(contents.contains("second run"));
    }
}
