//! Tracing setup shared by the CLI and GUI.
//!
//! Logs go to stderr and, when a path is configured, are appended to a log
//! file as well. `RUST_LOG` takes precedence over the configured level.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::EngineError;

/// Map a verbosity name onto a filter directive for the workspace crates.
pub fn filter_directive(verbosity: &str) -> String {
    let level = match verbosity.to_lowercase().as_str() {
        "error" => "error",
        "warn" | "warning" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    };
    format!(
        "winmigrate_engine={},winmigrate={},winmigrate_gui={}",
        level, level, level
    )
}

/// Install the global tracing subscriber.
///
/// # Errors
/// The log file cannot be opened, or a subscriber is already installed.
pub fn init_logging(verbosity: &str, log_file: Option<&Path>) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity)));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| EngineError::LoggingInit {
                    message: format!("{}: {}", path.display(), e),
                })?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| EngineError::LoggingInit {
            message: e.to_string(),
        })
}
