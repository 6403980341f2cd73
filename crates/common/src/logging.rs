//! Logging setup and configuration

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Setup tracing subscriber for the application
///
/// Logs go to stderr, and additionally to a daily-rolling file when
/// `log_file` is given. The returned guard must be held until exit so the
/// file writer is flushed.
pub fn setup_logging(default_level: &str, log_file: Option<&Path>) -> crate::Result<Option<WorkerGuard>> {
    let filter = build_filter(default_level)?;

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| crate::Error::Logging(format!("Invalid log file path: {}", path.display())))?;

            std::fs::create_dir_all(dir)?;

            let appender = tracing_appender::rolling::daily(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::Error::Logging(e.to_string()))?;

    Ok(guard)
}

/// RUST_LOG wins over the configured level
fn build_filter(default_level: &str) -> crate::Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| crate::Error::Logging(format!("Invalid log filter: {}", e)))
}
