//! Common error types
//!
//! Three classes of failure exist at runtime:
//! - [`EnumerationError`]: transient, retried and backed off, never fatal
//! - [`ActionError`]: one failed side-effect step during a dispatch
//! - [`ConfigError`]: fatal, the monitor refuses to start

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to read the current set of attached USB devices
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnumerationError {
    #[error("USB context unavailable: {0}")]
    Context(String),

    #[error("Device list query failed: {0}")]
    DeviceList(String),

    #[error("Enumeration failed after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        last: Box<EnumerationError>,
    },
}

/// Failure of a single side-effect step
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Step panicked: {0}")]
    Panicked(String),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}: {stderr}", describe_exit(.code))]
    ExitStatus {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} did not finish within {after:?}")]
    Timeout { program: String, after: Duration },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("USB error: {0}")]
    Usb(String),

    #[error("Action not configured: {0}")]
    NotConfigured(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal configuration problem detected at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {}", c),
        None => "signal".to_string(),
    }
}

/// Failure setting up the process-wide logging
#[derive(Debug, Error)]
pub enum Error {
    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
