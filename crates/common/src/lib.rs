//! Common utilities for dock-monitor
//!
//! This crate provides the types shared between the device enumerator and
//! the dock logic, the error taxonomy, the fixed-delay retry helper, and
//! logging setup.

pub mod device;
pub mod error;
pub mod logging;
pub mod retry;

pub use device::{DeviceId, DeviceSet};
pub use error::{ActionError, ConfigError, EnumerationError, Error, Result};
pub use logging::setup_logging;
pub use retry::{RecordingSleeper, RetryExhausted, RetryPolicy, Sleeper, ThreadSleeper, retry};
