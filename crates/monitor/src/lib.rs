//! dock-monitor
//!
//! Watches the set of attached USB devices and reacts when a docking
//! station is connected or disconnected: restarts designated devices,
//! switches the audio profile and optionally resets the display mode.

pub mod actions;
pub mod app;
pub mod config;
pub mod detect;
pub mod dock;
pub mod usb;

pub use config::MonitorConfig;
pub use dock::{DockConfiguration, DockMonitor, DockState, Transition};
