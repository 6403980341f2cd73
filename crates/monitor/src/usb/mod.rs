//! USB subsystem
//!
//! Device enumeration for the dock monitor:
//! - [`DeviceEnumerator`]: the snapshot seam the poll loop drives
//! - [`UsbEnumerator`]: libusb-backed implementation via rusb
//! - [`Retrying`]: fixed-delay retry wrapper around any enumerator

pub mod device;
pub mod enumerator;

pub use device::{DeviceSummary, device_id};
pub use enumerator::{DeviceEnumerator, Retrying, UsbEnumerator};
