//! Device enumeration
//!
//! Reads the set of currently attached USB devices. The rusb context is
//! long-lived and is rebuilt after any failed query, so a bus reset or a
//! wedged libusb state does not poison later polls.

use crate::usb::device::{DeviceSummary, device_id};
use common::{DeviceId, DeviceSet, EnumerationError, RetryPolicy, Sleeper, retry};
use rusb::{Context, DeviceList, UsbContext};
use std::sync::Arc;
use tracing::{debug, warn};

/// Source of device-set snapshots
pub trait DeviceEnumerator {
    /// Capture the complete set of attached devices
    fn snapshot(&mut self) -> Result<DeviceSet, EnumerationError>;
}

/// Enumerator backed by libusb
pub struct UsbEnumerator {
    context: Option<Context>,
}

impl UsbEnumerator {
    pub fn new() -> Self {
        Self { context: None }
    }

    /// Describe every attached device, with string descriptors where readable
    pub fn describe(&mut self) -> Result<Vec<DeviceSummary>, EnumerationError> {
        let devices = self.device_list()?;

        let mut summaries: Vec<DeviceSummary> = devices
            .iter()
            .filter_map(|device| match DeviceSummary::read(&device) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    debug!(
                        "Skipping device bus={} addr={}: {}",
                        device.bus_number(),
                        device.address(),
                        e
                    );
                    None
                }
            })
            .collect();

        summaries.sort_by_key(|s| (s.bus_number, s.device_address));
        Ok(summaries)
    }

    fn device_list(&mut self) -> Result<DeviceList<Context>, EnumerationError> {
        let context = self.context()?;
        context.devices().map_err(|e| {
            self.reset_context();
            EnumerationError::DeviceList(e.to_string())
        })
    }

    fn context(&mut self) -> Result<Context, EnumerationError> {
        if let Some(context) = &self.context {
            return Ok(context.clone());
        }

        let context = Context::new().map_err(|e| EnumerationError::Context(e.to_string()))?;
        debug!("Created USB context");
        self.context = Some(context.clone());
        Ok(context)
    }

    fn reset_context(&mut self) {
        if self.context.take().is_some() {
            debug!("Dropped USB context, will recreate on next query");
        }
    }
}

impl Default for UsbEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator for UsbEnumerator {
    /// Fails as a whole if any device's descriptor is unreadable
    fn snapshot(&mut self) -> Result<DeviceSet, EnumerationError> {
        let devices = self.device_list()?;

        let result = collect_snapshot(devices.iter().map(|device| {
            device.device_descriptor().map(|d| device_id(&d)).map_err(|e| {
                EnumerationError::DeviceList(format!(
                    "descriptor of bus={} addr={}: {}",
                    device.bus_number(),
                    device.address(),
                    e
                ))
            })
        }));

        if result.is_err() {
            self.reset_context();
        }
        result
    }
}

/// A snapshot is all-or-nothing; one unreadable entry fails it
fn collect_snapshot<I>(entries: I) -> Result<DeviceSet, EnumerationError>
where
    I: IntoIterator<Item = Result<DeviceId, EnumerationError>>,
{
    entries.into_iter().collect()
}

/// Wraps an enumerator with a fixed-delay retry policy
///
/// Surfaces [`EnumerationError::Exhausted`] once every attempt has failed.
pub struct Retrying<E> {
    inner: E,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl<E: DeviceEnumerator> Retrying<E> {
    pub fn new(inner: E, policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            inner,
            policy,
            sleeper,
        }
    }

    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.inner
    }
}

impl<E: DeviceEnumerator> DeviceEnumerator for Retrying<E> {
    fn snapshot(&mut self) -> Result<DeviceSet, EnumerationError> {
        let inner = &mut self.inner;
        retry(self.policy, self.sleeper.as_ref(), "USB enumeration", |_| {
            inner.snapshot()
        })
        .map_err(|e| {
            warn!(
                "USB enumeration failed after {} attempt(s): {}",
                e.attempts, e.last
            );
            EnumerationError::Exhausted {
                attempts: e.attempts,
                last: Box::new(e.last),
            }
        })
    }
}
