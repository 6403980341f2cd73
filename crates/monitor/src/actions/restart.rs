//! Device restart backends
//!
//! - [`CommandRestarter`]: an OS tool such as `pnputil /restart-device`
//! - [`UsbResetRestarter`]: a USB port reset of every attached device
//!   whose identity matches

use crate::actions::DeviceRestartService;
use crate::actions::command::{CommandRunner, CommandTemplate};
use crate::usb::device_id;
use common::{ActionError, DeviceId};
use rusb::{Context, UsbContext};
use tracing::{debug, info, warn};

pub struct CommandRestarter {
    template: CommandTemplate,
    runner: CommandRunner,
}

impl CommandRestarter {
    pub fn new(template: CommandTemplate, runner: CommandRunner) -> Self {
        Self { template, runner }
    }
}

impl DeviceRestartService for CommandRestarter {
    fn restart(&self, device: &DeviceId) -> Result<(), ActionError> {
        if self.template.is_empty() {
            return Err(ActionError::NotConfigured("restart command".to_string()));
        }

        let parts = self.template.render("device", device.as_str());
        self.runner.run_parts(&parts)?;
        info!("Restarted device {}", device);
        Ok(())
    }
}

/// Resets matching devices through libusb
///
/// A fresh context is used per call so no handles outlive the restart.
#[derive(Debug, Default)]
pub struct UsbResetRestarter;

impl UsbResetRestarter {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceRestartService for UsbResetRestarter {
    fn restart(&self, target: &DeviceId) -> Result<(), ActionError> {
        let context = Context::new().map_err(|e| ActionError::Usb(e.to_string()))?;
        let devices = context
            .devices()
            .map_err(|e| ActionError::Usb(e.to_string()))?;

        let mut matched = 0;
        let mut reset = 0;
        let mut last_error = None;

        for device in devices.iter() {
            let Ok(descriptor) = device.device_descriptor() else {
                continue;
            };
            if device_id(&descriptor) != *target {
                continue;
            }
            matched += 1;

            match open_and_reset(|| device.open(), |handle| handle.reset()) {
                Ok(()) => {
                    debug!(
                        "Reset {} at bus={} addr={}",
                        target,
                        device.bus_number(),
                        device.address()
                    );
                    reset += 1;
                }
                Err(e) => {
                    warn!(
                        "Failed to reset {} at bus={} addr={}: {}",
                        target,
                        device.bus_number(),
                        device.address(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        if matched == 0 {
            return Err(ActionError::NotFound(format!("USB device {}", target)));
        }
        if reset == 0 {
            let message = last_error.map_or_else(|| "reset failed".to_string(), |e| e.to_string());
            return Err(ActionError::Usb(message));
        }

        info!("Restarted {} of {} device(s) matching {}", reset, matched, target);
        Ok(())
    }
}

/// Open a device and reset it
///
/// The device re-enumerates during a reset and may vanish from under the
/// handle, so `NotFound` from the reset itself counts as success. `NotFound`
/// from opening means no reset was issued.
fn open_and_reset<H>(
    open: impl FnOnce() -> rusb::Result<H>,
    reset: impl FnOnce(&mut H) -> rusb::Result<()>,
) -> rusb::Result<()> {
    let mut handle = open()?;
    match reset(&mut handle) {
        Ok(()) | Err(rusb::Error::NotFound) => Ok(()),
        Err(e) => Err(e),
    }
}
