//! Side-effect collaborators
//!
//! The dispatcher only talks to these narrow traits. Concrete
//! implementations shell out to helper programs or use libusb directly.

pub mod audio;
pub mod command;
pub mod display;
pub mod restart;

use common::{ActionError, DeviceId};
use std::fmt;

pub use audio::HelperAudioProfiles;
pub use command::{CommandRunner, CommandTemplate};
pub use display::CommandDisplayReset;
pub use restart::{CommandRestarter, UsbResetRestarter};

/// Logical audio profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioProfile {
    Docked,
    Undocked,
}

impl AudioProfile {
    pub fn name(&self) -> &'static str {
        match self {
            AudioProfile::Docked => "docked",
            AudioProfile::Undocked => "undocked",
        }
    }
}

impl fmt::Display for AudioProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Loads and saves the system audio configuration
pub trait AudioProfileService: Send {
    fn load_profile(&self, profile: AudioProfile) -> Result<(), ActionError>;

    fn save_profile(&self, profile: AudioProfile) -> Result<(), ActionError>;
}

/// Restarts a single device
pub trait DeviceRestartService: Send {
    fn restart(&self, device: &DeviceId) -> Result<(), ActionError>;
}

/// Restores the display mode after the external monitor goes away
pub trait DisplayResetService: Send {
    fn reset(&self) -> Result<(), ActionError>;
}
