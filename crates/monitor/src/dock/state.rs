//! Dock state machine
//!
//! Pure classification of successive device-set snapshots into dock
//! transitions. Only end-of-interval snapshots are compared, so a dock
//! indicator device that appears and vanishes between two polls is never
//! seen.

use common::{DeviceId, DeviceSet};
use std::fmt;

/// Static description of what "docked" means and what to do about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockConfiguration {
    /// Any one of these present means the dock is attached
    pub dock_indicator_devices: Vec<DeviceId>,
    /// Devices restarted, in order, after docking
    pub restart_devices: Vec<DeviceId>,
    /// Reset display resolution after undocking
    pub reset_resolution: bool,
}

impl DockConfiguration {
    /// Whether `devices` contains at least one dock indicator device
    pub fn is_docked(&self, devices: &DeviceSet) -> bool {
        devices.intersects(&self.dock_indicator_devices)
    }
}

/// Last classification of the device set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DockState {
    /// No snapshot has been classified yet
    #[default]
    Unknown,
    Docked,
    Undocked,
}

impl DockState {
    fn from_docked(docked: bool) -> Self {
        if docked {
            DockState::Docked
        } else {
            DockState::Undocked
        }
    }
}

impl fmt::Display for DockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DockState::Unknown => write!(f, "Unknown"),
            DockState::Docked => write!(f, "Docked"),
            DockState::Undocked => write!(f, "Undocked"),
        }
    }
}

/// Dock transition to act upon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    BecameDocked,
    BecameUndocked,
}

impl Transition {
    fn towards(docked: bool) -> Self {
        if docked {
            Transition::BecameDocked
        } else {
            Transition::BecameUndocked
        }
    }
}

/// Result of classifying one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub state: DockState,
    pub transition: Transition,
    /// The snapshot differs from the previous one (or is the first one)
    pub changed: bool,
}

/// Classify `current` against the previous snapshot and state
///
/// The first evaluation (state [`DockState::Unknown`]) always yields a
/// transition so startup actions run once whatever the physical state.
/// After that, an identical snapshot is a no-op, and a changed snapshot
/// only yields a transition when the docked classification flips.
pub fn evaluate(
    previous: Option<&DeviceSet>,
    state: DockState,
    current: &DeviceSet,
    config: &DockConfiguration,
) -> Evaluation {
    if state != DockState::Unknown && previous == Some(current) {
        return Evaluation {
            state,
            transition: Transition::None,
            changed: false,
        };
    }

    let docked = config.is_docked(current);
    let new_state = DockState::from_docked(docked);

    let transition = if state == new_state {
        Transition::None
    } else {
        Transition::towards(docked)
    };

    Evaluation {
        state: new_state,
        transition,
        changed: true,
    }
}
