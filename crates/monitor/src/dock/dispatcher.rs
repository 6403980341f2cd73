//! Action dispatch for dock transitions
//!
//! Every step is attempted regardless of earlier failures; the outcome of
//! each is recorded in the returned [`DispatchResult`].

use crate::actions::{AudioProfile, AudioProfileService, DeviceRestartService, DisplayResetService};
use crate::dock::state::{DockConfiguration, Transition};
use common::{ActionError, DeviceId, Sleeper};
use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// One side effect attempted during a dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStep {
    RestartDevice(DeviceId),
    LoadAudioProfile(AudioProfile),
    ResetDisplay,
}

impl fmt::Display for ActionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStep::RestartDevice(id) => write!(f, "restart device {}", id),
            ActionStep::LoadAudioProfile(p) => write!(f, "load '{}' audio profile", p),
            ActionStep::ResetDisplay => write!(f, "reset display resolution"),
        }
    }
}

#[derive(Debug)]
pub struct StepOutcome {
    pub step: ActionStep,
    pub result: Result<(), ActionError>,
}

/// Outcomes of every step of one dispatch, in execution order
#[derive(Debug, Default)]
pub struct DispatchResult {
    pub steps: Vec<StepOutcome>,
}

impl DispatchResult {
    pub fn attempted(&self) -> usize {
        self.steps.len()
    }

    pub fn failures(&self) -> Vec<&StepOutcome> {
        self.steps.iter().filter(|s| s.result.is_err()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.steps.iter().all(|s| s.result.is_ok())
    }

    fn record(&mut self, step: ActionStep, result: Result<(), ActionError>) {
        match &result {
            Ok(()) => info!("Step succeeded: {}", step),
            Err(e) => warn!("Step failed: {}: {}", step, e),
        }
        self.steps.push(StepOutcome { step, result });
    }
}

/// Executes the docked/undocked action sequences
pub struct ActionDispatcher {
    audio: Box<dyn AudioProfileService>,
    restarter: Box<dyn DeviceRestartService>,
    display: Box<dyn DisplayResetService>,
    settle_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl ActionDispatcher {
    pub fn new(
        audio: Box<dyn AudioProfileService>,
        restarter: Box<dyn DeviceRestartService>,
        display: Box<dyn DisplayResetService>,
        settle_delay: Duration,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            audio,
            restarter,
            display,
            settle_delay,
            sleeper,
        }
    }

    /// Run the side effects for `transition`
    ///
    /// [`Transition::None`] does nothing and returns an empty result.
    pub fn dispatch(&self, transition: Transition, config: &DockConfiguration) -> DispatchResult {
        match transition {
            Transition::None => DispatchResult::default(),
            Transition::BecameDocked => self.on_docked(config),
            Transition::BecameUndocked => self.on_undocked(config),
        }
    }

    fn on_docked(&self, config: &DockConfiguration) -> DispatchResult {
        info!("Docking station connected");

        // Let devices that came up with the dock finish initializing
        if !self.settle_delay.is_zero() {
            info!("Waiting {:?} for docked devices to settle", self.settle_delay);
            self.sleeper.sleep(self.settle_delay);
        }

        let mut result = DispatchResult::default();

        for device in &config.restart_devices {
            info!("Restarting device {}", device);
            let outcome = guarded(|| self.restarter.restart(device));
            result.record(ActionStep::RestartDevice(device.clone()), outcome);
        }

        let outcome = guarded(|| self.audio.load_profile(AudioProfile::Docked));
        result.record(ActionStep::LoadAudioProfile(AudioProfile::Docked), outcome);

        self.summarize("Docked", &result);
        result
    }

    fn on_undocked(&self, config: &DockConfiguration) -> DispatchResult {
        info!("Docking station disconnected");

        let mut result = DispatchResult::default();

        let outcome = guarded(|| self.audio.load_profile(AudioProfile::Undocked));
        result.record(ActionStep::LoadAudioProfile(AudioProfile::Undocked), outcome);

        if config.reset_resolution {
            let outcome = guarded(|| self.display.reset());
            result.record(ActionStep::ResetDisplay, outcome);
        }

        self.summarize("Undocked", &result);
        result
    }

    fn summarize(&self, name: &str, result: &DispatchResult) {
        let failed = result.failures().len();
        if failed == 0 {
            info!("[{}] all {} action(s) succeeded", name, result.attempted());
        } else {
            warn!(
                "[{}] {} of {} action(s) failed",
                name,
                failed,
                result.attempted()
            );
        }
    }
}

/// Run one collaborator call, turning a panic into a failed step
fn guarded<F>(call: F) -> Result<(), ActionError>
where
    F: FnOnce() -> Result<(), ActionError>,
{
    catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|panic| Err(ActionError::Panicked(panic_message(panic.as_ref()))))
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
