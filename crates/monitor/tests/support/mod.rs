//! Recording fakes for the dock monitor's collaborators
//!
//! Every fake appends to a shared call log so tests can assert on the exact
//! order of side effects across collaborators.

#![allow(dead_code)]

use common::{ActionError, DeviceId, DeviceSet, EnumerationError, RecordingSleeper};
use monitor::actions::{
    AudioProfile, AudioProfileService, DeviceRestartService, DisplayResetService,
};
use monitor::dock::{ActionDispatcher, DockConfiguration, DockMonitor, PollTimings};
use monitor::usb::DeviceEnumerator;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DOCK: &str = "1A2B-0001-0100-0200";
pub const KEYBOARD: &str = "046D-C31C-6400-0110";
pub const MOUSE: &str = "046D-C077-7200-0200";

pub fn set(ids: &[&str]) -> DeviceSet {
    ids.iter().map(|s| DeviceId::from(*s)).collect()
}

pub fn busy() -> EnumerationError {
    EnumerationError::DeviceList("Resource busy".to_string())
}

/// Shared, ordered log of collaborator calls
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

pub struct RecordingAudio {
    pub log: CallLog,
    pub fail: bool,
}

impl AudioProfileService for RecordingAudio {
    fn load_profile(&self, profile: AudioProfile) -> Result<(), ActionError> {
        self.log.push(format!("audio:{}", profile));
        if self.fail {
            Err(ActionError::NotFound(format!("{} profile", profile)))
        } else {
            Ok(())
        }
    }

    fn save_profile(&self, profile: AudioProfile) -> Result<(), ActionError> {
        self.log.push(format!("save-audio:{}", profile));
        Ok(())
    }
}

pub struct RecordingRestarter {
    pub log: CallLog,
    /// Devices whose restart fails
    pub failing: Vec<DeviceId>,
    /// Devices whose restart panics
    pub panicking: Vec<DeviceId>,
}

impl DeviceRestartService for RecordingRestarter {
    fn restart(&self, device: &DeviceId) -> Result<(), ActionError> {
        self.log.push(format!("restart:{}", device));
        if self.panicking.contains(device) {
            panic!("restart of {} blew up", device);
        }
        if self.failing.contains(device) {
            return Err(ActionError::ExitStatus {
                program: "pnputil".to_string(),
                code: Some(1),
                stderr: "device not found".to_string(),
            });
        }
        Ok(())
    }
}

pub struct RecordingDisplay {
    pub log: CallLog,
}

impl DisplayResetService for RecordingDisplay {
    fn reset(&self) -> Result<(), ActionError> {
        self.log.push("display:reset");
        Ok(())
    }
}

/// Enumerator that replays a fixed script, then repeats its last snapshot
pub struct ScriptedEnumerator {
    script: VecDeque<Result<DeviceSet, EnumerationError>>,
    last: DeviceSet,
    pub calls: Arc<Mutex<u32>>,
}

impl ScriptedEnumerator {
    pub fn new(script: Vec<Result<DeviceSet, EnumerationError>>) -> Self {
        Self {
            script: script.into(),
            last: DeviceSet::new(),
            calls: Arc::new(Mutex::new(0)),
        }
    }
}

impl DeviceEnumerator for ScriptedEnumerator {
    fn snapshot(&mut self) -> Result<DeviceSet, EnumerationError> {
        *self.calls.lock().unwrap() += 1;
        match self.script.pop_front() {
            Some(Ok(set)) => {
                self.last = set.clone();
                Ok(set)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last.clone()),
        }
    }
}

/// Knobs for building a dispatcher out of recording fakes
#[derive(Default)]
pub struct Fakes {
    pub audio_fails: bool,
    pub failing_restarts: Vec<DeviceId>,
    pub panicking_restarts: Vec<DeviceId>,
}

impl Fakes {
    pub fn dispatcher(
        self,
        log: &CallLog,
        settle_delay: Duration,
        sleeper: Arc<RecordingSleeper>,
    ) -> ActionDispatcher {
        ActionDispatcher::new(
            Box::new(RecordingAudio {
                log: log.clone(),
                fail: self.audio_fails,
            }),
            Box::new(RecordingRestarter {
                log: log.clone(),
                failing: self.failing_restarts,
                panicking: self.panicking_restarts,
            }),
            Box::new(RecordingDisplay { log: log.clone() }),
            settle_delay,
            sleeper,
        )
    }
}

pub fn dock_config(restart: &[&str], reset_resolution: bool) -> DockConfiguration {
    DockConfiguration {
        dock_indicator_devices: vec![DeviceId::from(DOCK)],
        restart_devices: restart.iter().map(|s| DeviceId::from(*s)).collect(),
        reset_resolution,
    }
}

pub const SETTLE: Duration = Duration::from_secs(10);

/// Monitor over `enumerator` with default timings and recording fakes
pub fn monitor_with<E: DeviceEnumerator>(
    enumerator: E,
    config: DockConfiguration,
    fakes: Fakes,
    log: &CallLog,
    sleeper: Arc<RecordingSleeper>,
) -> DockMonitor<E> {
    DockMonitor::new(
        enumerator,
        fakes.dispatcher(log, SETTLE, sleeper.clone()),
        Arc::new(config),
        PollTimings::default(),
        sleeper,
    )
}
