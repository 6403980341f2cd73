//! Poll loop
//!
//! Single thread of control: enumerate, classify, dispatch, wait. A tick
//! never overlaps another, so the dock state and the last snapshot need no
//! locking. There is no cancellation; the loop ends with the process.

use crate::dock::dispatcher::{ActionDispatcher, DispatchResult, panic_message};
use crate::dock::state::{DockConfiguration, DockState, Transition, evaluate};
use crate::usb::DeviceEnumerator;
use common::{DeviceSet, EnumerationError, Sleeper};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Waits between polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimings {
    /// Wait after a poll that saw no change
    pub poll_interval: Duration,
    /// Wait after enumeration failed (or a tick panicked)
    pub failure_backoff: Duration,
}

impl Default for PollTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            failure_backoff: Duration::from_secs(5),
        }
    }
}

/// What a single tick did
#[derive(Debug)]
pub enum TickOutcome {
    /// Snapshot identical to the previous one
    Unchanged,
    /// Snapshot changed but the docked classification did not
    ChangedSameState,
    /// Classification flipped (or was made for the first time) and actions ran
    Transitioned {
        from: DockState,
        transition: Transition,
        result: DispatchResult,
    },
    /// Enumeration failed after its retries; nothing was updated
    EnumerationFailed(EnumerationError),
}

pub struct DockMonitor<E> {
    enumerator: E,
    dispatcher: ActionDispatcher,
    config: Arc<DockConfiguration>,
    timings: PollTimings,
    sleeper: Arc<dyn Sleeper>,
    state: DockState,
    previous: Option<DeviceSet>,
}

impl<E: DeviceEnumerator> DockMonitor<E> {
    pub fn new(
        enumerator: E,
        dispatcher: ActionDispatcher,
        config: Arc<DockConfiguration>,
        timings: PollTimings,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            enumerator,
            dispatcher,
            config,
            timings,
            sleeper,
            state: DockState::Unknown,
            previous: None,
        }
    }

    pub fn state(&self) -> DockState {
        self.state
    }

    /// Last successfully captured snapshot
    pub fn previous(&self) -> Option<&DeviceSet> {
        self.previous.as_ref()
    }

    /// Poll forever
    pub fn run(&mut self) -> ! {
        info!(
            "Starting USB device monitoring ({} dock indicator device(s), poll every {:?})",
            self.config.dock_indicator_devices.len(),
            self.timings.poll_interval
        );

        loop {
            self.step();
        }
    }

    /// One tick followed by the wait it calls for
    ///
    /// Collaborator panics are already contained per step by the
    /// dispatcher. Any other panic inside the tick is logged and handled
    /// like a failed enumeration: the state is kept and the loop backs off.
    pub fn step(&mut self) -> Option<TickOutcome> {
        match catch_unwind(AssertUnwindSafe(|| self.tick())) {
            Ok(outcome) => {
                if let Some(wait) = self.wait_after(&outcome) {
                    self.sleeper.sleep(wait);
                }
                Some(outcome)
            }
            Err(panic) => {
                error!("Panic in monitor tick: {}", panic_message(panic.as_ref()));
                self.sleeper.sleep(self.timings.failure_backoff);
                None
            }
        }
    }

    /// Enumerate once, classify, and dispatch if the classification flipped
    pub fn tick(&mut self) -> TickOutcome {
        let current = match self.enumerator.snapshot() {
            Ok(set) => set,
            Err(e) => {
                error!(
                    "Device enumeration failed, retrying in {:?}: {}",
                    self.timings.failure_backoff, e
                );
                return TickOutcome::EnumerationFailed(e);
            }
        };

        let evaluation = evaluate(self.previous.as_ref(), self.state, &current, &self.config);
        if !evaluation.changed {
            return TickOutcome::Unchanged;
        }

        if let Some(previous) = &self.previous {
            debug!(
                "Device list changed (prev={}, cur={})",
                previous.len(),
                current.len()
            );
            debug!("Removed: {:?}", current.removed_since(previous));
            debug!("Added: {:?}", current.added_since(previous));
        }

        let from = self.state;
        self.state = evaluation.state;
        self.previous = Some(current);

        if evaluation.transition == Transition::None {
            debug!("Dock state unchanged: {}", self.state);
            return TickOutcome::ChangedSameState;
        }

        info!("Dock state changed: {} -> {}", from, self.state);
        let result = self.dispatcher.dispatch(evaluation.transition, &self.config);

        TickOutcome::Transitioned {
            from,
            transition: evaluation.transition,
            result,
        }
    }

    /// Changes are followed up immediately; quiet and failed polls wait
    fn wait_after(&self, outcome: &TickOutcome) -> Option<Duration> {
        match outcome {
            TickOutcome::Unchanged => Some(self.timings.poll_interval),
            TickOutcome::EnumerationFailed(_) => Some(self.timings.failure_backoff),
            TickOutcome::ChangedSameState | TickOutcome::Transitioned { .. } => None,
        }
    }
}
