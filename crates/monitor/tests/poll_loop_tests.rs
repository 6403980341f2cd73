//! Poll loop tests
//!
//! Drive [`DockMonitor::step`] with scripted snapshots, recording fakes and
//! a recording sleeper; no real time passes.

mod support;

use common::{ActionError, DeviceId, EnumerationError, RecordingSleeper, RetryPolicy};
use monitor::dock::{ActionStep, DockState, TickOutcome, Transition};
use monitor::usb::{DeviceEnumerator, Retrying};
use std::sync::Arc;
use std::time::Duration;
use support::{
    CallLog, DOCK, Fakes, KEYBOARD, MOUSE, SETTLE, ScriptedEnumerator, busy, dock_config, monitor_with,
    set,
};

const POLL: Duration = Duration::from_secs(2);
const BACKOFF: Duration = Duration::from_secs(5);

mod startup {
    use super::*;

    #[test]
    fn test_first_poll_undocked_runs_undocked_actions() {
        let log = CallLog::default();
        let sleeper = Arc::new(RecordingSleeper::new());
        let enumerator = ScriptedEnumerator::new(vec![Ok(set(&[KEYBOARD]))]);
        let mut m = monitor_with(enumerator, dock_config(&[], true), Fakes::default(), &log, sleeper.clone());

        match m.step() {
            Some(TickOutcome::Transitioned { from, transition, result }) => {
                assert_eq!(from, DockState::Unknown);
                assert_eq!(transition, Transition::BecameUndocked);
                assert!(result.is_success());
            }
            other => panic!("expected a transition, got {:?}", other),
        }
        assert_eq!(log.calls(), vec!["audio:undocked", "display:reset"]);
        assert_eq!(m.state(), DockState::Undocked);
        // No wait after a change
        assert!(sleeper.waits().is_empty());
    }

    #[test]
    fn test_first_poll_docked_settles_before_actions() {
        let log = CallLog::default();
        let sleeper = Arc::new(RecordingSleeper::new());
        let enumerator = ScriptedEnumerator::new(vec![Ok(set(&[DOCK]))]);
        let mut m = monitor_with(enumerator, dock_config(&["R1"], false), Fakes::default(), &log, sleeper.clone());

        m.step();

        assert_eq!(m.state(), DockState::Docked);
        assert_eq!(log.calls(), vec!["restart:R1", "audio:docked"]);
        assert_eq!(sleeper.waits(), vec![SETTLE]);
    }
}

mod steady_state {
    use super::*;

    #[test]
    fn test_unchanged_snapshot_waits_poll_interval_without_dispatch() {
        let log = CallLog::default();
        let sleeper = Arc::new(RecordingSleeper::new());
        let enumerator = ScriptedEnumerator::new(vec![Ok(set(&[KEYBOARD]))]);
        let mut m = monitor_with(enumerator, dock_config(&[], false), Fakes::default(), &log, sleeper.clone());

        m.step();
        log.clear();

        for _ in 0..3 {
            assert!(matches!(m.step(), Some(TickOutcome::Unchanged)));
        }
        assert!(log.calls().is_empty());
        assert_eq!(sleeper.waits(), vec![POLL, POLL, POLL]);
    }

    #[test]
    fn test_dock_connected_while_running() {
        let log = CallLog::default();
        let sleeper = Arc::new(RecordingSleeper::new());
        let enumerator = ScriptedEnumerator::new(vec![
            Ok(set(&[KEYBOARD])),
            Ok(set(&[KEYBOARD, DOCK])),
        ]);
        let mut m = monitor_with(
            enumerator,
            dock_config(&["R1", "R2"], false),
            Fakes::default(),
            &log,
            sleeper.clone(),
        );

        m.step();
        log.clear();
        sleeper.clear();

        match m.step() {
            Some(TickOutcome::Transitioned { from, transition, .. }) => {
                assert_eq!(from, DockState::Undocked);
                assert_eq!(transition, Transition::BecameDocked);
            }
            other => panic!("expected a transition, got {:?}", other),
        }
        assert_eq!(log.calls(), vec!["restart:R1", "restart:R2", "audio:docked"]);
        assert_eq!(sleeper.waits(), vec![SETTLE]);
        assert_eq!(m.previous(), Some(&set(&[KEYBOARD, DOCK])));
    }

    #[test]
    fn test_unrelated_device_change_updates_snapshot_only() {
        let log = CallLog::default();
        let sleeper = Arc::new(RecordingSleeper::new());
        let enumerator = ScriptedEnumerator::new(vec![
            Ok(set(&[DOCK])),
            Ok(set(&[DOCK, MOUSE])),
        ]);
        let mut m = monitor_with(enumerator, dock_config(&[], false), Fakes::default(), &log, sleeper.clone());

        m.step();
        log.clear();
        sleeper.clear();

        assert!(matches!(m.step(), Some(TickOutcome::ChangedSameState)));
        assert!(log.calls().is_empty());
        assert!(sleeper.waits().is_empty());
        assert_eq!(m.state(), DockState::Docked);
        assert_eq!(m.previous(), Some(&set(&[DOCK, MOUSE])));
    }

    #[test]
    fn test_dock_disconnected_while_running() {
        let log = CallLog::default();
        let sleeper = Arc::new(RecordingSleeper::new());
        let enumerator = ScriptedEnumerator::new(vec![
            Ok(set(&[DOCK, KEYBOARD])),
            Ok(set(&[KEYBOARD])),
        ]);
        let mut m = monitor_with(enumerator, dock_config(&["R1"], true), Fakes::default(), &log, sleeper);

        m.step();
        log.clear();
        m.step();

        assert_eq!(m.state(), DockState::Undocked);
        assert_eq!(log.calls(), vec!["audio:undocked", "display:reset"]);
    }
}

mod failures {
    use super::*;

    #[test]
    fn test_enumeration_exhausted_keeps_state_and_backs_off() {
        let log = CallLog::default();
        let sleeper = Arc::new(RecordingSleeper::new());
        let script = ScriptedEnumerator::new(vec![
            Ok(set(&[DOCK])),
            Err(busy()),
            Err(busy()),
            Err(busy()),
            Ok(set(&[DOCK])),
        ]);
        let calls = script.calls.clone();
        let enumerator = Retrying::new(script, RetryPolicy::default(), sleeper.clone());
        let mut m = monitor_with(enumerator, dock_config(&[], false), Fakes::default(), &log, sleeper.clone());

        m.step();
        log.clear();
        sleeper.clear();

        match m.step() {
            Some(TickOutcome::EnumerationFailed(EnumerationError::Exhausted { attempts, .. })) => {
                assert_eq!(attempts, 3);
            }
            other => panic!("expected exhausted enumeration, got {:?}", other),
        }
        assert_eq!(*calls.lock().unwrap(), 4);
        // Two retry delays, then the failure backoff
        assert_eq!(
            sleeper.waits(),
            vec![Duration::from_secs(1), Duration::from_secs(1), BACKOFF]
        );
        assert_eq!(m.state(), DockState::Docked);
        assert_eq!(m.previous(), Some(&set(&[DOCK])));
        assert!(log.calls().is_empty());

        // Recovery with the same set is quiet
        sleeper.clear();
        assert!(matches!(m.step(), Some(TickOutcome::Unchanged)));
        assert_eq!(sleeper.waits(), vec![POLL]);
    }

    #[test]
    fn test_failed_action_does_not_stop_the_loop() {
        let log = CallLog::default();
        let sleeper = Arc::new(RecordingSleeper::new());
        let enumerator = ScriptedEnumerator::new(vec![Ok(set(&[DOCK]))]);
        let fakes = Fakes {
            audio_fails: true,
            ..Fakes::default()
        };
        let mut m = monitor_with(enumerator, dock_config(&[], false), fakes, &log, sleeper);

        match m.step() {
            Some(TickOutcome::Transitioned { result, .. }) => {
                assert_eq!(result.failures().len(), 1);
            }
            other => panic!("expected a transition, got {:?}", other),
        }
        assert_eq!(m.state(), DockState::Docked);
        assert!(matches!(m.step(), Some(TickOutcome::Unchanged)));
    }

    #[test]
    fn test_panicking_collaborator_does_not_abort_remaining_steps() {
        let log = CallLog::default();
        let sleeper = Arc::new(RecordingSleeper::new());
        let enumerator = ScriptedEnumerator::new(vec![Ok(set(&[DOCK]))]);
        let fakes = Fakes {
            panicking_restarts: vec![DeviceId::from("R1")],
            ..Fakes::default()
        };
        let mut m = monitor_with(enumerator, dock_config(&["R1", "R2"], false), fakes, &log, sleeper.clone());

        match m.step() {
            Some(TickOutcome::Transitioned { result, .. }) => {
                assert_eq!(result.attempted(), 3);
                let failures = result.failures();
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].step, ActionStep::RestartDevice(DeviceId::from("R1")));
                assert!(matches!(failures[0].result, Err(ActionError::Panicked(_))));
            }
            other => panic!("expected a transition, got {:?}", other),
        }
        assert_eq!(log.calls(), vec!["restart:R1", "restart:R2", "audio:docked"]);
        assert_eq!(sleeper.waits(), vec![SETTLE]);

        // Nothing is re-fired for the same set
        log.clear();
        assert!(matches!(m.step(), Some(TickOutcome::Unchanged)));
        assert!(log.calls().is_empty());
        assert_eq!(m.state(), DockState::Docked);
    }

    struct PanickingEnumerator;

    impl DeviceEnumerator for PanickingEnumerator {
        fn snapshot(&mut self) -> Result<common::DeviceSet, EnumerationError> {
            panic!("libusb went away");
        }
    }

    #[test]
    fn test_panicking_enumerator_backs_off_and_keeps_state() {
        let log = CallLog::default();
        let sleeper = Arc::new(RecordingSleeper::new());
        let mut m = monitor_with(PanickingEnumerator, dock_config(&[], false), Fakes::default(), &log, sleeper.clone());

        assert!(m.step().is_none());
        assert_eq!(sleeper.waits(), vec![BACKOFF]);
        assert_eq!(m.state(), DockState::Unknown);
        assert!(m.previous().is_none());
        assert!(log.calls().is_empty());
    }
}
