//! Wiring from configuration to a running monitor
//!
//! Everything the loop needs is built once here and owned by the
//! [`DockMonitor`]; there is no process-wide state.

use crate::actions::{
    AudioProfileService, CommandDisplayReset, CommandRestarter, CommandRunner, CommandTemplate,
    DeviceRestartService, HelperAudioProfiles, UsbResetRestarter,
};
use crate::config::{MonitorConfig, RestartMethod};
use crate::dock::{ActionDispatcher, DockMonitor};
use crate::usb::{Retrying, UsbEnumerator};
use common::Sleeper;
use std::sync::Arc;
use tracing::{info, warn};

pub fn build_audio(config: &MonitorConfig) -> HelperAudioProfiles {
    HelperAudioProfiles::new(
        config.audio_helper(),
        config.resolve(&config.audio.docked_profile),
        config.resolve(&config.audio.undocked_profile),
        CommandTemplate::new(config.audio.load_args.clone()),
        CommandTemplate::new(config.audio.save_args.clone()),
        CommandRunner::new(config.action_timeout()),
    )
}

pub fn build_restarter(config: &MonitorConfig) -> Box<dyn DeviceRestartService> {
    match config.restart.method {
        RestartMethod::Command => Box::new(CommandRestarter::new(
            CommandTemplate::new(config.restart.command.clone()),
            CommandRunner::new(config.action_timeout()),
        )),
        RestartMethod::UsbReset => Box::new(UsbResetRestarter::new()),
    }
}

pub fn build_dispatcher(config: &MonitorConfig, sleeper: Arc<dyn Sleeper>) -> ActionDispatcher {
    let audio = build_audio(config);
    audio.check_helper();
    let audio: Box<dyn AudioProfileService> = Box::new(audio);

    let display = CommandDisplayReset::new(
        CommandTemplate::new(config.display.command.clone()),
        CommandRunner::new(config.action_timeout()),
    );

    ActionDispatcher::new(
        audio,
        build_restarter(config),
        Box::new(display),
        config.settle_delay(),
        sleeper,
    )
}

/// Build the libusb-backed monitor described by `config`
pub fn build_monitor(
    config: &MonitorConfig,
    sleeper: Arc<dyn Sleeper>,
) -> DockMonitor<Retrying<UsbEnumerator>> {
    let dock = config.dock_configuration();

    info!("Config loaded: {} dock device(s)", dock.dock_indicator_devices.len());
    for device in &dock.dock_indicator_devices {
        info!("  Dock device: {}", device);
    }
    for id in config.non_canonical_indicators() {
        warn!(
            "Dock device '{}' is not in VID-PID-bcdDevice-bcdUSB form and may never match",
            id
        );
    }

    let enumerator = Retrying::new(
        UsbEnumerator::new(),
        config.enumeration_retry(),
        sleeper.clone(),
    );

    DockMonitor::new(
        enumerator,
        build_dispatcher(config, sleeper.clone()),
        Arc::new(dock),
        config.poll_timings(),
        sleeper,
    )
}
