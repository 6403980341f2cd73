//! Interactive dock detection
//!
//! Compares snapshots taken with the dock connected and disconnected; the
//! devices present only while docked become the dock indicator devices.
//! Several ports can be scanned and their results are merged.

use crate::actions::{AudioProfile, AudioProfileService};
use crate::app::build_audio;
use crate::config::MonitorConfig;
use crate::usb::{DeviceSummary, UsbEnumerator};
use anyhow::{Context, Result, bail};
use common::{ConfigError, DeviceId};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct DetectOptions {
    /// Store the detected ids as `dock.indicator_devices`
    pub write: bool,
    /// Prompt for and save the docked/undocked audio profiles
    pub save_audio: bool,
}

/// Devices seen while docked that are absent once undocked
pub fn dock_only_devices(docked: &[DeviceSummary], undocked: &[DeviceSummary]) -> Vec<DeviceSummary> {
    let remaining: Vec<&DeviceId> = undocked.iter().map(|d| &d.id).collect();
    docked
        .iter()
        .filter(|d| !remaining.contains(&&d.id))
        .cloned()
        .collect()
}

/// Merge per-port results, one entry per id, sorted by id
pub fn merge_scans(scans: &[Vec<DeviceSummary>]) -> Vec<DeviceSummary> {
    let mut merged: BTreeMap<String, DeviceSummary> = BTreeMap::new();
    for summary in scans.iter().flatten() {
        merged
            .entry(summary.id.as_str().to_string())
            .or_insert_with(|| summary.clone());
    }
    merged.into_values().collect()
}

pub fn run(config_path: PathBuf, options: DetectOptions) -> Result<()> {
    let mut enumerator = UsbEnumerator::new();
    let mut scans = Vec::new();
    let mut port = 1;

    loop {
        println!("--- Port {} ---", port);
        prompt("Connect the docking station, then press Enter...")?;
        let docked = enumerator.describe().context("Failed to enumerate USB devices")?;

        prompt("Disconnect the docking station, then press Enter...")?;
        let undocked = enumerator.describe().context("Failed to enumerate USB devices")?;

        let found = dock_only_devices(&docked, &undocked);
        if found.is_empty() {
            println!("No new devices detected on this port.");
        } else {
            println!("Detected {} device(s) on port {}:", found.len(), port);
            for device in &found {
                println!("  {}  ({})", device.id, device.label());
            }
        }
        scans.push(found);
        port += 1;

        println!();
        let answer = prompt("Connect to another port and press Enter, or type 'done' to finish.")?;
        if answer.trim().eq_ignore_ascii_case("done") {
            break;
        }
    }

    let devices = merge_scans(&scans);
    if devices.is_empty() {
        bail!("No dock devices detected across {} port(s)", scans.len());
    }

    println!();
    println!(
        "=== {} dock device(s) across {} port(s) ===",
        devices.len(),
        scans.len()
    );
    for device in &devices {
        println!("  {}  ({})", device.id, device.label());
    }
    info!(
        "Docking station devices detected: {:?}",
        devices.iter().map(|d| d.id.as_str()).collect::<Vec<_>>()
    );

    let mut config = match MonitorConfig::read(Some(config_path.clone())) {
        Ok(config) => config,
        Err(ConfigError::Missing(_)) => MonitorConfig {
            source: Some(config_path.clone()),
            ..MonitorConfig::default()
        },
        Err(e) => return Err(e).context("Failed to read configuration"),
    };

    if options.write {
        config.dock.indicator_devices = devices.iter().map(|d| d.id.to_string()).collect();
        config
            .save(&config_path)
            .context("Failed to save configuration")?;
        println!("Dock devices written to {}", config_path.display());
    } else {
        println!("Add these ids to dock.indicator_devices in {}", config_path.display());
    }

    if options.save_audio {
        let audio = build_audio(&config);
        prompt("Configure audio for docking station mode, then press Enter...")?;
        audio
            .save_profile(AudioProfile::Docked)
            .context("Failed to save docking station audio profile")?;

        prompt("Configure audio for standalone mode, then press Enter...")?;
        audio
            .save_profile(AudioProfile::Undocked)
            .context("Failed to save standalone audio profile")?;
        println!("Audio profiles saved");
    }

    Ok(())
}

fn prompt(message: &str) -> io::Result<String> {
    println!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}
