//! dock-monitor
//!
//! Background agent that detects a USB docking station being connected or
//! disconnected and switches audio profile, restarts devices and resets the
//! display accordingly.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use common::{ConfigError, ThreadSleeper, setup_logging};
use monitor::app;
use monitor::config::{self, MonitorConfig};
use monitor::detect::{self, DetectOptions};
use monitor::usb::UsbEnumerator;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "dock-monitor")]
#[command(
    author,
    version,
    about = "Dock Monitor - React to a USB docking station being connected or disconnected"
)]
#[command(long_about = "
Polls the set of attached USB devices and classifies the machine as docked
when any configured dock indicator device is present. On docking it restarts
the configured devices and loads the docked audio profile; on undocking it
loads the undocked audio profile and optionally resets the display mode.

EXAMPLES:
    # Run with default config
    dock-monitor

    # Run with custom config
    dock-monitor --config ~/dock/monitor.toml

    # Find the dock's devices and store them in the config
    dock-monitor detect --write --save-audio

    # List USB devices with their ids
    dock-monitor --list-devices

    # Run with debug logging
    dock-monitor --log-level debug

CONFIGURATION:
    The monitor reads its configuration from:
    1. Path specified with --config
    2. <config dir>/dock-monitor/monitor.toml
    A default file is written there if none exists.
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<String>,

    /// Save default configuration and exit
    #[arg(long)]
    save_config: bool,

    /// List USB devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect the docking station's devices interactively
    Detect {
        /// Write detected devices to dock.indicator_devices
        #[arg(long)]
        write: bool,

        /// Also save docked/undocked audio profiles
        #[arg(long)]
        save_audio: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .as_deref()
        .map(config::expand_path)
        .unwrap_or_else(MonitorConfig::default_path);

    if args.save_config {
        MonitorConfig::default()
            .save(&config_path)
            .context("Failed to save configuration")?;
        println!("Configuration saved to: {}", config_path.display());
        return Ok(());
    }

    if let Some(Command::Detect { write, save_audio }) = args.command {
        let _guard = setup_logging(args.log_level.as_deref().unwrap_or("info"), None)
            .context("Failed to setup logging")?;
        return detect::run(config_path, DetectOptions { write, save_audio });
    }

    if args.list_devices {
        let _guard = setup_logging(args.log_level.as_deref().unwrap_or("info"), None)
            .context("Failed to setup logging")?;
        return list_devices_mode();
    }

    let config = match MonitorConfig::load(Some(config_path)) {
        Ok(config) => config,
        Err(ConfigError::Missing(path)) => {
            MonitorConfig::default()
                .save(&path)
                .context("Failed to create default configuration")?;
            bail!(
                "Created new configuration file: {}. Add dock.indicator_devices (see `dock-monitor detect`) and restart.",
                path.display()
            );
        }
        Err(e) => return Err(e).context("Failed to load configuration"),
    };

    // Use CLI log level if specified, otherwise use config value
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.monitor.log_level);
    let log_file = config.log_file();

    let _guard = setup_logging(log_level, log_file.as_deref()).context("Failed to setup logging")?;

    info!("dock-monitor v{}", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", log_level);
    if let Some(path) = &log_file {
        info!("Logging to: {}", path.display());
    }

    run_monitor(config).await
}

/// List USB devices and exit
fn list_devices_mode() -> Result<()> {
    let devices = UsbEnumerator::new()
        .describe()
        .context("Failed to enumerate USB devices")?;

    if devices.is_empty() {
        println!("No USB devices found.");
    } else {
        println!("Found {} USB device(s):\n", devices.len());
        for device in devices {
            println!("  {}  {}", device.id, device.label());
            println!(
                "      Bus {:03} Device {:03}",
                device.bus_number, device.device_address
            );
        }
    }

    Ok(())
}

/// Poll on a dedicated thread until Ctrl+C
///
/// The loop itself has no cancellation; returning from main ends the
/// process, abandoning any in-flight helper command.
async fn run_monitor(config: MonitorConfig) -> Result<()> {
    let mut monitor = app::build_monitor(&config, Arc::new(ThreadSleeper));

    let (exit_tx, exit_rx) = tokio::sync::oneshot::channel::<()>();
    let _monitor_thread: std::thread::JoinHandle<()> = std::thread::Builder::new()
        .name("dock-monitor".to_string())
        .spawn(move || {
            // Dropped if the loop ever unwinds out
            let _exit = exit_tx;
            monitor.run();
        })
        .context("Failed to spawn monitor thread")?;

    info!("Press Ctrl+C to stop");

    tokio::select! {
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Received Ctrl+C, shutting down"),
                Err(e) => error!("Error waiting for Ctrl+C: {}", e),
            }
            Ok(())
        }
        _ = exit_rx => {
            error!("Monitor thread stopped unexpectedly");
            bail!("Monitor thread stopped unexpectedly")
        }
    }
}
