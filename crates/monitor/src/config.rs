//! Monitor configuration management

use crate::dock::{DockConfiguration, PollTimings};
use common::{ConfigError, DeviceId, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest accepted poll interval
pub const MIN_POLL_INTERVAL_MS: u64 = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub monitor: MonitorSettings,
    pub dock: DockSettings,
    #[serde(default)]
    pub timing: TimingSettings,
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub restart: RestartSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    /// File this configuration was read from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub log_level: String,
    /// Log file, relative paths resolve against the config directory
    pub log_file: Option<PathBuf>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockSettings {
    /// Device ids whose presence means docked (`VID-PID-bcdDevice-bcdUSB`)
    pub indicator_devices: Vec<String>,
    /// Device ids handed to the restart backend after docking
    #[serde(default)]
    pub restart_devices: Vec<String>,
    /// Reset display resolution after undocking
    #[serde(default)]
    pub reset_resolution: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub poll_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub failure_backoff_ms: u64,
    pub enumeration_attempts: u32,
    pub enumeration_retry_delay_ms: u64,
    /// Kill helper commands running longer than this (None = wait forever)
    pub action_timeout_ms: Option<u64>,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            settle_delay_ms: 10_000,
            failure_backoff_ms: 5000,
            enumeration_attempts: 3,
            enumeration_retry_delay_ms: 1000,
            action_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Audio helper executable
    pub helper: PathBuf,
    pub docked_profile: PathBuf,
    pub undocked_profile: PathBuf,
    /// Helper arguments for loading, `{profile}` is the profile file
    pub load_args: Vec<String>,
    /// Helper arguments for saving, `{profile}` is the profile file
    pub save_args: Vec<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            helper: PathBuf::from("SoundVolumeView.exe"),
            docked_profile: PathBuf::from("docked_profile.spr"),
            undocked_profile: PathBuf::from("undocked_profile.spr"),
            load_args: vec!["/LoadProfile".to_string(), "{profile}".to_string()],
            save_args: vec!["/SaveProfile".to_string(), "{profile}".to_string()],
        }
    }
}

/// How devices listed in `restart_devices` are restarted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartMethod {
    /// Run `restart.command` with `{device}` substituted
    Command,
    /// USB port reset of matching devices through libusb
    UsbReset,
}

impl Default for RestartMethod {
    fn default() -> Self {
        if cfg!(windows) {
            RestartMethod::Command
        } else {
            RestartMethod::UsbReset
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartSettings {
    pub method: RestartMethod,
    pub command: Vec<String>,
}

impl Default for RestartSettings {
    fn default() -> Self {
        Self {
            method: RestartMethod::default(),
            command: vec![
                "pnputil".to_string(),
                "/restart-device".to_string(),
                "{device}".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Command restoring the display mode, e.g. `["xrandr", "--auto"]`
    pub command: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorSettings::default(),
            dock: DockSettings::default(),
            timing: TimingSettings::default(),
            audio: AudioSettings::default(),
            restart: RestartSettings::default(),
            display: DisplaySettings::default(),
            source: None,
        }
    }
}

impl MonitorConfig {
    /// Load and validate configuration from `path` or the default location
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;

        if let Some(source) = &config.source {
            tracing::info!("Loaded configuration from: {}", source.display());
        }
        Ok(config)
    }

    /// Read configuration without validating it
    pub fn read(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config_path = path.unwrap_or_else(Self::default_path);

        if !config_path.exists() {
            return Err(ConfigError::Missing(config_path));
        }

        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;

        let mut config = Self::parse(&content).map_err(|message| ConfigError::Parse {
            path: config_path.clone(),
            message,
        })?;

        config.source = Some(config_path);
        Ok(config)
    }

    /// Parse TOML without validating
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(format!("Failed to serialize configuration: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("dock-monitor").join("monitor.toml")
        } else {
            PathBuf::from(".config/dock-monitor/monitor.toml")
        }
    }

    /// Directory relative paths in the file resolve against
    pub fn base_dir(&self) -> PathBuf {
        self.source
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve a configured path against the config directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }

    /// Helper location: bare names stay PATH lookups unless a file of that
    /// name sits next to the config
    pub fn audio_helper(&self) -> PathBuf {
        let helper = &self.audio.helper;
        if helper.components().count() > 1 || helper.is_absolute() {
            return self.resolve(helper);
        }
        let beside = self.base_dir().join(helper);
        if beside.exists() { beside } else { helper.clone() }
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.monitor.log_file.as_deref().map(|p| self.resolve(p))
    }

    pub fn dock_configuration(&self) -> DockConfiguration {
        DockConfiguration {
            dock_indicator_devices: self.dock.indicator_devices.iter().map(DeviceId::new).collect(),
            restart_devices: self.dock.restart_devices.iter().map(DeviceId::new).collect(),
            reset_resolution: self.dock.reset_resolution,
        }
    }

    pub fn poll_timings(&self) -> PollTimings {
        PollTimings {
            poll_interval: Duration::from_millis(self.timing.poll_interval_ms),
            failure_backoff: Duration::from_millis(self.timing.failure_backoff_ms),
        }
    }

    pub fn enumeration_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.timing.enumeration_attempts,
            Duration::from_millis(self.timing.enumeration_retry_delay_ms),
        )
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.timing.settle_delay_ms)
    }

    pub fn action_timeout(&self) -> Option<Duration> {
        self.timing.action_timeout_ms.map(Duration::from_millis)
    }

    /// Ids that are not in canonical `VID-PID-bcdDevice-bcdUSB` form
    ///
    /// Such ids are allowed (comparison is exact), but they can only match a
    /// device if the user typed the exact enumerated string.
    pub fn non_canonical_indicators(&self) -> Vec<&str> {
        self.dock
            .indicator_devices
            .iter()
            .filter(|id| !DeviceId::new(id.as_str()).is_canonical())
            .map(String::as_str)
            .collect()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.monitor.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}', must be one of: {}",
                self.monitor.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.dock.indicator_devices.is_empty() {
            return Err(ConfigError::Invalid(
                "dock.indicator_devices is empty; run `dock-monitor detect` to find the dock's devices"
                    .to_string(),
            ));
        }

        Self::validate_ids("dock.indicator_devices", &self.dock.indicator_devices)?;
        Self::validate_ids("dock.restart_devices", &self.dock.restart_devices)?;

        if self.timing.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::Invalid(format!(
                "timing.poll_interval_ms must be at least {} (got {})",
                MIN_POLL_INTERVAL_MS, self.timing.poll_interval_ms
            )));
        }

        if self.timing.enumeration_attempts == 0 {
            return Err(ConfigError::Invalid(
                "timing.enumeration_attempts must be at least 1".to_string(),
            ));
        }

        if self.timing.action_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "timing.action_timeout_ms must be greater than 0 when set".to_string(),
            ));
        }

        if self.restart.method == RestartMethod::Command
            && !self.dock.restart_devices.is_empty()
            && self.restart.command.is_empty()
        {
            return Err(ConfigError::Invalid(
                "restart.command is empty but dock.restart_devices is not".to_string(),
            ));
        }

        if self.dock.reset_resolution && self.display.command.is_empty() {
            return Err(ConfigError::Invalid(
                "dock.reset_resolution is enabled but display.command is empty".to_string(),
            ));
        }

        if self.audio.helper.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("audio.helper is empty".to_string()));
        }

        Ok(())
    }

    fn validate_ids(field: &str, ids: &[String]) -> Result<(), ConfigError> {
        if let Some(pos) = ids.iter().position(|id| id.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "Empty device id at {}[{}]",
                field, pos
            )));
        }
        Ok(())
    }
}

/// Expand `~` in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
