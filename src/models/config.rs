// Internet Watcher - Application Configuration
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Application configuration model.
//!
//! Read once at startup. The engine only ever sees the plain values
//! extracted from it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{Error, Result, CONFIG_DIR_NAME, CONFIG_FILE_NAME};

/// Bound for each optional metric read (battery, Wi-Fi quality, ping).
///
/// The connection list read gets `fetch_timeout_ms` and must not be cut
/// shorter than this.
pub const METRIC_TIMEOUT_MS: u64 = 2000;

/// How evaluation cycles are triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    /// One cycle per NetworkManager change signal.
    #[default]
    Push,
    /// One cycle every `poll_interval_secs`.
    Poll,
}

impl MonitorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Poll => "poll",
        }
    }
}

/// Where observations come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FactsSource {
    /// NetworkManager and UPower over the system bus.
    #[default]
    Dbus,
    /// `nmcli` and sysfs.
    Nmcli,
}

impl FactsSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dbus => "dbus",
            Self::Nmcli => "nmcli",
        }
    }
}

/// Per-category notification switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Notify on Wi-Fi transitions.
    #[serde(default = "default_true")]
    pub wifi: bool,

    /// Notify on mobile broadband transitions.
    #[serde(default = "default_true")]
    pub mobile: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            wifi: true,
            mobile: true,
        }
    }
}

/// Low battery suppression settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerConfig {
    /// Swallow notifications while the battery is low.
    #[serde(default = "default_true")]
    pub suppress_on_low_battery: bool,

    /// Battery percentage strictly below which notifications are swallowed.
    #[serde(default = "default_low_battery_threshold")]
    pub low_battery_threshold: u8,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            suppress_on_low_battery: true,
            low_battery_threshold: default_low_battery_threshold(),
        }
    }
}

/// Observation scheduling and source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub mode: MonitorMode,

    #[serde(default)]
    pub source: FactsSource,

    /// Poll period in seconds (poll mode only).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Upper bound for reading the active connection list.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,

    /// Measure ping latency while connected.
    #[serde(default = "default_true")]
    pub ping: bool,

    /// Target to ping for latency.
    #[serde(default = "default_ping_target")]
    pub ping_target: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            mode: MonitorMode::default(),
            source: FactsSource::default(),
            poll_interval_secs: default_poll_interval(),
            fetch_timeout_ms: default_fetch_timeout(),
            ping: true,
            ping_target: default_ping_target(),
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// The mode actually used: the command-line source cannot push.
    pub fn effective_mode(&self) -> MonitorMode {
        match (self.mode, self.source) {
            (MonitorMode::Push, FactsSource::Nmcli) => MonitorMode::Poll,
            (mode, _) => mode,
        }
    }

    /// Ping target, if latency measurement is enabled.
    pub fn ping_target(&self) -> Option<&str> {
        self.ping.then_some(self.ping_target.as_str())
    }
}

fn default_true() -> bool {
    true
}

fn default_low_battery_threshold() -> u8 {
    20
}

fn default_poll_interval() -> u64 {
    5
}

fn default_fetch_timeout() -> u64 {
    3000
}

fn default_ping_target() -> String {
    "8.8.8.8".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub power: PowerConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            notifications: NotificationConfig::default(),
            power: PowerConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default location: `$XDG_CONFIG_HOME/internet-watcher/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Load configuration from TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigReadFailed(format!("{}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to TOML file, creating the parent directory.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::ConfigWriteFailed(format!("{}: {}", parent.display(), e)))?;
        }
        std::fs::write(path, content)
            .map_err(|e| Error::ConfigWriteFailed(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Reject values the daemon cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.power.low_battery_threshold > 100 {
            return Err(Error::InvalidConfig(format!(
                "low_battery_threshold must be 0-100, got {}",
                self.power.low_battery_threshold
            )));
        }
        if self.monitor.poll_interval_secs == 0 {
            return Err(Error::InvalidConfig("poll_interval_secs must be positive".into()));
        }
        if self.monitor.fetch_timeout_ms < METRIC_TIMEOUT_MS {
            return Err(Error::InvalidConfig(format!(
                "fetch_timeout_ms must be at least {}, got {}",
                METRIC_TIMEOUT_MS, self.monitor.fetch_timeout_ms
            )));
        }
        if self.monitor.ping && self.monitor.ping_target.trim().is_empty() {
            return Err(Error::InvalidConfig("ping_target must not be empty".into()));
        }
        Ok(())
    }
}
