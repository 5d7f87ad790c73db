// Internet Watcher - Shared Models
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! # Shared Models
//!
//! Types shared by the facts providers, the transition engine, the sinks
//! and the CLI:
//!
//! - **Connectivity**: categories, states, observations, transition events
//! - **Config**: the settings file model
//! - **Error**: shared error types

pub mod config;
pub mod connectivity;
pub mod error;

// Re-export main types for convenience
pub use config::{AppConfig, FactsSource, MonitorMode};
pub use connectivity::{
    ConnectionCategory, ConnectionState, Observation, QualityMetrics,
    ReconnectIntent, TransitionEvent,
};
pub use error::{Error, Result};

/// Application ID (matches desktop/D-Bus identifiers).
pub const APP_ID: &str = "com.chrisdaggas.internet-watcher";

/// Name shown as the sender of desktop notifications.
pub const APP_NAME: &str = "Internet Watcher";

/// Well-known session bus name of the running daemon.
pub const DBUS_SERVICE_NAME: &str = "com.chrisdaggas.InternetWatcher";

/// Object path of the daemon control interface.
pub const DBUS_OBJECT_PATH: &str = "/com/chrisdaggas/InternetWatcher";

/// Interface name of the daemon control interface.
pub const DBUS_CONTROL_INTERFACE: &str = "com.chrisdaggas.InternetWatcher.Control";

/// Configuration directory name (under XDG_CONFIG_HOME).
pub const CONFIG_DIR_NAME: &str = "internet-watcher";

/// Configuration file name inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// systemd user unit that runs the daemon.
pub const SYSTEMD_UNIT: &str = "internet-watcher.service";
