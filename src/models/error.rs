// Internet Watcher - Error Types
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Shared error types for the Internet Watcher daemon and CLI.
//!
//! None of these ever reach the transition engine: facts providers turn
//! their failures into an "unknown" observation before handing it over.

use thiserror::Error;

/// Result type alias for Internet Watcher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Internet Watcher operations.
#[derive(Debug, Error)]
pub enum Error {
    // ========================================
    // D-Bus Errors
    // ========================================
    #[error("D-Bus error: {0}")]
    Dbus(String),

    #[error("D-Bus connection failed: {0}")]
    DbusConnectionFailed(String),

    #[error("Daemon not running")]
    DaemonNotRunning,

    // ========================================
    // Facts Provider Errors
    // ========================================
    #[error("Facts provider unavailable: {0}")]
    ProviderUnavailable(String),

    // ========================================
    // Configuration Errors
    // ========================================
    #[error("Failed to read configuration: {0}")]
    ConfigReadFailed(String),

    #[error("Failed to write configuration: {0}")]
    ConfigWriteFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParseFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================
    // Command Errors
    // ========================================
    #[error("Command failed: {command} - {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Command timed out: {0}")]
    CommandTimeout(String),

    // ========================================
    // System Errors
    // ========================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new command failed error.
    pub fn command_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error indicates the daemon is not running.
    pub fn is_daemon_not_running(&self) -> bool {
        matches!(self, Self::DaemonNotRunning | Self::DbusConnectionFailed(_))
    }
}

// Convert from zbus errors
impl From<zbus::Error> for Error {
    fn from(err: zbus::Error) -> Self {
        Error::Dbus(err.to_string())
    }
}

// Convert from toml parse errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParseFailed(err.to_string())
    }
}

// Convert from toml serialize errors
impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::ConfigWriteFailed(err.to_string())
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daemon_not_running_detection() {
        assert!(Error::DaemonNotRunning.is_daemon_not_running());
        assert!(Error::DbusConnectionFailed("no bus".into()).is_daemon_not_running());
        assert!(!Error::Dbus("other".into()).is_daemon_not_running());
    }

    #[test]
    fn test_command_failed_message() {
        let err = Error::command_failed("nmcli", "exit status 10");
        assert_eq!(err.to_string(), "Command failed: nmcli - exit status 10");
    }
}
