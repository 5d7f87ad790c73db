// Internet Watcher - systemd User Service Control
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Start and stop the daemon's systemd user unit.

use std::time::Duration;
use tracing::info;

use crate::models::{Result, SYSTEMD_UNIT};
use crate::network_utils::run_command;

const SYSTEMCTL_TIMEOUT: Duration = Duration::from_secs(15);

/// Action on the user unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }

    /// `systemctl` arguments for this action.
    pub fn systemctl_args(&self) -> [&'static str; 3] {
        ["--user", self.as_str(), SYSTEMD_UNIT]
    }
}

/// Run `systemctl --user <action> internet-watcher.service`.
pub async fn control_service(action: ServiceAction) -> Result<()> {
    info!("Requesting {} of {}", action.as_str(), SYSTEMD_UNIT);
    run_command("systemctl", &action.systemctl_args(), SYSTEMCTL_TIMEOUT).await?;
    Ok(())
}
