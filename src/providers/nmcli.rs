// Internet Watcher - Command-Line Facts Provider
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Facts read from `nmcli` and sysfs. Pull only.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ActiveConnections, FactsProvider};
use crate::models::QualityMetrics;
use crate::network_utils::{
    parse_active_connections, parse_wifi_quality, read_battery_percent, run_command,
};

/// Bound for each individual `nmcli` invocation.
const NMCLI_TIMEOUT: Duration = Duration::from_secs(2);

/// Facts provider backed by the `nmcli` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct NmcliFacts;

impl NmcliFacts {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FactsProvider for NmcliFacts {
    async fn active_connections(&self) -> Option<ActiveConnections> {
        let args = ["-t", "-f", "TYPE,NAME", "connection", "show", "--active"];
        match run_command("nmcli", &args, NMCLI_TIMEOUT).await {
            Ok(output) => {
                let (state, identifiers) = parse_active_connections(&output);
                Some(ActiveConnections { state, identifiers })
            }
            Err(e) => {
                warn!("nmcli unavailable: {}", e);
                None
            }
        }
    }

    async fn battery_percent(&self) -> Option<f64> {
        tokio::task::spawn_blocking(read_battery_percent)
            .await
            .unwrap_or_default()
    }

    async fn wifi_quality(&self) -> Option<QualityMetrics> {
        let args = ["-t", "-f", "IN-USE,SIGNAL,RATE,SSID", "dev", "wifi"];
        match run_command("nmcli", &args, NMCLI_TIMEOUT).await {
            Ok(output) => parse_wifi_quality(&output),
            Err(e) => {
                debug!("Failed to read Wi-Fi quality: {}", e);
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "nmcli"
    }
}
