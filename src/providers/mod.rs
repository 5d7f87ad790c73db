// Internet Watcher - Facts Providers
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Sources of connectivity observations.
//!
//! - `dbus`: NetworkManager and UPower over the system bus, pull and push
//! - `nmcli`: `nmcli`, `ping` and sysfs, pull only
//!
//! Providers answer individual questions; [`fetch_observation`] assembles
//! them. Only the connection list decides whether an observation is usable:
//! when it cannot be read in time the result is [`Observation::unknown`].
//! Battery, Wi-Fi quality and latency each get their own bound and turn
//! into `None` on their own.

pub mod dbus;
pub mod nmcli;
pub mod proxies;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::config::METRIC_TIMEOUT_MS;
use crate::models::{ConnectionCategory, ConnectionState, Observation, QualityMetrics};
use crate::network_utils;

pub use dbus::DbusFacts;
pub use nmcli::NmcliFacts;

/// Active categories plus the connection name seen for each.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveConnections {
    pub state: ConnectionState,
    pub identifiers: BTreeMap<ConnectionCategory, String>,
}

/// Supplies connectivity facts on demand. Every read is best-effort and
/// safe to repeat.
#[async_trait]
pub trait FactsProvider: Send + Sync {
    /// The active connection list, `None` when it cannot be read.
    async fn active_connections(&self) -> Option<ActiveConnections>;

    /// Battery charge in percent, `None` without a battery.
    async fn battery_percent(&self) -> Option<f64>;

    /// Signal strength and bitrate of the active Wi-Fi link.
    async fn wifi_quality(&self) -> Option<QualityMetrics>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// How an observation is gathered.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Bound for the connection list read.
    pub state_timeout: Duration,
    /// Bound for each metric read.
    pub metric_timeout: Duration,
    /// Host to ping while connected, `None` to skip latency.
    pub ping_target: Option<String>,
}

impl FetchOptions {
    pub fn new(state_timeout: Duration, ping_target: Option<String>) -> Self {
        Self {
            state_timeout,
            metric_timeout: Duration::from_millis(METRIC_TIMEOUT_MS),
            ping_target,
        }
    }
}

/// Gather one observation.
///
/// The connection list is read first, bounded by `state_timeout`. The metric
/// reads then run concurrently, each bounded by `metric_timeout`.
pub async fn fetch_observation(provider: &dyn FactsProvider, options: &FetchOptions) -> Observation {
    let active = match tokio::time::timeout(options.state_timeout, provider.active_connections()).await {
        Ok(Some(active)) => active,
        Ok(None) => {
            warn!("{} provider has no connection list, assuming no connectivity", provider.name());
            return Observation::unknown();
        }
        Err(_) => {
            warn!(
                "{} provider did not answer within {}ms, assuming no connectivity",
                provider.name(),
                options.state_timeout.as_millis()
            );
            return Observation::unknown();
        }
    };

    let wifi = async {
        if active.state.contains(ConnectionCategory::Wifi) {
            bounded("Wi-Fi quality", options.metric_timeout, provider.wifi_quality()).await
        } else {
            None
        }
    };
    let latency = async {
        match &options.ping_target {
            Some(target) if !active.state.is_empty() => {
                bounded("ping", options.metric_timeout, network_utils::ping_latency(target)).await
            }
            _ => None,
        }
    };
    let battery = bounded("battery", options.metric_timeout, provider.battery_percent());

    let (wifi, latency_ms, battery) = tokio::join!(wifi, latency, battery);

    let mut metrics = wifi.unwrap_or_default();
    metrics.latency_ms = latency_ms;

    let mut observation = Observation::new(active.state).with_battery(battery);
    observation.identifiers = active.identifiers;
    if !metrics.is_empty() {
        observation = observation.with_metrics(metrics);
    }
    observation
}

/// Run one metric read, treating a timeout as "unknown".
async fn bounded<T>(what: &str, limit: Duration, read: impl Future<Output = Option<T>>) -> Option<T> {
    match tokio::time::timeout(limit, read).await {
        Ok(value) => value,
        Err(_) => {
            debug!("{} read exceeded {}ms, reporting it as unknown", what, limit.as_millis());
            None
        }
    }
}
