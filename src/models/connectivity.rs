// Internet Watcher - Connectivity Model
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Connectivity data model shared by providers, the engine and the sinks.
//!
//! Unknown values are always `None`, never zero. A zero battery or a zero
//! signal strength would be misleading both for suppression and for display.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A class of network connectivity tracked independently.
///
/// Declaration order is the deterministic event order: Wi-Fi before mobile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionCategory {
    Wifi,
    Mobile,
}

impl ConnectionCategory {
    /// Every category, in event order.
    pub const ALL: [ConnectionCategory; 2] = [Self::Wifi, Self::Mobile];

    /// Map a NetworkManager connection type to a tracked category.
    pub fn from_nm_type(ctype: &str) -> Option<Self> {
        match ctype {
            "802-11-wireless" | "wifi" => Some(Self::Wifi),
            "gsm" | "cdma" | "lte" | "mobile" => Some(Self::Mobile),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Wifi => "Wi-Fi",
            Self::Mobile => "Mobile",
        }
    }
}

impl fmt::Display for ConnectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The set of categories with an active connection. Empty means offline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionState(BTreeSet<ConnectionCategory>);

impl ConnectionState {
    /// State with no connectivity at all.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn contains(&self, category: ConnectionCategory) -> bool {
        self.0.contains(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Active categories in event order.
    pub fn iter(&self) -> impl Iterator<Item = ConnectionCategory> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ConnectionCategory> for ConnectionState {
    fn from_iter<I: IntoIterator<Item = ConnectionCategory>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Optional link quality figures, passed through to the display only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Wi-Fi signal strength, 0-100 %.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_strength: Option<u8>,

    /// Maximum Wi-Fi bitrate in Mbps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bitrate_mbps: Option<u32>,

    /// Round-trip time to the ping target in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
}

impl QualityMetrics {
    pub fn is_empty(&self) -> bool {
        self.signal_strength.is_none()
            && self.max_bitrate_mbps.is_none()
            && self.latency_ms.is_none()
    }
}

/// One sampled snapshot of connectivity.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub state: ConnectionState,

    /// Connection identifiers (SSID or profile name) seen in this sample.
    pub identifiers: BTreeMap<ConnectionCategory, String>,

    /// Battery charge in percent, `None` when unknown or absent.
    pub battery_percent: Option<f64>,

    pub metrics: Option<QualityMetrics>,

    /// Diagnostic timestamp; the engine never looks at it.
    pub observed_at: DateTime<Local>,
}

impl Observation {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state,
            identifiers: BTreeMap::new(),
            battery_percent: None,
            metrics: None,
            observed_at: Local::now(),
        }
    }

    /// The degraded observation produced when the provider is unreachable.
    pub fn unknown() -> Self {
        Self::new(ConnectionState::offline())
    }

    #[cfg(test)]
    pub fn with_identifier(mut self, category: ConnectionCategory, id: impl Into<String>) -> Self {
        self.identifiers.insert(category, id.into());
        self
    }

    pub fn with_battery(mut self, percent: Option<f64>) -> Self {
        self.battery_percent = percent;
        self
    }

    pub fn with_metrics(mut self, metrics: QualityMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Direction of a connectivity crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Connected,
    Disconnected,
}

impl Direction {
    #[cfg(test)]
    pub fn flipped(self) -> Self {
        match self {
            Self::Connected => Self::Disconnected,
            Self::Disconnected => Self::Connected,
        }
    }
}

/// A detected connect or disconnect for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub category: ConnectionCategory,
    pub direction: Direction,
}

impl TransitionEvent {
    pub fn connected(category: ConnectionCategory) -> Self {
        Self { category, direction: Direction::Connected }
    }

    pub fn disconnected(category: ConnectionCategory) -> Self {
        Self { category, direction: Direction::Disconnected }
    }

    /// Notification title.
    pub fn summary(&self) -> &'static str {
        match (self.category, self.direction) {
            (ConnectionCategory::Wifi, Direction::Connected) => "Wi-Fi connected",
            (ConnectionCategory::Wifi, Direction::Disconnected) => "Wi-Fi disconnected",
            (ConnectionCategory::Mobile, Direction::Connected) => "Mobile data connected",
            (ConnectionCategory::Mobile, Direction::Disconnected) => "Mobile data disconnected",
        }
    }

    /// Notification body.
    pub fn body(&self) -> &'static str {
        match (self.category, self.direction) {
            (ConnectionCategory::Wifi, Direction::Connected) => "Wi-Fi connection established",
            (ConnectionCategory::Wifi, Direction::Disconnected) => "Wi-Fi connection lost",
            (ConnectionCategory::Mobile, Direction::Connected) => "Mobile connection established",
            (ConnectionCategory::Mobile, Direction::Disconnected) => "Mobile connection lost",
        }
    }

    /// Freedesktop icon name.
    pub fn icon(&self) -> &'static str {
        match (self.category, self.direction) {
            (ConnectionCategory::Wifi, Direction::Connected) => "network-wireless-symbolic",
            (ConnectionCategory::Wifi, Direction::Disconnected) => "network-wireless-offline-symbolic",
            (ConnectionCategory::Mobile, Direction::Connected) => "network-cellular-symbolic",
            (ConnectionCategory::Mobile, Direction::Disconnected) => "network-cellular-offline-symbolic",
        }
    }
}

/// A request to bring a previously seen connection back up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectIntent {
    pub category: ConnectionCategory,
    pub identifier: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nm_type_mapping() {
        assert_eq!(ConnectionCategory::from_nm_type("802-11-wireless"), Some(ConnectionCategory::Wifi));
        assert_eq!(ConnectionCategory::from_nm_type("gsm"), Some(ConnectionCategory::Mobile));
        assert_eq!(ConnectionCategory::from_nm_type("cdma"), Some(ConnectionCategory::Mobile));
        assert_eq!(ConnectionCategory::from_nm_type("802-3-ethernet"), None);
        assert_eq!(ConnectionCategory::from_nm_type("vpn"), None);
    }

    #[test]
    fn test_state_is_a_set() {
        let state: ConnectionState = [
            ConnectionCategory::Mobile,
            ConnectionCategory::Wifi,
            ConnectionCategory::Mobile,
        ]
        .into_iter()
        .collect();

        let order: Vec<_> = state.iter().collect();
        assert_eq!(order, vec![ConnectionCategory::Wifi, ConnectionCategory::Mobile]);
    }

    #[test]
    fn test_unknown_observation() {
        let obs = Observation::unknown();
        assert!(obs.state.is_empty());
        assert!(obs.identifiers.is_empty());
        assert!(obs.battery_percent.is_none());
        assert!(obs.metrics.is_none());
    }

    #[test]
    fn test_notification_text() {
        let event = TransitionEvent::disconnected(ConnectionCategory::Mobile);
        assert_eq!(event.summary(), "Mobile data disconnected");
        assert_eq!(event.body(), "Mobile connection lost");
        assert_eq!(event.icon(), "network-cellular-offline-symbolic");
    }
}
