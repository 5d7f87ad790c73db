// Internet Watcher - Suppression Policy
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Low battery suppression and per-category notification switches.

use crate::models::{AppConfig, ConnectionCategory};

/// Whether notifications for this cycle should be swallowed.
///
/// Only a known battery level strictly below the threshold suppresses.
/// An unknown level never does.
pub fn should_suppress(battery_percent: Option<f64>, threshold: u8, enabled: bool) -> bool {
    match battery_percent {
        Some(percent) if enabled => percent < f64::from(threshold),
        _ => false,
    }
}

/// Plain configuration values consumed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuppressionPolicy {
    pub suppress_on_low_battery: bool,
    pub low_battery_threshold: u8,
    pub notify_wifi: bool,
    pub notify_mobile: bool,
}

impl Default for SuppressionPolicy {
    fn default() -> Self {
        Self {
            suppress_on_low_battery: true,
            low_battery_threshold: 20,
            notify_wifi: true,
            notify_mobile: true,
        }
    }
}

impl SuppressionPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            suppress_on_low_battery: config.power.suppress_on_low_battery,
            low_battery_threshold: config.power.low_battery_threshold,
            notify_wifi: config.notifications.wifi,
            notify_mobile: config.notifications.mobile,
        }
    }

    pub fn should_suppress(&self, battery_percent: Option<f64>) -> bool {
        should_suppress(
            battery_percent,
            self.low_battery_threshold,
            self.suppress_on_low_battery,
        )
    }

    /// Whether the user wants notifications for this category at all.
    pub fn notifies(&self, category: ConnectionCategory) -> bool {
        match category {
            ConnectionCategory::Wifi => self.notify_wifi,
            ConnectionCategory::Mobile => self.notify_mobile,
        }
    }
}
