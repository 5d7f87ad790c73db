// Internet Watcher - D-Bus Proxies
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! D-Bus proxy definitions for NetworkManager, UPower and the desktop
//! notification service.

use std::collections::HashMap;
use zbus::proxy;
use zbus::zvariant::{OwnedObjectPath, Value};

/// Proxy for the main NetworkManager interface.
#[proxy(
    interface = "org.freedesktop.NetworkManager",
    default_service = "org.freedesktop.NetworkManager",
    default_path = "/org/freedesktop/NetworkManager"
)]
pub trait NM {
    /// Paths to all active connections.
    #[zbus(property)]
    fn active_connections(&self) -> zbus::Result<Vec<OwnedObjectPath>>;

    /// Overall networking state (NMState).
    #[zbus(property)]
    fn state(&self) -> zbus::Result<u32>;

    /// Emitted when the overall networking state changes.
    #[zbus(signal, name = "StateChanged")]
    fn nm_state_changed(&self, state: u32) -> zbus::Result<()>;
}

/// Proxy for an active connection.
#[proxy(
    interface = "org.freedesktop.NetworkManager.Connection.Active",
    default_service = "org.freedesktop.NetworkManager"
)]
pub trait NMActiveConnection {
    /// Connection type, e.g. `802-11-wireless` or `gsm`.
    #[zbus(property, name = "Type")]
    fn connection_type(&self) -> zbus::Result<String>;

    /// Connection identifier (usually the SSID for Wi-Fi).
    #[zbus(property)]
    fn id(&self) -> zbus::Result<String>;

    /// Paths to devices using this connection.
    #[zbus(property)]
    fn devices(&self) -> zbus::Result<Vec<OwnedObjectPath>>;
}

/// Proxy for the wireless part of a device.
#[proxy(
    interface = "org.freedesktop.NetworkManager.Device.Wireless",
    default_service = "org.freedesktop.NetworkManager"
)]
pub trait NMWireless {
    /// Access point currently in use, `/` when none.
    #[zbus(property)]
    fn active_access_point(&self) -> zbus::Result<OwnedObjectPath>;

    /// Current bitrate in Kb/s.
    #[zbus(property)]
    fn bitrate(&self) -> zbus::Result<u32>;
}

/// Proxy for a Wi-Fi access point.
#[proxy(
    interface = "org.freedesktop.NetworkManager.AccessPoint",
    default_service = "org.freedesktop.NetworkManager"
)]
pub trait NMAccessPoint {
    /// Signal quality in percent.
    #[zbus(property)]
    fn strength(&self) -> zbus::Result<u8>;
}

/// Proxy for the UPower composite display device.
#[proxy(
    interface = "org.freedesktop.UPower.Device",
    default_service = "org.freedesktop.UPower",
    default_path = "/org/freedesktop/UPower/devices/DisplayDevice"
)]
pub trait UPowerDevice {
    /// Charge level in percent.
    #[zbus(property)]
    fn percentage(&self) -> zbus::Result<f64>;

    /// Whether a battery is actually present.
    #[zbus(property)]
    fn is_present(&self) -> zbus::Result<bool>;
}

/// Proxy for the freedesktop notification service (session bus).
#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
pub trait Notifications {
    /// Show a notification and return its ID.
    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: HashMap<&str, Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;
}
