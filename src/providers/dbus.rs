// Internet Watcher - D-Bus Facts Provider
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Observations read from NetworkManager and UPower over the system bus,
//! plus the change signals that drive push mode.

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Mutex;
use tracing::{debug, info, warn};
use zbus::zvariant::OwnedObjectPath;
use zbus::Connection;

use super::proxies::{
    NMAccessPointProxy, NMActiveConnectionProxy, NMProxy, NMWirelessProxy, UPowerDeviceProxy,
};
use super::{ActiveConnections, FactsProvider};
use crate::models::{ConnectionCategory, Error, QualityMetrics, Result};

/// Facts provider backed by NetworkManager and UPower.
pub struct DbusFacts {
    conn: Connection,
    /// Device of the active Wi-Fi connection, from the latest list read.
    wifi_device: Mutex<Option<OwnedObjectPath>>,
}

impl DbusFacts {
    /// Connect to the system bus.
    pub async fn connect() -> Result<Self> {
        let conn = Connection::system()
            .await
            .map_err(|e| Error::DbusConnectionFailed(e.to_string()))?;
        debug!("Connected to system D-Bus");
        Ok(Self {
            conn,
            wifi_device: Mutex::new(None),
        })
    }

    /// Invoke `callback` on every NetworkManager connectivity change.
    ///
    /// Listens to `ActiveConnections` property changes and the `StateChanged`
    /// signal. The callback also fires once right after subscribing, covering
    /// changes made before the streams existed. Runs until the bus goes away,
    /// so run it in a background task.
    pub async fn watch_changes<F>(&self, callback: F) -> Result<()>
    where
        F: Fn() + Send,
    {
        let nm = NMProxy::new(&self.conn).await?;

        let mut streams: Vec<Pin<Box<dyn Stream<Item = ()> + Send>>> = Vec::new();
        let active_changed = nm.receive_active_connections_changed().await;
        let state_changed = nm.receive_nm_state_changed().await?;
        streams.push(Box::pin(active_changed.map(|_| ())));
        streams.push(Box::pin(state_changed.map(|_| ())));

        info!("Subscribed to NetworkManager change signals");
        forward_changes(futures::stream::select_all(streams), callback).await;

        warn!("NetworkManager signal stream ended unexpectedly");
        Err(Error::ProviderUnavailable("signal stream ended".into()))
    }

    fn remember_wifi_device(&self, device: Option<OwnedObjectPath>) {
        match self.wifi_device.lock() {
            Ok(mut guard) => *guard = device,
            Err(poisoned) => *poisoned.into_inner() = device,
        }
    }

    fn current_wifi_device(&self) -> Option<OwnedObjectPath> {
        match self.wifi_device.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Read the active connection list and the device of the Wi-Fi link.
    async fn read_active(&self) -> zbus::Result<(ActiveConnections, Option<OwnedObjectPath>)> {
        let nm = NMProxy::new(&self.conn).await?;
        let mut active = ActiveConnections::default();
        let mut wifi_device = None;
        let mut categories = Vec::new();

        for path in nm.active_connections().await? {
            // Active connections can vanish between listing and reading.
            let ac = match NMActiveConnectionProxy::builder(&self.conn)
                .path(path.clone())?
                .build()
                .await
            {
                Ok(ac) => ac,
                Err(e) => {
                    debug!("Skipping active connection {}: {}", path.as_str(), e);
                    continue;
                }
            };
            let ctype = match ac.connection_type().await {
                Ok(ctype) => ctype,
                Err(e) => {
                    debug!("No type for active connection {}: {}", path.as_str(), e);
                    continue;
                }
            };
            let Some(category) = ConnectionCategory::from_nm_type(&ctype) else {
                continue;
            };
            categories.push(category);

            if let Ok(id) = ac.id().await {
                if !id.is_empty() {
                    active.identifiers.entry(category).or_insert(id);
                }
            }
            if category == ConnectionCategory::Wifi && wifi_device.is_none() {
                wifi_device = ac.devices().await.ok().and_then(|d| d.into_iter().next());
            }
        }

        active.state = categories.into_iter().collect();
        Ok((active, wifi_device))
    }

    async fn read_battery(&self) -> Option<f64> {
        let device = match UPowerDeviceProxy::new(&self.conn).await {
            Ok(device) => device,
            Err(e) => {
                debug!("UPower unavailable: {}", e);
                return None;
            }
        };
        match device.is_present().await {
            Ok(true) => device.percentage().await.ok(),
            Ok(false) => None,
            Err(e) => {
                debug!("Failed to read battery presence: {}", e);
                None
            }
        }
    }

    async fn read_wifi_quality(&self, device: OwnedObjectPath) -> Option<QualityMetrics> {
        let wireless = match NMWirelessProxy::builder(&self.conn).path(device) {
            Ok(builder) => builder.build().await,
            Err(e) => Err(e),
        };
        let wireless = match wireless {
            Ok(wireless) => wireless,
            Err(e) => {
                debug!("Wireless device unavailable: {}", e);
                return None;
            }
        };

        let max_bitrate_mbps = wireless
            .bitrate()
            .await
            .ok()
            .map(|kbps| kbps / 1000)
            .filter(|mbps| *mbps > 0);

        let mut signal_strength = None;
        if let Ok(ap_path) = wireless.active_access_point().await {
            if ap_path.as_str() != "/" {
                if let Ok(builder) = NMAccessPointProxy::builder(&self.conn).path(ap_path) {
                    if let Ok(ap) = builder.build().await {
                        signal_strength = ap.strength().await.ok();
                    }
                }
            }
        }

        Some(QualityMetrics {
            signal_strength,
            max_bitrate_mbps,
            latency_ms: None,
        })
    }
}

#[async_trait]
impl FactsProvider for DbusFacts {
    async fn active_connections(&self) -> Option<ActiveConnections> {
        match self.read_active().await {
            Ok((active, wifi_device)) => {
                self.remember_wifi_device(wifi_device);
                Some(active)
            }
            Err(e) => {
                warn!("NetworkManager unavailable: {}", e);
                self.remember_wifi_device(None);
                None
            }
        }
    }

    async fn battery_percent(&self) -> Option<f64> {
        self.read_battery().await
    }

    async fn wifi_quality(&self) -> Option<QualityMetrics> {
        let device = self.current_wifi_device()?;
        self.read_wifi_quality(device).await
    }

    fn name(&self) -> &'static str {
        "dbus"
    }
}

/// Call `callback` once, then once per item of `changes` until it ends.
///
/// Returns the number of changes seen.
async fn forward_changes<S, F>(changes: S, callback: F) -> usize
where
    S: Stream<Item = ()> + Unpin,
    F: Fn(),
{
    let mut changes = changes;
    callback();

    let mut seen = 0;
    while changes.next().await.is_some() {
        debug!("NetworkManager change detected");
        seen += 1;
        callback();
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_forward_changes_fires_once_after_subscribing() {
        let calls = AtomicUsize::new(0);
        let seen = forward_changes(futures::stream::iter(vec![(), ()]), || {
            calls.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(seen, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_forward_changes_without_signals_still_catches_up() {
        let calls = AtomicUsize::new(0);
        let seen = forward_changes(futures::stream::empty::<()>(), || {
            calls.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(seen, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
