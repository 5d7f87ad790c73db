// Internet Watcher - Notification and Display Sinks
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Where accepted transitions and status snapshots end up.
//!
//! - [`DesktopNotifier`]: freedesktop notifications over the session bus
//! - [`LogNotifier`]: fallback when no notification service is reachable
//! - [`StatusBoard`]: latest status snapshot, shared with the control interface
//!
//! Both sink traits are called from inside an engine cycle, so nothing here
//! blocks: the desktop notifier hands events to its own task.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zbus::zvariant::Value;
use zbus::Connection;

use crate::engine::{DisplaySink, NotificationSink};
use crate::models::{
    ConnectionCategory, ConnectionState, QualityMetrics, TransitionEvent, APP_ID, APP_NAME,
};
use crate::providers::proxies::NotificationsProxy;

/// Bound for a single notification round trip.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(2);

/// Let the notification server pick the expiry.
const DEFAULT_EXPIRY: i32 = -1;

/// Sends desktop notifications through `org.freedesktop.Notifications`.
#[derive(Clone)]
pub struct DesktopNotifier {
    tx: mpsc::UnboundedSender<TransitionEvent>,
}

impl DesktopNotifier {
    /// Connect to the session bus and spawn the delivery task.
    pub async fn spawn() -> crate::models::Result<Self> {
        let conn = Connection::session()
            .await
            .map_err(|e| crate::models::Error::DbusConnectionFailed(e.to_string()))?;
        let proxy = NotificationsProxy::new(&conn).await?;

        let (tx, mut rx) = mpsc::unbounded_channel::<TransitionEvent>();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                deliver(&proxy, &event).await;
            }
            debug!("Desktop notifier stopped");
        });

        Ok(Self { tx })
    }
}

async fn deliver(proxy: &NotificationsProxy<'_>, event: &TransitionEvent) {
    let call = proxy.notify(
        APP_NAME,
        0,
        event.icon(),
        event.summary(),
        event.body(),
        &[],
        HashMap::from([("desktop-entry", Value::from(APP_ID))]),
        DEFAULT_EXPIRY,
    );
    match tokio::time::timeout(NOTIFY_TIMEOUT, call).await {
        Ok(Ok(id)) => debug!("Notification {} shown: {}", id, event.summary()),
        Ok(Err(e)) => warn!("Failed to show notification: {}", e),
        Err(_) => warn!("Notification service did not answer, dropped: {}", event.summary()),
    }
}

impl NotificationSink for DesktopNotifier {
    fn notify(&self, event: &TransitionEvent) {
        if self.tx.send(*event).is_err() {
            warn!("Desktop notifier is gone, dropped: {}", event.summary());
        }
    }
}

/// Writes transitions to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, event: &TransitionEvent) {
        info!("[notification] {}: {}", event.summary(), event.body());
    }
}

/// The status shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: ConnectionState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<QualityMetrics>,

    /// `None` until the first cycle has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Local>>,
}

impl StatusSnapshot {
    pub fn new(state: ConnectionState, metrics: Option<QualityMetrics>) -> Self {
        Self {
            state,
            metrics,
            updated_at: Some(Local::now()),
        }
    }

    /// "No active connection" or "Active: Wi-Fi, Mobile".
    pub fn status_text(&self) -> String {
        if self.state.is_empty() {
            "No active connection".to_string()
        } else {
            let names: Vec<_> = self.state.iter().map(|c| c.display_name()).collect();
            format!("Active: {}", names.join(", "))
        }
    }

    /// "Wi-Fi Strength: 72% / Max Bitrate: 270 Mbps", empty when unknown.
    pub fn wifi_text(&self) -> String {
        let Some(strength) = self.metrics.as_ref().and_then(|m| m.signal_strength) else {
            return String::new();
        };
        if !self.state.contains(ConnectionCategory::Wifi) {
            return String::new();
        }
        let mut text = format!("Wi-Fi Strength: {}%", strength);
        if let Some(bitrate) = self.metrics.as_ref().and_then(|m| m.max_bitrate_mbps) {
            text.push_str(&format!(" / Max Bitrate: {} Mbps", bitrate));
        }
        text
    }

    /// "Ping: 12.4 ms", empty when unknown.
    pub fn latency_text(&self) -> String {
        self.metrics
            .as_ref()
            .and_then(|m| m.latency_ms)
            .map(|ms| format!("Ping: {} ms", ms))
            .unwrap_or_default()
    }

    /// All non-empty status lines.
    pub fn lines(&self) -> Vec<String> {
        [self.status_text(), self.wifi_text(), self.latency_text()]
            .into_iter()
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// Holds the latest snapshot. Display updates are never suppressed.
///
/// Lock poisoning is recovered from: a panic elsewhere does not make the
/// last snapshot any less valid.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<StatusSnapshot>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                warn!("Status lock poisoned reading, recovering");
                poisoned.into_inner().clone()
            }
        }
    }

    fn store(&self, snapshot: StatusSnapshot) {
        match self.inner.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => {
                warn!("Status lock poisoned writing, recovering");
                *poisoned.into_inner() = snapshot;
            }
        }
    }
}

impl DisplaySink for StatusBoard {
    fn update_status(&self, state: &ConnectionState, metrics: Option<&QualityMetrics>) {
        let snapshot = StatusSnapshot::new(state.clone(), metrics.cloned());
        let previous = self.snapshot();
        if previous.state != snapshot.state || previous.metrics != snapshot.metrics {
            debug!("Status: {}", snapshot.lines().join(" | "));
        }
        self.store(snapshot);
    }
}
