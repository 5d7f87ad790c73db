// Internet Watcher - Daemon Control Interface
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Session bus interface exported by the running daemon.
//!
//! Lets the CLI (or anything else on the session bus) ask for the current
//! status, force a refresh, reconnect dropped connections or stop the daemon.

use tracing::{info, warn};
use zbus::{fdo, interface, Connection};

use crate::models::{Error, Result, DBUS_OBJECT_PATH, DBUS_SERVICE_NAME};
use crate::services::reconnect::{failed_identifiers, success_count};
use crate::services::{MonitorHandle, ReconnectExecutor, Trigger};
use crate::sinks::StatusBoard;

/// Control interface backed by the running monitor.
pub struct ControlInterface {
    monitor: MonitorHandle,
    status: StatusBoard,
    executor: ReconnectExecutor,
}

impl ControlInterface {
    pub fn new(monitor: MonitorHandle, status: StatusBoard, executor: ReconnectExecutor) -> Self {
        Self {
            monitor,
            status,
            executor,
        }
    }
}

#[interface(name = "com.chrisdaggas.InternetWatcher.Control")]
impl ControlInterface {
    /// Liveness check.
    async fn ping(&self) -> bool {
        true
    }

    /// Latest status snapshot as JSON.
    async fn status(&self) -> fdo::Result<String> {
        serde_json::to_string(&self.status.snapshot()).map_err(|e| fdo::Error::Failed(e.to_string()))
    }

    /// Run an evaluation cycle now.
    async fn refresh(&self) -> bool {
        info!("Refresh requested over D-Bus");
        self.monitor.trigger(Trigger::Refresh)
    }

    /// Reconnect every category with a known identifier.
    ///
    /// Returns the number of successful reconnects and the identifiers that
    /// failed.
    async fn reconnect(&self) -> fdo::Result<(u32, Vec<String>)> {
        info!("Reconnect requested over D-Bus");
        let intents = self
            .monitor
            .reconnect_intents()
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))?;
        let outcomes = self.executor.execute(intents).await;
        self.monitor.trigger(Trigger::Refresh);
        Ok((success_count(&outcomes) as u32, failed_identifiers(&outcomes)))
    }

    /// Stop the daemon.
    async fn quit(&self) {
        info!("Quit requested over D-Bus");
        self.monitor.shutdown().await;
    }
}

/// Export the control interface and claim the well-known name.
///
/// The returned connection must be kept alive for the interface to stay
/// reachable.
pub async fn serve(interface: ControlInterface) -> Result<Connection> {
    let connection = Connection::session()
        .await
        .map_err(|e| Error::DbusConnectionFailed(e.to_string()))?;

    connection
        .object_server()
        .at(DBUS_OBJECT_PATH, interface)
        .await?;

    if let Err(e) = connection.request_name(DBUS_SERVICE_NAME).await {
        warn!("Could not claim {}: {} (another instance running?)", DBUS_SERVICE_NAME, e);
        return Err(e.into());
    }

    info!("Control interface available as {}", DBUS_SERVICE_NAME);
    Ok(connection)
}
