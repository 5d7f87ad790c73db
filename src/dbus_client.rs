//! Async D-Bus client used by the CLI to call the running daemon.

use std::sync::Arc;
use tracing::debug;
use zbus::{Connection, Result as ZbusResult};

use crate::models::{
    Error, Result, DBUS_CONTROL_INTERFACE, DBUS_OBJECT_PATH, DBUS_SERVICE_NAME,
};
use crate::sinks::StatusSnapshot;

/// D-Bus client for the Internet Watcher daemon.
#[derive(Clone, Default)]
pub struct WatcherClient {
    connection: Option<Arc<Connection>>,
}

impl WatcherClient {
    /// Create a new daemon client.
    pub fn new() -> Self {
        Self { connection: None }
    }

    /// Connect to the session bus.
    pub async fn connect(&mut self) -> Result<()> {
        match Connection::session().await {
            Ok(conn) => {
                debug!("Connected to session D-Bus");
                self.connection = Some(Arc::new(conn));
                Ok(())
            }
            Err(e) => Err(Error::DbusConnectionFailed(e.to_string())),
        }
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection.as_deref().ok_or(Error::DaemonNotRunning)
    }

    /// Check if the daemon is running.
    pub async fn ping(&self) -> Result<bool> {
        let conn = self.connection()?;

        let result: ZbusResult<bool> = conn
            .call_method(
                Some(DBUS_SERVICE_NAME),
                DBUS_OBJECT_PATH,
                Some(DBUS_CONTROL_INTERFACE),
                "Ping",
                &(),
            )
            .await
            .and_then(|reply| reply.body().deserialize());

        match result {
            Ok(pong) => Ok(pong),
            Err(e) => {
                debug!("Ping failed: {}", e);
                Ok(false)
            }
        }
    }

    /// Fetch the daemon's latest status snapshot.
    pub async fn status(&self) -> Result<StatusSnapshot> {
        let json: String = self.call("Status").await?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Ask the daemon to run an evaluation cycle now.
    pub async fn refresh(&self) -> Result<bool> {
        self.call("Refresh").await
    }

    /// Ask the daemon to reconnect known connections.
    ///
    /// Returns the success count and the identifiers that failed.
    pub async fn reconnect(&self) -> Result<(u32, Vec<String>)> {
        self.call("Reconnect").await
    }

    /// Ask the daemon to exit.
    pub async fn quit(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.call_method(
            Some(DBUS_SERVICE_NAME),
            DBUS_OBJECT_PATH,
            Some(DBUS_CONTROL_INTERFACE),
            "Quit",
            &(),
        )
        .await
        .map(|_| ())
        .map_err(map_call_error)
    }

    async fn call<T>(&self, method: &str) -> Result<T>
    where
        T: for<'d> zbus::zvariant::DynamicDeserialize<'d>,
    {
        let conn = self.connection()?;
        let reply = conn
            .call_method(
                Some(DBUS_SERVICE_NAME),
                DBUS_OBJECT_PATH,
                Some(DBUS_CONTROL_INTERFACE),
                method,
                &(),
            )
            .await
            .map_err(map_call_error)?;
        reply.body().deserialize().map_err(Error::from)
    }
}

/// An absent bus name means no daemon is running.
fn map_call_error(err: zbus::Error) -> Error {
    match &err {
        zbus::Error::MethodError(name, _, _)
            if name.as_str() == "org.freedesktop.DBus.Error.ServiceUnknown" =>
        {
            Error::DaemonNotRunning
        }
        _ => Error::Dbus(err.to_string()),
    }
}
