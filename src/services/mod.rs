// Internet Watcher - Background Services
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Background services around the transition engine:
//! - Monitor: push/poll driving loops that own the engine
//! - Reconnect: executes reconnect intents
//! - Systemd: starts and stops the user unit

pub mod monitor;
pub mod reconnect;
pub mod systemd;

pub use monitor::{Monitor, MonitorHandle, Trigger};
pub use reconnect::ReconnectExecutor;
