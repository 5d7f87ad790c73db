// Internet Watcher - Reconnect Executor
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Executes reconnect intents with `nmcli connection up id <name>`.

use std::time::Duration;
use tracing::{info, warn};

use crate::models::{ReconnectIntent, Result};
use crate::network_utils::run_command;

/// NetworkManager waits up to 90s for activation; don't wait that long.
const RECONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one reconnect attempt.
#[derive(Debug)]
pub struct ReconnectOutcome {
    pub intent: ReconnectIntent,
    pub result: Result<()>,
}

/// Runs reconnect intents one after another.
#[derive(Debug, Clone)]
pub struct ReconnectExecutor {
    timeout: Duration,
}

impl Default for ReconnectExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectExecutor {
    pub fn new() -> Self {
        Self {
            timeout: RECONNECT_TIMEOUT,
        }
    }

    /// Arguments passed to `nmcli` for one intent.
    pub fn nmcli_args(intent: &ReconnectIntent) -> [&str; 4] {
        ["connection", "up", "id", intent.identifier.as_str()]
    }

    /// Try every intent; one failure does not stop the others.
    pub async fn execute(&self, intents: Vec<ReconnectIntent>) -> Vec<ReconnectOutcome> {
        if intents.is_empty() {
            info!("Nothing to reconnect: no connection identifiers known yet");
        }

        let mut outcomes = Vec::with_capacity(intents.len());
        for intent in intents {
            info!("Reconnecting {} '{}'", intent.category, intent.identifier);
            let result = run_command("nmcli", &Self::nmcli_args(&intent), self.timeout)
                .await
                .map(|_| ());
            if let Err(e) = &result {
                warn!("Reconnect of '{}' failed: {}", intent.identifier, e);
            }
            outcomes.push(ReconnectOutcome { intent, result });
        }
        outcomes
    }
}

/// Number of successful attempts.
pub fn success_count(outcomes: &[ReconnectOutcome]) -> usize {
    outcomes.iter().filter(|o| o.result.is_ok()).count()
}

/// Identifiers of the connections that could not be brought back.
pub fn failed_identifiers(outcomes: &[ReconnectOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .filter(|o| o.result.is_err())
        .map(|o| o.intent.identifier.clone())
        .collect()
}
