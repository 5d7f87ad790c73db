// Internet Watcher - Reconnect Coordinator
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Last-known connection identifiers and the reconnect intents built from them.

use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{ConnectionCategory, ReconnectIntent};

/// Remembers the last identifier seen per category.
///
/// Entries are refreshed whenever a newer identifier shows up and are never
/// cleared on disconnect, so a dropped connection can still be brought back.
#[derive(Debug, Default)]
pub struct ReconnectCoordinator {
    known: BTreeMap<ConnectionCategory, String>,
}

impl ReconnectCoordinator {
    /// Merge the identifiers of one observation.
    pub fn merge(&mut self, identifiers: &BTreeMap<ConnectionCategory, String>) {
        for (category, id) in identifiers {
            if id.is_empty() {
                continue;
            }
            if self.known.get(category) != Some(id) {
                debug!("Known {} identifier is now '{}'", category, id);
                self.known.insert(*category, id.clone());
            }
        }
    }

    /// One intent per category with a known identifier, in category order.
    pub fn reconnect_intents(&self) -> Vec<ReconnectIntent> {
        ConnectionCategory::ALL
            .into_iter()
            .filter_map(|category| {
                self.known.get(&category).map(|identifier| ReconnectIntent {
                    category,
                    identifier: identifier.clone(),
                })
            })
            .collect()
    }
}
