// Internet Watcher - State Differ
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Transition detection between two observed connectivity states.

use crate::models::{ConnectionCategory, ConnectionState, TransitionEvent};

/// Compute the transitions that lead from `previous` to `current`.
///
/// Events come out in [`ConnectionCategory::ALL`] order, one per category
/// that changed. Equal states yield no events.
pub fn diff(previous: &ConnectionState, current: &ConnectionState) -> Vec<TransitionEvent> {
    ConnectionCategory::ALL
        .into_iter()
        .filter_map(|category| {
            match (previous.contains(category), current.contains(category)) {
                (true, false) => Some(TransitionEvent::disconnected(category)),
                (false, true) => Some(TransitionEvent::connected(category)),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::connectivity::Direction;
    use ConnectionCategory::{Mobile, Wifi};

    fn state(categories: &[ConnectionCategory]) -> ConnectionState {
        categories.iter().copied().collect()
    }

    fn all_states() -> Vec<ConnectionState> {
        vec![state(&[]), state(&[Wifi]), state(&[Mobile]), state(&[Wifi, Mobile])]
    }

    #[test]
    fn test_disconnect_and_connect() {
        assert_eq!(
            diff(&state(&[Wifi]), &state(&[Mobile])),
            vec![TransitionEvent::disconnected(Wifi), TransitionEvent::connected(Mobile)]
        );
    }

    #[test]
    fn test_wifi_ordered_before_mobile() {
        let events = diff(&state(&[]), &state(&[Mobile, Wifi]));
        assert_eq!(
            events,
            vec![TransitionEvent::connected(Wifi), TransitionEvent::connected(Mobile)]
        );
    }

    #[test]
    fn test_empty_iff_equal() {
        for a in all_states() {
            for b in all_states() {
                assert_eq!(diff(&a, &b).is_empty(), a == b, "{:?} -> {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_swap_flips_directions() {
        for a in all_states() {
            for b in all_states() {
                let forward = diff(&a, &b);
                let flipped: Vec<_> = diff(&b, &a)
                    .into_iter()
                    .map(|e| TransitionEvent { direction: e.direction.flipped(), ..e })
                    .collect();
                assert_eq!(forward, flipped);
            }
        }
    }

    #[test]
    fn test_offline_drop_reports_every_category() {
        let events = diff(&state(&[Wifi, Mobile]), &ConnectionState::offline());
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.direction == Direction::Disconnected));
    }
}
