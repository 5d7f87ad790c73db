// Internet Watcher - Transition Engine
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The stateful core: turns a stream of observations into deduplicated,
//! policy-gated connect/disconnect notifications.
//!
//! The engine is single-writer. Whoever drives it (signal watcher or poll
//! ticker) must serialize calls to [`TransitionEngine::on_observation`];
//! the monitor service does this by owning the engine in one task.

use tracing::{debug, info};

use super::diff::diff;
use super::reconnect::ReconnectCoordinator;
use super::suppression::SuppressionPolicy;
use crate::models::{ConnectionState, Observation, QualityMetrics, ReconnectIntent, TransitionEvent};

/// Receives transitions accepted by the engine. Must not block.
pub trait NotificationSink: Send {
    fn notify(&self, event: &TransitionEvent);
}

/// Receives a status snapshot on every cycle, suppressed or not.
pub trait DisplaySink: Send {
    fn update_status(&self, state: &ConnectionState, metrics: Option<&QualityMetrics>);
}

/// State owned exclusively by one engine.
#[derive(Debug, Default)]
struct EngineState {
    /// `None` until the first observation seeds it.
    last_accepted: Option<ConnectionState>,
    identifiers: ReconnectCoordinator,
}

/// Connectivity transition engine.
pub struct TransitionEngine {
    policy: SuppressionPolicy,
    state: EngineState,
    notifier: Box<dyn NotificationSink>,
    display: Box<dyn DisplaySink>,
}

impl TransitionEngine {
    pub fn new(
        policy: SuppressionPolicy,
        notifier: Box<dyn NotificationSink>,
        display: Box<dyn DisplaySink>,
    ) -> Self {
        Self {
            policy,
            state: EngineState::default(),
            notifier,
            display,
        }
    }

    /// Run one evaluation cycle and return the events actually emitted.
    ///
    /// The first observation only seeds the baseline. A suppressed cycle still
    /// advances the baseline, so transitions that happened while suppressed
    /// are never replayed later.
    pub fn on_observation(&mut self, obs: &Observation) -> Vec<TransitionEvent> {
        let current = &obs.state;
        self.state.identifiers.merge(&obs.identifiers);

        let emitted = match self.state.last_accepted.as_ref() {
            None => {
                info!("Initial connectivity: {}", describe(current));
                Vec::new()
            }
            Some(previous) => {
                let events = diff(previous, current);
                if events.is_empty() {
                    debug!("No connectivity change ({})", describe(current));
                    Vec::new()
                } else if self.policy.should_suppress(obs.battery_percent) {
                    info!(
                        "Battery at {:.0}%, suppressing {} transition(s)",
                        obs.battery_percent.unwrap_or_default(),
                        events.len()
                    );
                    Vec::new()
                } else {
                    self.emit(events)
                }
            }
        };

        self.state.last_accepted = Some(current.clone());
        self.display.update_status(current, obs.metrics.as_ref());
        emitted
    }

    /// Reconnect intents for every category with a known identifier.
    pub fn reconnect_intents(&self) -> Vec<ReconnectIntent> {
        self.state.identifiers.reconnect_intents()
    }

    fn emit(&self, events: Vec<TransitionEvent>) -> Vec<TransitionEvent> {
        events
            .into_iter()
            .filter(|event| {
                let wanted = self.policy.notifies(event.category);
                if !wanted {
                    debug!("{} notifications disabled, dropping {:?}", event.category, event.direction);
                }
                wanted
            })
            .inspect(|event| {
                info!("{}", event.summary());
                self.notifier.notify(event);
            })
            .collect()
    }

    #[cfg(test)]
    fn baseline(&self) -> Option<&ConnectionState> {
        self.state.last_accepted.as_ref()
    }
}

fn describe(state: &ConnectionState) -> String {
    if state.is_empty() {
        "offline".to_string()
    } else {
        state.iter().map(|c| c.display_name()).collect::<Vec<_>>().join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionCategory, ReconnectIntent};
    use std::sync::{Arc, Mutex};
    use ConnectionCategory::{Mobile, Wifi};

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<TransitionEvent>>>,
        statuses: Arc<Mutex<Vec<ConnectionState>>>,
    }

    impl NotificationSink for Recorder {
        fn notify(&self, event: &TransitionEvent) {
            self.events.lock().unwrap().push(*event);
        }
    }

    impl DisplaySink for Recorder {
        fn update_status(&self, state: &ConnectionState, _metrics: Option<&QualityMetrics>) {
            self.statuses.lock().unwrap().push(state.clone());
        }
    }

    fn engine_with(policy: SuppressionPolicy) -> (TransitionEngine, Recorder) {
        let recorder = Recorder::default();
        let engine = TransitionEngine::new(
            policy,
            Box::new(recorder.clone()),
            Box::new(recorder.clone()),
        );
        (engine, recorder)
    }

    fn engine() -> (TransitionEngine, Recorder) {
        engine_with(SuppressionPolicy::default())
    }

    fn obs(categories: &[ConnectionCategory]) -> Observation {
        Observation::new(categories.iter().copied().collect())
    }

    #[test]
    fn test_first_observation_only_seeds() {
        let (mut engine, recorder) = engine();
        assert!(engine.on_observation(&obs(&[Wifi, Mobile])).is_empty());
        assert!(recorder.events.lock().unwrap().is_empty());
        assert_eq!(engine.baseline(), Some(&[Wifi, Mobile].into_iter().collect()));
    }

    #[test]
    fn test_same_observation_twice_emits_once() {
        let (mut engine, _) = engine();
        engine.on_observation(&obs(&[]));

        let wifi_up = obs(&[Wifi]);
        assert_eq!(engine.on_observation(&wifi_up).len(), 1);
        assert!(engine.on_observation(&wifi_up).is_empty());
    }

    #[test]
    fn test_scenario_wifi_drop_with_mobile_kept() {
        let (mut engine, recorder) = engine();
        assert!(engine.on_observation(&obs(&[Wifi, Mobile])).is_empty());
        assert_eq!(
            engine.on_observation(&obs(&[Mobile])),
            vec![TransitionEvent::disconnected(Wifi)]
        );
        assert!(engine.on_observation(&obs(&[Mobile])).is_empty());
        assert_eq!(*recorder.events.lock().unwrap(), vec![TransitionEvent::disconnected(Wifi)]);
    }

    #[test]
    fn test_scenario_identifier_survives_disconnect() {
        let (mut engine, _) = engine();
        engine.on_observation(&obs(&[]));

        let events = engine.on_observation(&obs(&[Wifi]).with_identifier(Wifi, "HomeNet"));
        assert_eq!(events, vec![TransitionEvent::connected(Wifi)]);

        assert_eq!(
            engine.on_observation(&obs(&[])),
            vec![TransitionEvent::disconnected(Wifi)]
        );
        assert_eq!(
            engine.reconnect_intents(),
            vec![ReconnectIntent { category: Wifi, identifier: "HomeNet".into() }]
        );
    }

    #[test]
    fn test_suppressed_drop_still_moves_baseline() {
        let (mut engine, recorder) = engine();
        engine.on_observation(&obs(&[Wifi]));

        assert!(engine.on_observation(&obs(&[]).with_battery(Some(15.0))).is_empty());
        assert_eq!(engine.baseline(), Some(&ConnectionState::offline()));

        assert_eq!(
            engine.on_observation(&obs(&[Wifi]).with_battery(Some(50.0))),
            vec![TransitionEvent::connected(Wifi)]
        );
        assert_eq!(recorder.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_connect_while_suppressed_is_never_replayed() {
        let (mut engine, recorder) = engine();
        engine.on_observation(&obs(&[Wifi]));

        assert!(engine.on_observation(&obs(&[]).with_battery(Some(10.0))).is_empty());
        assert!(engine.on_observation(&obs(&[Wifi]).with_battery(Some(12.0))).is_empty());
        // Battery recovered: the reconnect that happened while suppressed stays silent.
        assert!(engine.on_observation(&obs(&[Wifi]).with_battery(Some(30.0))).is_empty());
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_battery_does_not_suppress() {
        let (mut engine, _) = engine();
        engine.on_observation(&obs(&[Wifi]));
        assert_eq!(
            engine.on_observation(&obs(&[]).with_battery(None)),
            vec![TransitionEvent::disconnected(Wifi)]
        );
    }

    #[test]
    fn test_suppression_disabled() {
        let (mut engine, _) = engine_with(SuppressionPolicy {
            suppress_on_low_battery: false,
            ..SuppressionPolicy::default()
        });
        engine.on_observation(&obs(&[Mobile]));
        assert_eq!(engine.on_observation(&obs(&[]).with_battery(Some(2.0))).len(), 1);
    }

    #[test]
    fn test_disabled_category_tracked_but_silent() {
        let (mut engine, recorder) = engine_with(SuppressionPolicy {
            notify_mobile: false,
            ..SuppressionPolicy::default()
        });
        engine.on_observation(&obs(&[Wifi, Mobile]));

        assert_eq!(engine.on_observation(&obs(&[])), vec![TransitionEvent::disconnected(Wifi)]);
        assert_eq!(engine.baseline(), Some(&ConnectionState::offline()));
        assert_eq!(recorder.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_provider_failure_reads_as_disconnect() {
        let (mut engine, _) = engine();
        engine.on_observation(&obs(&[Wifi]).with_identifier(Wifi, "HomeNet"));
        assert_eq!(
            engine.on_observation(&Observation::unknown()),
            vec![TransitionEvent::disconnected(Wifi)]
        );
        assert_eq!(engine.reconnect_intents().len(), 1);
    }

    #[test]
    fn test_display_updated_every_cycle() {
        let (mut engine, recorder) = engine();
        engine.on_observation(&obs(&[Wifi]));
        engine.on_observation(&obs(&[Wifi]));
        engine.on_observation(&obs(&[]).with_battery(Some(5.0)));
        assert_eq!(recorder.statuses.lock().unwrap().len(), 3);
    }
}
