// Internet Watcher - Monitor Service
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Drives the transition engine from push signals or a poll timer.
//!
//! Three kinds of task cooperate:
//! - trigger sources (signal watcher, ticker, control interface) post
//!   [`Trigger`]s without ever touching the engine
//! - the fetcher turns triggers into observations, one fetch at a time,
//!   so slow providers never stall anything else
//! - the dispatcher owns the engine and applies observations in order
//!
//! The engine therefore has exactly one writer in both modes.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::TransitionEngine;
use crate::models::{Error, Observation, ReconnectIntent, Result};
use crate::providers::{fetch_observation, DbusFacts, FactsProvider, FetchOptions};

/// Pending triggers beyond this are redundant: one fetch answers them all.
const TRIGGER_QUEUE: usize = 16;

/// Observations in flight between fetcher and dispatcher.
const OBSERVATION_QUEUE: usize = 16;

/// Why a fresh observation is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// NetworkManager reported a change.
    Changed,
    /// Poll timer fired.
    Tick,
    /// Startup or explicit user request.
    Refresh,
}

enum Command {
    ReconnectIntents(oneshot::Sender<Vec<ReconnectIntent>>),
    Shutdown,
}

/// Cheap, cloneable handle to a running monitor.
#[derive(Clone)]
pub struct MonitorHandle {
    triggers: mpsc::Sender<Trigger>,
    commands: mpsc::Sender<Command>,
}

impl MonitorHandle {
    /// Request an evaluation cycle. Never blocks; returns false once stopped.
    pub fn trigger(&self, trigger: Trigger) -> bool {
        match self.triggers.try_send(trigger) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Trigger queue full, {:?} coalesced", trigger);
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Ask the engine for its current reconnect intents.
    pub async fn reconnect_intents(&self) -> Result<Vec<ReconnectIntent>> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::ReconnectIntents(tx))
            .await
            .map_err(|_| Error::Internal("monitor stopped".into()))?;
        rx.await.map_err(|_| Error::Internal("monitor stopped".into()))
    }

    /// Stop the dispatcher.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}

/// A running monitor.
pub struct Monitor {
    handle: MonitorHandle,
    dispatcher: JoinHandle<()>,
    fetcher: JoinHandle<()>,
}

impl Monitor {
    /// Spawn the fetcher and dispatcher and request the seeding observation.
    pub fn start(
        engine: TransitionEngine,
        provider: Arc<dyn FactsProvider>,
        options: FetchOptions,
    ) -> Self {
        let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_QUEUE);
        let (command_tx, command_rx) = mpsc::channel(4);
        let (obs_tx, obs_rx) = mpsc::channel(OBSERVATION_QUEUE);

        let fetcher = tokio::spawn(run_fetcher(provider, options, trigger_rx, obs_tx));
        let dispatcher = tokio::spawn(run_dispatcher(engine, obs_rx, command_rx));

        let handle = MonitorHandle {
            triggers: trigger_tx,
            commands: command_tx,
        };
        handle.trigger(Trigger::Refresh);

        Self {
            handle,
            dispatcher,
            fetcher,
        }
    }

    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    /// Wait until the dispatcher stops, then tear down the fetcher.
    pub async fn wait(self) {
        if let Err(e) = self.dispatcher.await {
            warn!("Dispatcher task failed: {}", e);
        }
        self.fetcher.abort();
        info!("Monitor stopped");
    }
}

async fn run_fetcher(
    provider: Arc<dyn FactsProvider>,
    options: FetchOptions,
    mut triggers: mpsc::Receiver<Trigger>,
    observations: mpsc::Sender<Observation>,
) {
    while let Some(trigger) = triggers.recv().await {
        let mut coalesced = 0usize;
        while triggers.try_recv().is_ok() {
            coalesced += 1;
        }
        debug!(
            "Fetching observation from {} ({:?}, {} coalesced)",
            provider.name(),
            trigger,
            coalesced
        );

        let observation = fetch_observation(provider.as_ref(), &options).await;
        if observations.send(observation).await.is_err() {
            break;
        }
    }
    debug!("Fetcher stopped");
}

async fn run_dispatcher(
    mut engine: TransitionEngine,
    mut observations: mpsc::Receiver<Observation>,
    mut commands: mpsc::Receiver<Command>,
) {
    loop {
        tokio::select! {
            // Apply queued observations before answering queries about them.
            biased;
            observation = observations.recv() => {
                let Some(observation) = observation else { break };
                engine.on_observation(&observation);
            }
            command = commands.recv() => match command {
                Some(Command::ReconnectIntents(reply)) => {
                    let _ = reply.send(engine.reconnect_intents());
                }
                Some(Command::Shutdown) | None => break,
            },
        }
    }
    debug!("Dispatcher stopped");
}

/// Trigger a cycle every `period` until the monitor stops.
pub fn spawn_ticker(handle: MonitorHandle, period: Duration) -> JoinHandle<()> {
    tokio::spawn(run_ticker(handle, period))
}

async fn run_ticker(handle: MonitorHandle, period: Duration) {
    info!("Polling connectivity every {}s", period.as_secs_f64());
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; startup already requested a fetch.
    interval.tick().await;

    loop {
        interval.tick().await;
        if !handle.trigger(Trigger::Tick) {
            break;
        }
    }
}

/// Trigger a cycle on every NetworkManager change signal, plus one as soon
/// as the subscription is in place.
///
/// Falls back to polling every `fallback_period` if the signal stream dies.
pub fn spawn_signal_watcher(
    facts: Arc<DbusFacts>,
    handle: MonitorHandle,
    fallback_period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let signal_handle = handle.clone();
        if let Err(e) = facts
            .watch_changes(move || {
                signal_handle.trigger(Trigger::Changed);
            })
            .await
        {
            warn!("Push monitoring stopped: {}, falling back to polling", e);
        }
        run_ticker(handle, fallback_period).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DisplaySink, NotificationSink, SuppressionPolicy};
    use crate::models::{ConnectionCategory, ConnectionState, QualityMetrics, TransitionEvent};
    use crate::providers::ActiveConnections;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<TransitionEvent>>>);

    impl NotificationSink for Recorder {
        fn notify(&self, event: &TransitionEvent) {
            self.0.lock().unwrap().push(*event);
        }
    }

    impl DisplaySink for Recorder {
        fn update_status(&self, _state: &ConnectionState, _metrics: Option<&QualityMetrics>) {}
    }

    /// Plays back connection states, repeating the last one forever.
    struct Scripted {
        script: Mutex<VecDeque<ConnectionState>>,
        last: Mutex<Option<ConnectionState>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(script: Vec<ConnectionState>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FactsProvider for Scripted {
        async fn active_connections(&self) -> Option<ActiveConnections> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.script.lock().unwrap().pop_front() {
                *last = Some(next);
            }
            last.clone().map(|state| ActiveConnections {
                state,
                identifiers: Default::default(),
            })
        }

        async fn battery_percent(&self) -> Option<f64> {
            None
        }

        async fn wifi_quality(&self) -> Option<QualityMetrics> {
            None
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn state(categories: &[ConnectionCategory]) -> ConnectionState {
        categories.iter().copied().collect()
    }

    fn obs(categories: &[ConnectionCategory]) -> Observation {
        Observation::new(state(categories))
    }

    fn options() -> FetchOptions {
        FetchOptions::new(Duration::from_secs(3), None)
    }

    fn engine(recorder: &Recorder) -> TransitionEngine {
        TransitionEngine::new(
            SuppressionPolicy::default(),
            Box::new(recorder.clone()),
            Box::new(recorder.clone()),
        )
    }

    fn spawn_dispatcher(
        recorder: &Recorder,
    ) -> (mpsc::Sender<Observation>, MonitorHandle, JoinHandle<()>) {
        let (obs_tx, obs_rx) = mpsc::channel(64);
        let (command_tx, command_rx) = mpsc::channel(4);
        let (trigger_tx, _trigger_rx) = mpsc::channel(1);
        let task = tokio::spawn(run_dispatcher(engine(recorder), obs_rx, command_rx));
        let handle = MonitorHandle {
            triggers: trigger_tx,
            commands: command_tx,
        };
        (obs_tx, handle, task)
    }

    #[tokio::test]
    async fn test_repeated_polls_do_not_reemit() {
        let recorder = Recorder::default();
        let (obs_tx, handle, task) = spawn_dispatcher(&recorder);

        obs_tx.send(obs(&[ConnectionCategory::Wifi])).await.unwrap();
        obs_tx.send(obs(&[])).await.unwrap();
        for _ in 0..12 {
            obs_tx.send(obs(&[])).await.unwrap();
        }
        // Observations are applied before the query is answered.
        handle.reconnect_intents().await.unwrap();

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![TransitionEvent::disconnected(ConnectionCategory::Wifi)]
        );

        handle.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_reconnect_intents_through_handle() {
        let recorder = Recorder::default();
        let (obs_tx, handle, task) = spawn_dispatcher(&recorder);

        obs_tx.send(obs(&[])).await.unwrap();
        obs_tx
            .send(obs(&[ConnectionCategory::Wifi]).with_identifier(ConnectionCategory::Wifi, "HomeNet"))
            .await
            .unwrap();
        obs_tx.send(obs(&[])).await.unwrap();

        let intents = handle.reconnect_intents().await.unwrap();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].identifier, "HomeNet");

        handle.shutdown().await;
        task.await.unwrap();
        assert!(handle.reconnect_intents().await.is_err());
    }

    #[tokio::test]
    async fn test_fetcher_coalesces_queued_triggers() {
        let provider = Arc::new(Scripted::new(vec![state(&[ConnectionCategory::Mobile])]));
        let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_QUEUE);
        let (obs_tx, mut obs_rx) = mpsc::channel(4);

        for _ in 0..5 {
            trigger_tx.try_send(Trigger::Changed).unwrap();
        }
        drop(trigger_tx);

        let fetcher = tokio::spawn(run_fetcher(
            provider.clone(),
            options(),
            trigger_rx,
            obs_tx,
        ));

        let observation = obs_rx.recv().await.unwrap();
        assert!(observation.state.contains(ConnectionCategory::Mobile));
        fetcher.await.unwrap();
        assert!(obs_rx.recv().await.is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_monitor_end_to_end() {
        let recorder = Recorder::default();
        let provider = Arc::new(Scripted::new(vec![
            state(&[]),
            state(&[ConnectionCategory::Wifi]),
        ]));
        let monitor = Monitor::start(engine(&recorder), provider, options());
        let handle = monitor.handle();

        for _ in 0..100 {
            if !recorder.0.lock().unwrap().is_empty() {
                break;
            }
            handle.trigger(Trigger::Refresh);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        // Further polls keep returning the same state.
        for _ in 0..5 {
            handle.trigger(Trigger::Tick);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        handle.shutdown().await;
        monitor.wait().await;
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![TransitionEvent::connected(ConnectionCategory::Wifi)]
        );
    }
}
