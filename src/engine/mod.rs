// Internet Watcher - Transition Engine
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Connectivity state-transition engine.
//!
//! - `diff`: pure transition detection between two states
//! - `suppression`: low battery and per-category notification policy
//! - `reconnect`: last-known identifiers and reconnect intents
//! - `transition`: the stateful engine and its sink traits

pub mod diff;
pub mod reconnect;
pub mod suppression;
pub mod transition;

pub use suppression::SuppressionPolicy;
pub use transition::{DisplaySink, NotificationSink, TransitionEngine};
