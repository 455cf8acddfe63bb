// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Observer notifications.
//!
//! Consumers learn about applied updates and session teardown by
//! subscribing to an [`EventBus`]. Emitting never blocks; slow subscribers
//! lag and skip events rather than stall the engine.

use roam_core::DataMap;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;

use crate::engine::SyncReport;

const DEFAULT_CAPACITY: usize = 64;

/// Whether the orchestrator is running its sync activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No token: no timers, no channel, no remote calls.
    Idle,
    /// Token present: pull timer armed and realtime channel open.
    Active,
}

/// Why the session monitor tore sync down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// The remote rejected the token or announced expiry.
    Expired,
    /// This device's session was deleted remotely.
    Deleted,
    /// A heartbeat failed for a non-terminal reason. Sync keeps running.
    Invalid,
}

/// Something observers may react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    StateChanged(EngineState),
    /// Settings after a remote change was resolved and saved.
    SettingsUpdated(Value),
    /// A collection after a remote change was merged and saved.
    DataUpdated { data_type: String, data: DataMap },
    SyncCompleted(SyncReport),
    Session(SessionSignal),
}

/// Broadcast fan-out of [`SyncEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a bus whose slow subscribers lag after `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventBus { tx }
    }

    /// Publishes `event` to current subscribers.
    pub fn emit(&self, event: SyncEvent) {
        if self.tx.send(event).is_err() {
            trace!("sync event dropped: no subscribers");
        }
    }

    /// Receives events published from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
