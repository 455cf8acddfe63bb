// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared sync configuration.
//!
//! [`SyncContext`] is the single owner of the current [`SyncConfig`]. The
//! orchestrator and the session monitor subscribe to it; anything may read
//! it. Clearing it is the one teardown signal, and [`SyncContext::clear`]
//! reports whether this call was the one that cleared it.

use std::sync::Arc;

use roam_core::SyncConfig;
use tokio::sync::watch;
use tracing::info;

/// Cheaply cloneable handle to the current sync configuration.
#[derive(Clone)]
pub struct SyncContext {
    tx: Arc<watch::Sender<Option<SyncConfig>>>,
}

impl SyncContext {
    /// Creates a context holding `initial`.
    pub fn new(initial: Option<SyncConfig>) -> Self {
        let (tx, _) = watch::channel(initial);
        SyncContext { tx: Arc::new(tx) }
    }

    /// Creates a context with no configuration.
    pub fn empty() -> Self {
        Self::new(None)
    }

    /// Returns a copy of the current configuration.
    pub fn current(&self) -> Option<SyncConfig> {
        self.tx.borrow().clone()
    }

    /// Returns true if a configuration with an access token is present.
    pub fn is_connected(&self) -> bool {
        self.tx.borrow().as_ref().is_some_and(SyncConfig::is_connected)
    }

    /// Returns the current access token, if any.
    pub fn access_token(&self) -> Option<String> {
        self.tx.borrow().as_ref().and_then(|c| c.access_token.clone()).filter(|t| !t.is_empty())
    }

    /// Replaces the configuration and notifies subscribers.
    pub fn set(&self, config: SyncConfig) {
        self.tx.send_replace(Some(config));
    }

    /// Applies `f` to the current configuration and returns the result.
    ///
    /// Does nothing and returns `None` when no configuration is present.
    /// Subscribers are notified only if the configuration changed.
    pub fn update<F>(&self, f: F) -> Option<SyncConfig>
    where
        F: FnOnce(&mut SyncConfig),
    {
        let mut updated = None;
        self.tx.send_if_modified(|current| {
            let Some(config) = current.as_mut() else {
                return false;
            };
            let before = config.clone();
            f(config);
            updated = Some(config.clone());
            *config != before
        });
        updated
    }

    /// Removes a connected configuration.
    ///
    /// Returns true only for the call that actually performed the clear;
    /// concurrent callers racing on the same teardown see false.
    pub fn clear(&self) -> bool {
        let cleared = self.tx.send_if_modified(|current| {
            if current.as_ref().is_some_and(SyncConfig::is_connected) {
                *current = None;
                true
            } else {
                false
            }
        });
        if cleared {
            info!("sync configuration cleared");
        }
        cleared
    }

    /// Subscribes to configuration changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<SyncConfig>> {
        self.tx.subscribe()
    }
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext").field("connected", &self.is_connected()).finish()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
