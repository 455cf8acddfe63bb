// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Engine and session monitor wired to one channel and one event bus.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use crate::channel::RealtimeChannel;
use crate::config::EngineConfig;
use crate::context::SyncContext;
use crate::engine::{EngineHandle, SyncEngine};
use crate::error::Result;
use crate::events::{EventBus, SyncEvent};
use crate::remote::RemoteClient;
use crate::session::{SessionHandle, SessionMonitor};
use crate::store::LocalStore;

/// A running sync stack.
pub struct SyncService {
    context: SyncContext,
    channel: RealtimeChannel,
    events: EventBus,
    engine: EngineHandle,
    engine_task: JoinHandle<()>,
    session: SessionHandle,
}

impl SyncService {
    /// Starts the stack with a WebSocket channel.
    pub fn start(
        config: EngineConfig,
        context: SyncContext,
        remote: Arc<dyn RemoteClient>,
        store: Arc<dyn LocalStore>,
    ) -> Result<Self> {
        let channel = RealtimeChannel::websocket(config.realtime.channel_config());
        Self::start_with_channel(config, context, remote, store, channel)
    }

    /// Starts the stack over a caller-built channel.
    ///
    /// Used to run the stack over a transport other than WebSocket.
    pub fn start_with_channel(
        config: EngineConfig,
        context: SyncContext,
        remote: Arc<dyn RemoteClient>,
        store: Arc<dyn LocalStore>,
        channel: RealtimeChannel,
    ) -> Result<Self> {
        let events = EventBus::new();
        let monitor = SessionMonitor::new(
            config.clone(),
            context.clone(),
            Arc::clone(&remote),
            channel.clone(),
        )?
        .with_events(events.clone());
        let engine = SyncEngine::new(config, context.clone(), remote, store, channel.clone())?
            .with_events(events.clone());

        let (engine, engine_task) = engine.spawn();
        let session = monitor.spawn();
        info!(connected = context.is_connected(), "sync service started");

        Ok(SyncService {
            context,
            channel,
            events,
            engine,
            engine_task,
            session,
        })
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    pub fn channel(&self) -> &RealtimeChannel {
        &self.channel
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Stops both loops and closes the channel.
    pub async fn shutdown(self) {
        self.engine.shutdown().await;
        let _ = self.engine_task.await;
        self.session.shutdown().await;
        self.channel.disconnect();
        info!("sync service stopped");
    }
}
