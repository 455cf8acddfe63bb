// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session liveness monitor.
//!
//! While a token is present the monitor heartbeats on a fixed period and
//! periodically confirms that this device's session is still listed by the
//! remote. It also reacts to `session:*` events on the realtime channel.
//!
//! Terminal outcomes (expired, deleted) tear sync down through
//! [`SyncContext::clear`]. Only the caller whose clear succeeded
//! disconnects the channel and emits the signal, so concurrent failures
//! produce exactly one teardown.

use std::sync::Arc;

use parking_lot::Mutex;
use roam_core::protocol::{EVENT_SESSION_DELETED, EVENT_SESSION_EXPIRED};
use roam_core::{Clock, DeviceInfo, ErrorKind, InboundMessage, SystemClock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::RealtimeChannel;
use crate::config::EngineConfig;
use crate::context::SyncContext;
use crate::engine::next_tick;
use crate::error::Result;
use crate::events::{EventBus, SessionSignal, SyncEvent};
use crate::remote::RemoteClient;

/// Heartbeat and session-validity checks for the current device.
pub struct SessionMonitor {
    config: EngineConfig,
    context: SyncContext,
    remote: Arc<dyn RemoteClient>,
    channel: RealtimeChannel,
    events: EventBus,
    clock: Arc<dyn Clock>,
    session_id: Mutex<Option<String>>,
}

impl SessionMonitor {
    /// Creates a monitor over the shared context, remote and channel.
    ///
    /// Fails if `config` does not validate.
    pub fn new(
        config: EngineConfig,
        context: SyncContext,
        remote: Arc<dyn RemoteClient>,
        channel: RealtimeChannel,
    ) -> Result<Self> {
        config.validate()?;
        Ok(SessionMonitor {
            config,
            context,
            remote,
            channel,
            events: EventBus::new(),
            clock: Arc::new(SystemClock),
            session_id: Mutex::new(None),
        })
    }

    /// Replaces the clock used to stamp heartbeats.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Emits session signals on `events` instead of a private bus.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Session id learned from the last successful heartbeat.
    pub fn current_session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    /// Sends one heartbeat and classifies any failure.
    ///
    /// Returns the signal raised, if any.
    pub async fn send_heartbeat(&self) -> Option<SessionSignal> {
        if !self.context.is_connected() {
            debug!("heartbeat skipped: not connected");
            return None;
        }

        let device = DeviceInfo::current(self.clock.now());
        match self.remote.heartbeat(&device).await {
            Ok(ack) => {
                if let Some(id) = ack.session_id {
                    let mut current = self.session_id.lock();
                    if current.as_deref() != Some(id.as_str()) {
                        debug!(session_id = %id, "session id recorded");
                        *current = Some(id);
                    }
                }
                None
            }
            Err(e) if e.kind.is_terminal() => {
                warn!(error = %e, "heartbeat rejected");
                let signal = match e.kind {
                    ErrorKind::AuthDenied => SessionSignal::Expired,
                    _ => SessionSignal::Deleted,
                };
                self.end_session(signal)
            }
            Err(e) => {
                warn!(error = %e, "heartbeat failed");
                if !self.context.is_connected() {
                    return None;
                }
                self.events.emit(SyncEvent::Session(SessionSignal::Invalid));
                Some(SessionSignal::Invalid)
            }
        }
    }

    /// Confirms the recorded session is still listed by the remote.
    ///
    /// Without a recorded session id only credential rejection is acted on.
    pub async fn check_session(&self) -> Option<SessionSignal> {
        if !self.context.is_connected() {
            return None;
        }

        let sessions = match self.remote.sessions().await {
            Ok(sessions) => sessions,
            Err(e) if e.kind == ErrorKind::AuthDenied => {
                warn!(error = %e, "session check rejected");
                return self.end_session(SessionSignal::Expired);
            }
            Err(e) => {
                warn!(error = %e, "session check failed");
                return None;
            }
        };

        let Some(current) = self.current_session_id() else {
            debug!(listed = sessions.len(), "no session id recorded yet");
            return None;
        };
        if sessions.iter().any(|s| s.id == current) {
            debug!(session_id = %current, "session still active");
            None
        } else {
            info!(session_id = %current, "current session no longer listed");
            self.end_session(SessionSignal::Deleted)
        }
    }

    /// Reacts to a `session:*` event from the realtime channel.
    pub async fn handle_event(&self, msg: &InboundMessage) -> Option<SessionSignal> {
        if !self.context.is_connected() {
            return None;
        }

        match msg {
            InboundMessage::SessionExpired => self.end_session(SessionSignal::Expired),
            InboundMessage::SessionDeleted { session_id: Some(id) } => {
                if self.current_session_id().as_deref() == Some(id.as_str()) {
                    self.end_session(SessionSignal::Deleted)
                } else {
                    debug!(session_id = %id, "another session was deleted");
                    None
                }
            }
            // Same-account broadcast without a target: confirm before acting.
            InboundMessage::SessionDeleted { session_id: None } => self.check_session().await,
            _ => None,
        }
    }

    fn end_session(&self, signal: SessionSignal) -> Option<SessionSignal> {
        if !self.context.clear() {
            debug!(?signal, "session already torn down");
            return None;
        }
        *self.session_id.lock() = None;
        self.channel.disconnect();
        info!(?signal, "session ended, sync torn down");
        self.events.emit(SyncEvent::Session(signal));
        Some(signal)
    }

    fn timers(&self) -> (Interval, Interval) {
        // First heartbeat fires immediately.
        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval());
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let period = self.config.session_check_interval();
        let mut check = tokio::time::interval_at(Instant::now() + period, period);
        check.set_missed_tick_behavior(MissedTickBehavior::Delay);

        (heartbeat, check)
    }

    /// Starts the monitor loop on the current runtime.
    pub fn spawn(self) -> SessionHandle {
        let cancel = CancellationToken::new();
        let monitor = Arc::new(self);
        let task = tokio::spawn(Arc::clone(&monitor).run(cancel.clone()));
        SessionHandle {
            monitor,
            cancel,
            task,
        }
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let (tx, mut inbound) = mpsc::unbounded_channel();
        let mut listeners = Vec::new();
        for event in [EVENT_SESSION_DELETED, EVENT_SESSION_EXPIRED] {
            let tx = tx.clone();
            let id = self.channel.on(event, move |msg| {
                let _ = tx.send(msg.clone());
            });
            listeners.push((event, id));
        }

        let mut config_rx = self.context.subscribe();
        let mut heartbeat: Option<Interval> = None;
        let mut session_check: Option<Interval> = None;
        let mut armed = false;

        loop {
            let connected = self.context.is_connected();
            if connected && !armed {
                let (hb, check) = self.timers();
                heartbeat = Some(hb);
                session_check = Some(check);
                armed = true;
                debug!("session monitor armed");
                if self.config.check_session_on_start {
                    self.check_session().await;
                }
            } else if !connected && armed {
                heartbeat = None;
                session_check = None;
                armed = false;
                *self.session_id.lock() = None;
                debug!("session monitor idle");
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                changed = config_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    config_rx.borrow_and_update();
                }
                Some(msg) = inbound.recv() => {
                    self.handle_event(&msg).await;
                }
                _ = next_tick(&mut heartbeat) => {
                    self.send_heartbeat().await;
                }
                _ = next_tick(&mut session_check) => {
                    self.check_session().await;
                }
            }
        }

        for (event, id) in listeners {
            self.channel.off(event, id);
        }
        debug!("session monitor stopped");
    }
}

/// Handle to a spawned [`SessionMonitor`].
pub struct SessionHandle {
    monitor: Arc<SessionMonitor>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn monitor(&self) -> &SessionMonitor {
        &self.monitor
    }

    /// See [`SessionMonitor::current_session_id`].
    pub fn current_session_id(&self) -> Option<String> {
        self.monitor.current_session_id()
    }

    /// Stops the monitor loop and waits for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}
