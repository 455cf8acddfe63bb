// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime channel with automatic reconnection.
//!
//! A [`RealtimeChannel`] owns at most one background connection task. The
//! task asks a [`TransportFactory`] for a fresh transport, connects with
//! exponential backoff, then pumps inbound events to listeners and outbound
//! messages to the transport until the connection drops (reconnect) or
//! [`RealtimeChannel::disconnect`] is called (stop).
//!
//! ```text
//!   connect() ──► task ──► factory() ──► Transport::connect
//!                   │                         │ Err: sleep(backoff), retry
//!                   │                         ▼ Ok
//!                   │        ┌──── pump ◄─────┘
//!                   │        │  recv ─► listeners[event]
//!                   │        │  send ◄─ send() queue
//!                   │        └─► lost ─► retry
//!   disconnect() ── cancel ─► task exits, listeners no longer called
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use roam_core::{InboundMessage, OutboundMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::transport::{Transport, TransportError, TransportResult, WebSocketTransport};

/// Connection state values for atomic state field.
pub const STATE_DISCONNECTED: u8 = 0;
pub const STATE_CONNECTING: u8 = 1;
pub const STATE_CONNECTED: u8 = 2;

/// Connection state visible to both the background task and callers.
///
/// Uses atomic fields for lock-free reads.
pub struct SharedConnectionState {
    state: AtomicU8,
}

impl SharedConnectionState {
    /// Create a new shared state initialized to disconnected.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(STATE_DISCONNECTED),
        }
    }

    pub fn get(&self) -> u8 {
        self.state.load(Ordering::Acquire)
    }

    pub fn set(&self, state: u8) {
        self.state.store(state, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.get() == STATE_CONNECTED
    }
}

impl Default for SharedConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Reconnect policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Maximum consecutive failed connect attempts (0 = unlimited).
    pub max_retries: u32,
    /// Maximum delay between reconnection attempts (seconds).
    pub max_delay_secs: u64,
    /// Initial delay for exponential backoff (milliseconds).
    pub initial_delay_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            max_delay_secs: 30,
            initial_delay_ms: 100,
        }
    }
}

/// Creates a fresh, unconnected transport for each connect attempt.
pub type TransportFactory = Arc<dyn Fn() -> Box<dyn Transport> + Send + Sync>;

/// Identifies a registered listener for [`RealtimeChannel::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

/// Persistent bidirectional event channel.
///
/// Cloning yields another handle to the same channel. All methods that
/// start work must be called from within a tokio runtime.
#[derive(Clone)]
pub struct RealtimeChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    config: ChannelConfig,
    factory: TransportFactory,
    listeners: Mutex<HashMap<String, Vec<(ListenerId, Listener)>>>,
    next_listener: AtomicU64,
    session: Mutex<Option<ChannelSession>>,
    /// Held shared for each listener call and exclusively by `disconnect`.
    delivery: RwLock<()>,
}

/// One connect..disconnect lifetime.
struct ChannelSession {
    state: Arc<SharedConnectionState>,
    cancel: CancellationToken,
    outbound: mpsc::UnboundedSender<OutboundMessage>,
    task: JoinHandle<()>,
}

impl ChannelSession {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }
}

impl RealtimeChannel {
    /// Creates a channel that builds transports with `factory`.
    pub fn new(config: ChannelConfig, factory: TransportFactory) -> Self {
        RealtimeChannel {
            inner: Arc::new(ChannelInner {
                config,
                factory,
                listeners: Mutex::new(HashMap::new()),
                next_listener: AtomicU64::new(1),
                session: Mutex::new(None),
                delivery: RwLock::new(()),
            }),
        }
    }

    /// Creates a channel over [`WebSocketTransport`].
    pub fn websocket(config: ChannelConfig) -> Self {
        Self::new(
            config,
            Arc::new(|| Box::new(WebSocketTransport::new()) as Box<dyn Transport>),
        )
    }

    /// Starts connecting to `url` and keeps the connection alive.
    ///
    /// Idempotent: while a connection task is live, further calls are
    /// ignored. Returns immediately; observe [`RealtimeChannel::state`].
    pub fn connect(&self, url: &str, token: &str) {
        let mut session = self.inner.session.lock();
        if session.as_ref().is_some_and(ChannelSession::is_live) {
            debug!("realtime channel already active");
            return;
        }

        let state = Arc::new(SharedConnectionState::new());
        state.set(STATE_CONNECTING);
        let cancel = CancellationToken::new();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_connection(
            Arc::clone(&self.inner),
            url.to_string(),
            token.to_string(),
            Arc::clone(&state),
            outbound_rx,
            cancel.clone(),
        ));

        *session = Some(ChannelSession {
            state,
            cancel,
            outbound: outbound_tx,
            task,
        });
    }

    /// Closes the connection and stops reconnecting.
    ///
    /// Waits for a listener call already in progress, and no listener call
    /// starts after this returns. Must not be called from inside a
    /// listener. Returns true if a connection task was running.
    pub fn disconnect(&self) -> bool {
        let Some(session) = self.inner.session.lock().take() else {
            return false;
        };
        session.cancel.cancel();
        drop(self.inner.delivery.write());
        session.state.set(STATE_DISCONNECTED);
        info!("realtime channel disconnected");
        true
    }

    /// Queues `msg` for delivery on the open connection.
    ///
    /// Fails with [`TransportError::ConnectionClosed`] when not connected.
    /// Delivery is fire-and-forget: a send error on the wire triggers a
    /// reconnect, not a retry of this message.
    pub fn send(&self, msg: OutboundMessage) -> TransportResult<()> {
        let session = self.inner.session.lock();
        match session.as_ref() {
            Some(s) if s.is_live() && s.state.is_connected() => {
                s.outbound.send(msg).map_err(|_| TransportError::ConnectionClosed)
            }
            _ => Err(TransportError::ConnectionClosed),
        }
    }

    /// Returns true if the channel is connected.
    pub fn is_connected(&self) -> bool {
        self.state() == STATE_CONNECTED
    }

    /// Current connection state (`STATE_*`).
    pub fn state(&self) -> u8 {
        match self.inner.session.lock().as_ref() {
            Some(s) if !s.cancel.is_cancelled() => s.state.get(),
            _ => STATE_DISCONNECTED,
        }
    }

    /// Registers `listener` for events named `event`.
    pub fn on<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .lock()
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let Some(list) = listeners.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(lid, _)| *lid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.listeners.lock().get(event).map_or(0, Vec::len)
    }
}

impl ChannelInner {
    /// Invokes the listeners for `msg`'s event name.
    ///
    /// Listeners run outside the registry lock, so they may call `on`/`off`.
    fn dispatch(&self, msg: &InboundMessage, cancel: &CancellationToken) {
        let snapshot: Vec<Listener> = match self.listeners.lock().get(msg.event_name()) {
            Some(list) => list.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => {
                debug!(event = msg.event_name(), "no listener for realtime event");
                return;
            }
        };
        for listener in snapshot {
            let _delivering = self.delivery.read();
            if cancel.is_cancelled() {
                return;
            }
            listener(msg);
        }
    }
}

enum PumpExit {
    Cancelled,
    Lost(String),
}

/// Background connection task with exponential backoff.
async fn run_connection(
    inner: Arc<ChannelInner>,
    url: String,
    token: String,
    state: Arc<SharedConnectionState>,
    mut outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    cancel: CancellationToken,
) {
    let config = inner.config.clone();
    let mut attempt = 0u32;
    let mut delay_ms = config.initial_delay_ms;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        attempt = attempt.saturating_add(1);
        state.set(STATE_CONNECTING);

        let mut transport = (inner.factory)();

        let connect_result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = transport.connect(&url, &token) => result,
        };

        match connect_result {
            Ok(()) => {
                attempt = 0;
                delay_ms = config.initial_delay_ms;
                state.set(STATE_CONNECTED);
                info!(%url, "realtime channel connected");

                let exit = pump(&inner, &mut *transport, &mut outbound, &cancel).await;
                let _ = transport.disconnect().await;
                match exit {
                    PumpExit::Cancelled => break,
                    PumpExit::Lost(reason) => {
                        warn!(%reason, "realtime connection lost, reconnecting");
                    }
                }
            }
            Err(e) => {
                if config.max_retries > 0 && attempt >= config.max_retries {
                    warn!(attempts = attempt, error = %e, "realtime channel giving up");
                    break;
                }
                debug!(attempt, error = %e, "realtime connect failed");
            }
        }

        state.set(STATE_CONNECTING);
        let delay = Duration::from_millis(delay_ms);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        // Increase delay for next attempt (exponential backoff with cap)
        delay_ms = std::cmp::min(
            delay_ms.saturating_mul(2),
            config.max_delay_secs.saturating_mul(1000),
        );
    }

    state.set(STATE_DISCONNECTED);
}

/// Moves messages between the transport and the channel until the
/// connection ends.
async fn pump(
    inner: &ChannelInner,
    transport: &mut dyn Transport,
    outbound: &mut mpsc::UnboundedReceiver<OutboundMessage>,
    cancel: &CancellationToken,
) -> PumpExit {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return PumpExit::Cancelled,
            msg = outbound.recv() => match msg {
                Some(msg) => {
                    if let Err(e) = transport.send(msg).await {
                        return PumpExit::Lost(e.to_string());
                    }
                }
                None => return PumpExit::Cancelled,
            },
            result = transport.recv() => match result {
                Ok(Some(msg)) => inner.dispatch(&msg, cancel),
                Ok(None) => return PumpExit::Lost("closed by server".to_string()),
                Err(e) => return PumpExit::Lost(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
