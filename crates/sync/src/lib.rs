// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! roam-sync: keeps local settings and data collections in step with a
//! remote service across devices.
//!
//! # Main Components
//!
//! - [`SyncEngine`] - orchestrator: periodic pull cycle, realtime pushes, uploads
//! - [`SessionMonitor`] - heartbeat and session-validity checks
//! - [`RealtimeChannel`] - auto-reconnecting push channel over a [`Transport`]
//! - [`OfflineQueue`] - durable FIFO of uploads that could not be sent
//! - [`SyncContext`] - shared credentials; clearing it tears sync down
//! - [`SyncService`] - all of the above wired together
//!
//! ```text
//!               ┌──────────── SyncContext (watch) ────────────┐
//!               ▼                                             ▼
//!   RealtimeChannel ──sync:*──► SyncEngine ──► LocalStore   SessionMonitor
//!        ▲     └────session:*──────────────────────────────────┘
//!        │                      │    │
//!        └──── broadcast ───────┘    └──► OfflineQueue (JSONL)
//!                                   RemoteClient ◄── both
//! ```
//!
//! The remote API and the local store are traits ([`RemoteClient`],
//! [`LocalStore`]) supplied by the embedder.

pub mod channel;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod queue;
pub mod remote;
pub mod service;
pub mod session;
pub mod store;
pub mod transport;

pub use channel::{
    ChannelConfig, ListenerId, RealtimeChannel, SharedConnectionState, TransportFactory,
    STATE_CONNECTED, STATE_CONNECTING, STATE_DISCONNECTED,
};
pub use config::{
    load_credentials, remove_credentials, save_credentials, EngineConfig, RealtimeConfig,
};
pub use context::SyncContext;
pub use engine::{EngineHandle, SyncEngine, SyncReport};
pub use error::{Error, FailureKind, Result};
pub use events::{EngineState, EventBus, SessionSignal, SyncEvent};
pub use queue::{DrainReport, OfflineQueue, QueueError, QueueResult};
pub use remote::{RemoteClient, RemoteResult};
pub use service::SyncService;
pub use session::{SessionHandle, SessionMonitor};
pub use store::{JsonFileStore, LocalStore, LocalStoreError, MemoryStore};
pub use transport::{
    Transport, TransportError, TransportFuture, TransportResult, WebSocketTransport,
};
