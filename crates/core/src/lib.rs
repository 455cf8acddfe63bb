// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! roam-core: shared data model for the roam sync engine
//!
//! This crate provides the types exchanged with the remote service, the
//! conflict resolver, the realtime wire protocol and the small storage
//! primitives used by the engine in `roam-sync`. Nothing here performs
//! network I/O.

pub mod clock;
pub mod error;
pub mod jsonl;
pub mod merge;
pub mod model;
pub mod protocol;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, ErrorKind, RemoteError, Result};
pub use merge::{merge_data, resolve_settings, MergeStrategy, Resolution};
pub use model::{
    DataMap, DataRecord, DeviceInfo, HeartbeatAck, OperationKind, PendingUpdates, QueuedOperation,
    Session, SyncConfig, SyncPreferences, SyncStatus, UpdateCheck, UploadAck, VersionedSettings,
};
pub use protocol::{InboundMessage, OutboundMessage};
