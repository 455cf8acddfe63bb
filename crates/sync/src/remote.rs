// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Contract of the remote sync service.
//!
//! The engine never performs HTTP itself. Embedders provide a
//! [`RemoteClient`] that authenticates with the token held by the
//! [`SyncContext`](crate::SyncContext) and maps every failure to a
//! [`RemoteError`] with the right [`ErrorKind`](roam_core::ErrorKind).

use async_trait::async_trait;
use roam_core::{
    DataMap, DeviceInfo, HeartbeatAck, RemoteError, Session, SyncPreferences, SyncStatus,
    UpdateCheck, UploadAck, VersionedSettings,
};
use serde_json::Value;

/// Result type of remote calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Authenticated access to the remote sync service.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Feature flags for the current account.
    async fn sync_status(&self) -> RemoteResult<SyncStatus>;

    /// Updates the account's sync feature flags.
    async fn update_sync_preferences(&self, preferences: SyncPreferences) -> RemoteResult<()>;

    /// Reports which resources changed after `since_version`.
    ///
    /// `data_types` is `None` when data sync is off.
    async fn check_updates(
        &self,
        since_version: u64,
        data_types: Option<&[String]>,
    ) -> RemoteResult<UpdateCheck>;

    async fn download_settings(&self) -> RemoteResult<VersionedSettings>;

    /// Stores `settings` and returns the new version.
    async fn upload_settings(&self, settings: &Value) -> RemoteResult<UploadAck>;

    async fn download_data(&self, data_type: &str) -> RemoteResult<DataMap>;

    async fn upload_data(&self, data_type: &str, data: &DataMap) -> RemoteResult<()>;

    /// Reports liveness of this device's session.
    async fn heartbeat(&self, device: &DeviceInfo) -> RemoteResult<HeartbeatAck>;

    /// Lists the account's sessions.
    async fn sessions(&self) -> RemoteResult<Vec<Session>>;
}
