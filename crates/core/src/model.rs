// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Data model shared by the sync engine and the remote contract.
//!
//! All types serialize with camelCase field names, which is what the
//! remote service speaks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Key/value contents of one typed data collection.
pub type DataMap = serde_json::Map<String, Value>;

/// Credentials and endpoint for the remote service.
///
/// A present, non-empty access token is the only thing that makes the
/// engine "connected". Clearing it tears down all sync activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub api_base: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl SyncConfig {
    /// Creates a config for the given API base without a token.
    pub fn new(api_base: impl Into<String>) -> Self {
        SyncConfig {
            api_base: api_base.into(),
            ..Default::default()
        }
    }

    /// Returns a copy carrying the given access token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Returns true if an access token is present.
    pub fn is_connected(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Server-declared sync feature flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub sync_settings: bool,
    pub sync_data: bool,
    #[serde(default)]
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl SyncStatus {
    /// Whether settings sync is enabled.
    pub fn settings_enabled(&self) -> bool {
        self.sync_settings
    }

    /// Whether data sync is enabled.
    ///
    /// Data sync without settings sync is disallowed, whatever the
    /// server reports for `sync_data` alone.
    pub fn data_enabled(&self) -> bool {
        self.sync_settings && self.sync_data
    }
}

/// Preferences sent to the remote when the user toggles sync features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPreferences {
    pub sync_settings: bool,
    pub sync_data: bool,
}

impl SyncPreferences {
    /// Creates preferences, forcing data sync off when settings sync is off.
    pub fn new(sync_settings: bool, sync_data: bool) -> Self {
        SyncPreferences {
            sync_settings,
            sync_data: sync_settings && sync_data,
        }
    }
}

/// Remote settings object with its ordering token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedSettings {
    pub settings: Value,
    /// Monotonically increasing; authoritative ordering for settings.
    pub version: u64,
    /// Used only by the conflict resolver.
    pub updated_at: DateTime<Utc>,
}

/// One typed data collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRecord {
    pub data_type: String,
    pub data: DataMap,
}

/// Which upload path a queued operation replays through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Settings,
    Data,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Settings => write!(f, "settings"),
            OperationKind::Data => write!(f, "data"),
        }
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "settings" => Ok(OperationKind::Settings),
            "data" => Ok(OperationKind::Data),
            other => Err(Error::InvalidOperationKind(other.to_string())),
        }
    }
}

/// A mutation that could not reach the remote and waits for replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOperation {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedOperation {
    /// Creates an operation, checking that data operations name their type.
    pub fn new(
        kind: OperationKind,
        data: Value,
        data_type: Option<String>,
        enqueued_at: DateTime<Utc>,
    ) -> Result<Self> {
        if kind == OperationKind::Data && !data_type.as_deref().is_some_and(|t| !t.is_empty()) {
            return Err(Error::MissingDataType);
        }
        Ok(QueuedOperation {
            kind,
            data,
            data_type,
            enqueued_at,
        })
    }

    /// Creates a settings upload.
    pub fn settings(settings: Value, enqueued_at: DateTime<Utc>) -> Self {
        QueuedOperation {
            kind: OperationKind::Settings,
            data: settings,
            data_type: None,
            enqueued_at,
        }
    }

    /// Creates a data upload for one collection.
    pub fn data(data_type: impl Into<String>, data: DataMap, enqueued_at: DateTime<Utc>) -> Self {
        QueuedOperation {
            kind: OperationKind::Data,
            data: Value::Object(data),
            data_type: Some(data_type.into()),
            enqueued_at,
        }
    }
}

/// One authenticated device binding known to the remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub device_info: Value,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Device identifiers sent with every heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub platform: String,
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
}

impl DeviceInfo {
    /// Describes the running process at the given instant.
    pub fn current(timestamp: DateTime<Utc>) -> Self {
        DeviceInfo {
            platform: std::env::consts::OS.to_string(),
            user_agent: format!("roam/{}", env!("CARGO_PKG_VERSION")),
            timestamp,
        }
    }
}

/// Which resources changed remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpdates {
    #[serde(default)]
    pub settings: bool,
    #[serde(default)]
    pub data: std::collections::BTreeMap<String, bool>,
}

impl PendingUpdates {
    /// Returns true if the given data type has remote changes.
    pub fn data_changed(&self, data_type: &str) -> bool {
        self.data.get(data_type).copied().unwrap_or(false)
    }
}

/// Response to a has-updates query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheck {
    pub has_updates: bool,
    #[serde(default)]
    pub updates: PendingUpdates,
}

/// Response to a settings upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAck {
    pub version: u64,
}

/// Response to a heartbeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatAck {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
