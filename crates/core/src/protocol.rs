// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime channel messages.
//!
//! Every message is a JSON object tagged by a `type` discriminator:
//! - Client sends `sync:settings` / `sync:data` after a successful upload
//! - Server pushes settings/data updates and session lifecycle events
//!
//! Inbound events with an unrecognised discriminator decode to
//! [`InboundMessage::Unknown`] so listeners registered for new event names
//! still receive them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::DataMap;

/// Event name of a pushed settings update.
pub const EVENT_SETTINGS_UPDATE: &str = "sync:settings:update";
/// Event name of a pushed data update.
pub const EVENT_DATA_UPDATE: &str = "sync:data:update";
/// Event name of a remote session deletion.
pub const EVENT_SESSION_DELETED: &str = "session:deleted";
/// Event name of a remote session expiry.
pub const EVENT_SESSION_EXPIRED: &str = "session:expired";

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// Settings accepted by the remote at `version`.
    #[serde(rename = "sync:settings")]
    Settings { settings: Value, version: u64 },

    /// Data collection accepted by the remote.
    #[serde(rename = "sync:data", rename_all = "camelCase")]
    Data { data_type: String, data: DataMap },
}

/// Messages pushed from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// Another session changed the settings.
    #[serde(rename = "sync:settings:update", rename_all = "camelCase")]
    SettingsUpdate {
        settings: Value,
        updated_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<u64>,
    },

    /// Another session changed a data collection.
    #[serde(rename = "sync:data:update", rename_all = "camelCase")]
    DataUpdate { data_type: String, data: DataMap },

    /// A session of this account was deleted.
    ///
    /// Without a session id the target is ambiguous.
    #[serde(rename = "session:deleted", rename_all = "camelCase")]
    SessionDeleted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },

    /// The current session expired.
    #[serde(rename = "session:expired")]
    SessionExpired,

    /// Any event this client does not model.
    #[serde(skip)]
    Unknown { event: String, payload: Value },
}

impl OutboundMessage {
    /// Creates a settings broadcast.
    pub fn settings(settings: Value, version: u64) -> Self {
        OutboundMessage::Settings { settings, version }
    }

    /// Creates a data broadcast.
    pub fn data(data_type: impl Into<String>, data: DataMap) -> Self {
        OutboundMessage::Data {
            data_type: data_type.into(),
            data,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl InboundMessage {
    /// Returns the discriminator listeners subscribe with.
    pub fn event_name(&self) -> &str {
        match self {
            InboundMessage::SettingsUpdate { .. } => EVENT_SETTINGS_UPDATE,
            InboundMessage::DataUpdate { .. } => EVENT_DATA_UPDATE,
            InboundMessage::SessionDeleted { .. } => EVENT_SESSION_DELETED,
            InboundMessage::SessionExpired => EVENT_SESSION_EXPIRED,
            InboundMessage::Unknown { event, .. } => event,
        }
    }

    /// Serializes the message to JSON.
    ///
    /// `Unknown` messages serialize back to their original payload.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        match self {
            InboundMessage::Unknown { payload, .. } => serde_json::to_string(payload),
            known => serde_json::to_string(known),
        }
    }

    /// Deserializes the message from JSON.
    ///
    /// Known discriminators must match their schema; unknown ones are
    /// preserved as [`InboundMessage::Unknown`].
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        let payload: Value = serde_json::from_str(s)?;
        let event = payload
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match event.as_str() {
            EVENT_SETTINGS_UPDATE
            | EVENT_DATA_UPDATE
            | EVENT_SESSION_DELETED
            | EVENT_SESSION_EXPIRED => serde_json::from_value(payload),
            _ => Ok(InboundMessage::Unknown { event, payload }),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
