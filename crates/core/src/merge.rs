// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict resolution between local and remote state.
//!
//! Settings and data collections follow different rules:
//! - Settings: strategy-driven, using the remote `updated_at` against the
//!   last instant the local copy was updated
//! - Data: key-level union, remote entries always overwrite local ones
//!
//! Both merges are shallow. Nested values are replaced wholesale by the
//! winning side.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::DataMap;

/// Rule deciding which side survives a concurrent settings edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Remote fields always overwrite local ones.
    RemoteWins,
    /// Local settings are kept as-is.
    LocalWins,
    /// Remote wins only if strictly newer than the last local update.
    #[default]
    NewerWins,
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MergeStrategy::RemoteWins => "remote-wins",
            MergeStrategy::LocalWins => "local-wins",
            MergeStrategy::NewerWins => "newer-wins",
        };
        write!(f, "{s}")
    }
}

impl FromStr for MergeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "remote-wins" => Ok(MergeStrategy::RemoteWins),
            "local-wins" => Ok(MergeStrategy::LocalWins),
            "newer-wins" => Ok(MergeStrategy::NewerWins),
            other => Err(Error::InvalidStrategy(other.to_string())),
        }
    }
}

/// Outcome of a settings merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Settings to persist locally.
    pub merged: Value,
    /// New "last local update" instant.
    pub local_update: Option<DateTime<Utc>>,
    /// Whether the remote side won.
    pub remote_applied: bool,
}

/// Merges remote settings into local settings.
///
/// `last_local_update` of `None` means the local copy has never been
/// updated, so any remote timestamp is newer.
pub fn resolve_settings(
    local: &Value,
    remote: &Value,
    remote_updated_at: DateTime<Utc>,
    strategy: MergeStrategy,
    last_local_update: Option<DateTime<Utc>>,
) -> Resolution {
    let remote_wins = match strategy {
        MergeStrategy::RemoteWins => true,
        MergeStrategy::LocalWins => false,
        MergeStrategy::NewerWins => is_newer(remote_updated_at, last_local_update),
    };

    if remote_wins {
        Resolution {
            merged: shallow_merge(local, remote),
            local_update: Some(remote_updated_at),
            remote_applied: true,
        }
    } else {
        Resolution {
            merged: local.clone(),
            local_update: last_local_update,
            remote_applied: false,
        }
    }
}

/// Unions two data collections; remote entries overwrite same-key local ones.
///
/// No timestamps are consulted.
pub fn merge_data(local: &DataMap, remote: &DataMap) -> DataMap {
    let mut merged = local.clone();
    for (key, value) in remote {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Overlays the top-level fields of `remote` onto `local`.
///
/// A non-object `local` starts from an empty object; a non-object
/// `remote` contributes nothing.
pub fn shallow_merge(local: &Value, remote: &Value) -> Value {
    let mut merged = match local {
        Value::Object(map) => map.clone(),
        _ => DataMap::new(),
    };
    if let Value::Object(fields) = remote {
        for (key, value) in fields {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

fn is_newer(remote_updated_at: DateTime<Utc>, last_local_update: Option<DateTime<Utc>>) -> bool {
    match last_local_update {
        Some(local) => remote_updated_at > local,
        None => true,
    }
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
