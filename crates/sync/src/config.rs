// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration and credential persistence.
//!
//! Engine settings live in a TOML file, typically `roam.toml`:
//! - `data_types`: data collections to sync (empty = settings only)
//! - `merge_strategy`: `remote-wins`, `local-wins` or `newer-wins`
//! - interval knobs for the pull cycle, heartbeat and session check
//! - `[realtime]`: channel URL override and reconnect backoff
//!
//! Credentials ([`SyncConfig`]) are stored separately so they can be
//! cleared without touching engine settings.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use roam_core::{MergeStrategy, SyncConfig};
use serde::{Deserialize, Serialize};

use crate::channel::ChannelConfig;
use crate::error::{Error, Result};

/// Default file name of the offline queue.
pub const QUEUE_FILE_NAME: &str = "offline_queue.jsonl";
const APP_DIR_NAME: &str = "roam";
const REALTIME_PATH: &str = "/ws";
#[cfg(unix)]
const CREDENTIALS_MODE: u32 = 0o600;

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Data collections to sync alongside settings.
    #[serde(default)]
    pub data_types: Vec<String>,
    /// Conflict strategy for settings.
    #[serde(default)]
    pub merge_strategy: MergeStrategy,
    /// Seconds between periodic pull cycles (default: 300).
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    /// Seconds between heartbeats (default: 30).
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Seconds between session validity checks (default: 300).
    #[serde(default = "default_session_check_interval_secs")]
    pub session_check_interval_secs: u64,
    /// Check session validity as soon as a token appears (default: true).
    #[serde(default = "default_true")]
    pub check_session_on_start: bool,
    /// Offline queue location. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_path: Option<PathBuf>,
    /// Realtime channel settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

/// Realtime channel settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Channel URL. Derived from the API base when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Reconnect attempts before giving up (default: 0 = unlimited).
    #[serde(default)]
    pub max_retries: u32,
    /// Maximum delay between reconnect attempts in seconds (default: 30).
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    /// First reconnect delay in milliseconds (default: 100).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

fn default_sync_interval_secs() -> u64 {
    300
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_session_check_interval_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_max_delay_secs() -> u64 {
    30
}

fn default_initial_delay_ms() -> u64 {
    100
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        RealtimeConfig {
            url: None,
            max_retries: 0,
            max_delay_secs: default_max_delay_secs(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

impl RealtimeConfig {
    /// Reconnect policy for the realtime channel.
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            max_retries: self.max_retries,
            max_delay_secs: self.max_delay_secs,
            initial_delay_ms: self.initial_delay_ms,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            data_types: Vec::new(),
            merge_strategy: MergeStrategy::default(),
            sync_interval_secs: default_sync_interval_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            session_check_interval_secs: default_session_check_interval_secs(),
            check_session_on_start: true,
            queue_path: None,
            realtime: RealtimeConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Loads engine settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config: EngineConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves engine settings as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Checks intervals and data type names.
    pub fn validate(&self) -> Result<()> {
        for (name, secs) in [
            ("sync_interval_secs", self.sync_interval_secs),
            ("heartbeat_interval_secs", self.heartbeat_interval_secs),
            ("session_check_interval_secs", self.session_check_interval_secs),
        ] {
            if secs == 0 {
                return Err(Error::Config(format!("{name} must be greater than zero")));
            }
        }
        if let Some(bad) = self.data_types.iter().find(|t| t.is_empty()) {
            return Err(Error::Config(format!("invalid data type {bad:?}")));
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    pub fn session_check_interval(&self) -> Duration {
        Duration::from_secs(self.session_check_interval_secs.max(1))
    }

    /// Resolves the offline queue path.
    ///
    /// Uses `queue_path` when set, else `<data_local_dir>/roam/offline_queue.jsonl`.
    pub fn resolve_queue_path(&self) -> Result<PathBuf> {
        match &self.queue_path {
            Some(path) => Ok(path.clone()),
            None => dirs::data_local_dir()
                .map(|d| d.join(APP_DIR_NAME).join(QUEUE_FILE_NAME))
                .ok_or_else(|| {
                    Error::Config("no local data directory; set queue_path".to_string())
                }),
        }
    }

    /// Returns the realtime channel URL for `api_base`.
    ///
    /// An explicit `realtime.url` wins. Otherwise the API base's scheme is
    /// mapped to its WebSocket counterpart and `/ws` is appended.
    pub fn realtime_url(&self, api_base: &str) -> String {
        if let Some(url) = &self.realtime.url {
            return url.clone();
        }
        let base = api_base.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{base}{REALTIME_PATH}")
    }
}

/// Loads stored credentials.
///
/// Returns `None` if the file does not exist.
pub fn load_credentials(path: &Path) -> Result<Option<SyncConfig>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let config: SyncConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse credentials: {}", e)))?;
    Ok(Some(config))
}

/// Stores credentials, replacing any previous file.
///
/// On unix the file is readable and writable by the owner only.
pub fn save_credentials(path: &Path, config: &SyncConfig) -> Result<()> {
    let content = toml::to_string(config)
        .map_err(|e| Error::Config(format!("failed to serialize credentials: {}", e)))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_private(path, content.as_bytes())?;
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(CREDENTIALS_MODE)
        .open(path)?;
    // `mode` only applies on create; tighten a file left by an older write.
    file.set_permissions(fs::Permissions::from_mode(CREDENTIALS_MODE))?;
    file.write_all(content)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    fs::write(path, content)
}

/// Deletes stored credentials. Missing files are not an error.
pub fn remove_credentials(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
