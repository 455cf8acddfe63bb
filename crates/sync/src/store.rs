// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local persistence for settings and data collections.
//!
//! [`JsonFileStore`] keeps one JSON document per resource:
//!
//! ```text
//! <dir>/settings.json
//! <dir>/data/<data_type>.json
//! ```
//!
//! Writes go through a temp file and a rename. [`MemoryStore`] backs tests
//! and embedders that persist elsewhere.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use roam_core::DataMap;
use serde_json::Value;

const SETTINGS_FILE: &str = "settings.json";
const DATA_DIR: &str = "data";

/// Failure reading or writing local state.
#[derive(Debug, thiserror::Error)]
#[error("local store: {message}")]
pub struct LocalStoreError {
    message: String,
}

impl LocalStoreError {
    pub fn new(message: impl Into<String>) -> Self {
        LocalStoreError {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for LocalStoreError {
    fn from(e: std::io::Error) -> Self {
        LocalStoreError::new(e.to_string())
    }
}

impl From<serde_json::Error> for LocalStoreError {
    fn from(e: serde_json::Error) -> Self {
        LocalStoreError::new(e.to_string())
    }
}

/// Local copy of the synced resources.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Current settings; `Null` when none are stored.
    async fn local_settings(&self) -> Result<Value, LocalStoreError>;

    async fn save_local_settings(&self, settings: &Value) -> Result<(), LocalStoreError>;

    /// Current collection; empty when none is stored.
    async fn local_data(&self, data_type: &str) -> Result<DataMap, LocalStoreError>;

    async fn save_local_data(&self, data_type: &str, data: &DataMap) -> Result<(), LocalStoreError>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: Mutex<Value>,
    data: Mutex<HashMap<String, DataMap>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `settings`.
    pub fn with_settings(settings: Value) -> Self {
        MemoryStore {
            settings: Mutex::new(settings),
            data: Mutex::default(),
        }
    }

    /// Snapshot of the stored settings.
    pub fn settings(&self) -> Value {
        self.settings.lock().clone()
    }

    /// Snapshot of one stored collection.
    pub fn data(&self, data_type: &str) -> DataMap {
        self.data.lock().get(data_type).cloned().unwrap_or_default()
    }

    /// Replaces one collection.
    pub fn set_data(&self, data_type: &str, data: DataMap) {
        self.data.lock().insert(data_type.to_string(), data);
    }

    /// Replaces the settings.
    pub fn set_settings(&self, settings: Value) {
        *self.settings.lock() = settings;
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn local_settings(&self) -> Result<Value, LocalStoreError> {
        Ok(self.settings())
    }

    async fn save_local_settings(&self, settings: &Value) -> Result<(), LocalStoreError> {
        self.set_settings(settings.clone());
        Ok(())
    }

    async fn local_data(&self, data_type: &str) -> Result<DataMap, LocalStoreError> {
        Ok(self.data(data_type))
    }

    async fn save_local_data(
        &self,
        data_type: &str,
        data: &DataMap,
    ) -> Result<(), LocalStoreError> {
        self.set_data(data_type, data.clone());
        Ok(())
    }
}

/// Store backed by JSON files under one directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`. Nothing is touched until first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    fn data_path(&self, data_type: &str) -> Result<PathBuf, LocalStoreError> {
        let valid = !data_type.is_empty()
            && data_type != "."
            && data_type != ".."
            && !data_type.contains(['/', '\\'])
            && !data_type.contains('\0');
        if !valid {
            return Err(LocalStoreError::new(format!("invalid data type {data_type:?}")));
        }
        Ok(self.dir.join(DATA_DIR).join(format!("{data_type}.json")))
    }
}

async fn read_json(path: &Path) -> Result<Option<Value>, LocalStoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_json(path: &Path, value: &Value) -> Result<(), LocalStoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let bytes = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl LocalStore for JsonFileStore {
    async fn local_settings(&self) -> Result<Value, LocalStoreError> {
        Ok(read_json(&self.settings_path()).await?.unwrap_or(Value::Null))
    }

    async fn save_local_settings(&self, settings: &Value) -> Result<(), LocalStoreError> {
        write_json(&self.settings_path(), settings).await
    }

    async fn local_data(&self, data_type: &str) -> Result<DataMap, LocalStoreError> {
        match read_json(&self.data_path(data_type)?).await? {
            None => Ok(DataMap::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(other) => Err(LocalStoreError::new(format!(
                "data for {data_type:?} is not an object: {}",
                json_kind(&other)
            ))),
        }
    }

    async fn save_local_data(
        &self,
        data_type: &str,
        data: &DataMap,
    ) -> Result<(), LocalStoreError> {
        write_json(&self.data_path(data_type)?, &Value::Object(data.clone())).await
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
