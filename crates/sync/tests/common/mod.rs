// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles shared by the integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use roam_core::{
    DataMap, DeviceInfo, HeartbeatAck, InboundMessage, OutboundMessage, RemoteError, Session,
    SyncConfig, SyncPreferences, SyncStatus, UpdateCheck, UploadAck, VersionedSettings,
};
use roam_sync::{
    ChannelConfig, EngineConfig, LocalStore, LocalStoreError, MemoryStore, RealtimeChannel,
    RemoteClient, RemoteResult, SyncContext, SyncEvent, Transport, TransportError, TransportFactory,
    TransportFuture,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};

pub const API_BASE: &str = "https://api.example.test";
pub const TOKEN: &str = "token-1";

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn map(value: Value) -> DataMap {
    value.as_object().cloned().unwrap()
}

pub fn connected_config() -> SyncConfig {
    SyncConfig::new(API_BASE).with_token(TOKEN)
}

pub fn session(id: &str) -> Session {
    Session {
        id: id.to_string(),
        device_info: json!({"platform": "linux"}),
        last_activity_at: ts(1_000),
        created_at: ts(0),
    }
}

/// Polls `check` until it holds or two seconds pass.
pub async fn wait_until<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Like [`wait_until`] for an async condition.
pub async fn wait_for<F, Fut>(check: F) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check().await
}

/// Waits up to two seconds for an event matching `pred`.
pub async fn next_event<F>(rx: &mut broadcast::Receiver<SyncEvent>, pred: F) -> Option<SyncEvent>
where
    F: Fn(&SyncEvent) -> bool,
{
    let wait = async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return Some(event),
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(2), wait).await.ok().flatten()
}

// --- realtime side ---------------------------------------------------------

type Peer = mpsc::UnboundedSender<Option<InboundMessage>>;

#[derive(Default)]
struct HubState {
    connects: usize,
    disconnects: usize,
    fail_connects: usize,
    last_url: Option<String>,
    last_token: Option<String>,
    sent: Vec<OutboundMessage>,
    peer: Option<Peer>,
}

/// Server side of the mock transports a channel creates.
#[derive(Clone, Default)]
pub struct MockHub {
    state: Arc<Mutex<HubState>>,
}

impl MockHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(&self) -> TransportFactory {
        let hub = self.clone();
        Arc::new(move || Box::new(MockTransport::new(hub.clone())) as Box<dyn Transport>)
    }

    /// A channel with short reconnect delays over this hub.
    pub fn channel(&self) -> RealtimeChannel {
        let config = ChannelConfig {
            max_retries: 0,
            max_delay_secs: 1,
            initial_delay_ms: 10,
        };
        RealtimeChannel::new(config, self.factory())
    }

    pub fn fail_next_connects(&self, count: usize) {
        self.state.lock().fail_connects = count;
    }

    /// Delivers `msg` on the open connection.
    pub fn push(&self, msg: InboundMessage) -> bool {
        match &self.state.lock().peer {
            Some(peer) => peer.send(Some(msg)).is_ok(),
            None => false,
        }
    }

    /// Closes the open connection from the server side.
    pub fn drop_connection(&self) -> bool {
        match self.state.lock().peer.take() {
            Some(peer) => peer.send(None).is_ok(),
            None => false,
        }
    }

    pub fn has_peer(&self) -> bool {
        self.state.lock().peer.is_some()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().connects
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().disconnects
    }

    pub fn last_url(&self) -> Option<String> {
        self.state.lock().last_url.clone()
    }

    pub fn last_token(&self) -> Option<String> {
        self.state.lock().last_token.clone()
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.state.lock().sent.clone()
    }
}

/// One connection to a [`MockHub`].
pub struct MockTransport {
    hub: MockHub,
    link: Option<(Peer, mpsc::UnboundedReceiver<Option<InboundMessage>>)>,
}

impl MockTransport {
    fn new(hub: MockHub) -> Self {
        MockTransport { hub, link: None }
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, url: &str, token: &str) -> TransportFuture<'_, ()> {
        let url = url.to_string();
        let token = token.to_string();
        Box::pin(async move {
            let mut state = self.hub.state.lock();
            if state.fail_connects > 0 {
                state.fail_connects -= 1;
                return Err(TransportError::ConnectionFailed("mock failure".into()));
            }
            let (tx, rx) = mpsc::unbounded_channel();
            state.connects += 1;
            state.last_url = Some(url);
            state.last_token = Some(token);
            state.peer = Some(tx.clone());
            self.link = Some((tx, rx));
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some((tx, _)) = self.link.take() {
                let mut state = self.hub.state.lock();
                state.disconnects += 1;
                if state.peer.as_ref().is_some_and(|p| p.same_channel(&tx)) {
                    state.peer = None;
                }
            }
            Ok(())
        })
    }

    fn send(&mut self, msg: OutboundMessage) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if self.link.is_none() {
                return Err(TransportError::ConnectionClosed);
            }
            self.hub.state.lock().sent.push(msg);
            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<InboundMessage>> {
        Box::pin(async move {
            let Some((_, rx)) = self.link.as_mut() else {
                return Err(TransportError::ConnectionClosed);
            };
            match rx.recv().await {
                Some(Some(msg)) => Ok(Some(msg)),
                Some(None) | None => Ok(None),
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}

// --- remote side -----------------------------------------------------------

/// Scripted remote behavior plus a record of what was called.
pub struct RemoteState {
    pub status: RemoteResult<SyncStatus>,
    pub updates: RemoteResult<UpdateCheck>,
    pub settings: VersionedSettings,
    pub data: BTreeMap<String, DataMap>,
    pub download_errors: VecDeque<RemoteError>,
    pub upload_errors: VecDeque<RemoteError>,
    /// Consumed by settings uploads only, before `upload_errors`.
    pub settings_upload_errors: VecDeque<RemoteError>,
    pub next_version: u64,
    pub heartbeat: RemoteResult<HeartbeatAck>,
    pub sessions: RemoteResult<Vec<Session>>,
    pub calls: Vec<&'static str>,
    pub since_versions: Vec<u64>,
    pub uploaded_settings: Vec<Value>,
    pub uploaded_data: Vec<(String, DataMap)>,
    pub preferences: Vec<SyncPreferences>,
}

impl Default for RemoteState {
    fn default() -> Self {
        RemoteState {
            status: Ok(SyncStatus {
                sync_settings: true,
                sync_data: false,
                last_sync_at: None,
            }),
            updates: Ok(UpdateCheck::default()),
            settings: VersionedSettings {
                settings: json!({}),
                version: 1,
                updated_at: ts(0),
            },
            data: BTreeMap::new(),
            download_errors: VecDeque::new(),
            upload_errors: VecDeque::new(),
            settings_upload_errors: VecDeque::new(),
            next_version: 2,
            heartbeat: Ok(HeartbeatAck {
                session_id: Some("s1".to_string()),
            }),
            sessions: Ok(vec![session("s1")]),
            calls: Vec::new(),
            since_versions: Vec::new(),
            uploaded_settings: Vec::new(),
            uploaded_data: Vec::new(),
            preferences: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct MockRemote {
    state: Mutex<RemoteState>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the scripted state.
    pub fn with<R>(&self, f: impl FnOnce(&mut RemoteState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == name).count()
    }

    pub fn uploaded_settings(&self) -> Vec<Value> {
        self.state.lock().uploaded_settings.clone()
    }

    pub fn uploaded_data(&self) -> Vec<(String, DataMap)> {
        self.state.lock().uploaded_data.clone()
    }

    fn record(&self, call: &'static str) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl RemoteClient for MockRemote {
    async fn sync_status(&self) -> RemoteResult<SyncStatus> {
        self.record("sync_status");
        tokio::task::yield_now().await;
        self.state.lock().status.clone()
    }

    async fn update_sync_preferences(&self, preferences: SyncPreferences) -> RemoteResult<()> {
        self.record("update_sync_preferences");
        tokio::task::yield_now().await;
        self.state.lock().preferences.push(preferences);
        Ok(())
    }

    async fn check_updates(
        &self,
        since_version: u64,
        _data_types: Option<&[String]>,
    ) -> RemoteResult<UpdateCheck> {
        self.record("check_updates");
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.since_versions.push(since_version);
        state.updates.clone()
    }

    async fn download_settings(&self) -> RemoteResult<VersionedSettings> {
        self.record("download_settings");
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        match state.download_errors.pop_front() {
            Some(e) => Err(e),
            None => Ok(state.settings.clone()),
        }
    }

    async fn upload_settings(&self, settings: &Value) -> RemoteResult<UploadAck> {
        self.record("upload_settings");
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        let failure = state.settings_upload_errors.pop_front();
        if let Some(e) = failure.or_else(|| state.upload_errors.pop_front()) {
            return Err(e);
        }
        state.uploaded_settings.push(settings.clone());
        let version = state.next_version;
        state.next_version += 1;
        Ok(UploadAck { version })
    }

    async fn download_data(&self, data_type: &str) -> RemoteResult<DataMap> {
        self.record("download_data");
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        match state.download_errors.pop_front() {
            Some(e) => Err(e),
            None => Ok(state.data.get(data_type).cloned().unwrap_or_default()),
        }
    }

    async fn upload_data(&self, data_type: &str, data: &DataMap) -> RemoteResult<()> {
        self.record("upload_data");
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        if let Some(e) = state.upload_errors.pop_front() {
            return Err(e);
        }
        state.uploaded_data.push((data_type.to_string(), data.clone()));
        Ok(())
    }

    async fn heartbeat(&self, _device: &DeviceInfo) -> RemoteResult<HeartbeatAck> {
        self.record("heartbeat");
        tokio::task::yield_now().await;
        self.state.lock().heartbeat.clone()
    }

    async fn sessions(&self) -> RemoteResult<Vec<Session>> {
        self.record("sessions");
        tokio::task::yield_now().await;
        self.state.lock().sessions.clone()
    }
}

// --- local side ------------------------------------------------------------

/// A [`MemoryStore`] whose saves fail for chosen collections.
pub struct FailingStore {
    pub inner: Arc<MemoryStore>,
    failing_data: Mutex<HashSet<String>>,
}

impl FailingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        FailingStore {
            inner,
            failing_data: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_saves_for(&self, data_type: &str) {
        self.failing_data.lock().insert(data_type.to_string());
    }
}

#[async_trait]
impl LocalStore for FailingStore {
    async fn local_settings(&self) -> Result<Value, LocalStoreError> {
        self.inner.local_settings().await
    }

    async fn save_local_settings(&self, settings: &Value) -> Result<(), LocalStoreError> {
        self.inner.save_local_settings(settings).await
    }

    async fn local_data(&self, data_type: &str) -> Result<DataMap, LocalStoreError> {
        self.inner.local_data(data_type).await
    }

    async fn save_local_data(
        &self,
        data_type: &str,
        data: &DataMap,
    ) -> Result<(), LocalStoreError> {
        if self.failing_data.lock().contains(data_type) {
            return Err(LocalStoreError::new(format!("disk full writing {data_type}")));
        }
        self.inner.save_local_data(data_type, data).await
    }
}

// --- fixture ---------------------------------------------------------------

/// Everything an engine or monitor needs, backed by doubles.
pub struct Fixture {
    pub dir: TempDir,
    pub config: EngineConfig,
    pub context: SyncContext,
    pub remote: Arc<MockRemote>,
    pub store: Arc<MemoryStore>,
    pub hub: MockHub,
    pub channel: RealtimeChannel,
}

impl Fixture {
    pub fn new(data_types: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            data_types: data_types.iter().map(|t| t.to_string()).collect(),
            queue_path: Some(dir.path().join("queue.jsonl")),
            ..EngineConfig::default()
        };
        let hub = MockHub::new();
        let channel = hub.channel();
        Fixture {
            dir,
            config,
            context: SyncContext::empty(),
            remote: Arc::new(MockRemote::new()),
            store: Arc::new(MemoryStore::new()),
            hub,
            channel,
        }
    }

    pub fn connected(data_types: &[&str]) -> Self {
        let fixture = Self::new(data_types);
        fixture.context.set(connected_config());
        fixture
    }

    pub fn engine(&self) -> roam_sync::SyncEngine {
        self.engine_with_store(self.store.clone())
    }

    pub fn engine_with_store(&self, store: Arc<dyn LocalStore>) -> roam_sync::SyncEngine {
        roam_sync::SyncEngine::new(
            self.config.clone(),
            self.context.clone(),
            self.remote.clone(),
            store,
            self.channel.clone(),
        )
        .unwrap()
    }

    pub fn monitor(&self) -> roam_sync::SessionMonitor {
        roam_sync::SessionMonitor::new(
            self.config.clone(),
            self.context.clone(),
            self.remote.clone(),
            self.channel.clone(),
        )
        .unwrap()
    }
}
