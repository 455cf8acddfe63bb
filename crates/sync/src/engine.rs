// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync orchestrator.
//!
//! A single task owns all engine state and reacts to typed events:
//!
//! ```text
//!   SyncContext (watch) ──► reconcile ──► Idle ⇄ Active
//!   pull timer tick     ──► perform_sync
//!   channel listeners   ──► push queue ──► apply_push
//!   EngineHandle        ──► commands (sync now, push, preferences, shutdown)
//! ```
//!
//! Active means: realtime channel connected, listeners registered, pull
//! timer armed. Every remote call re-checks the access token first, so a
//! cleared context stops work mid-cycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use roam_core::protocol::{EVENT_DATA_UPDATE, EVENT_SETTINGS_UPDATE};
use roam_core::{
    merge_data, resolve_settings, Clock, DataMap, InboundMessage, OperationKind, OutboundMessage,
    PendingUpdates, QueuedOperation, SyncConfig, SyncPreferences, SyncStatus, SystemClock,
    UploadAck,
};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::channel::{ListenerId, RealtimeChannel};
use crate::config::EngineConfig;
use crate::context::SyncContext;
use crate::error::{Error, FailureKind, Result};
use crate::events::{EngineState, EventBus, SyncEvent};
use crate::queue::OfflineQueue;
use crate::remote::RemoteClient;
use crate::store::LocalStore;

const COMMAND_BUFFER: usize = 32;

/// What one sync cycle or push did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// No access token; nothing was attempted.
    pub skipped: bool,
    /// Set when the cycle stopped before finishing.
    pub aborted: Option<FailureKind>,
    pub settings_pulled: bool,
    pub data_pulled: Vec<String>,
    pub settings_pushed: bool,
    pub data_pushed: Vec<String>,
    /// Uploads that failed and were queued.
    pub enqueued: usize,
    /// Queued operations replayed and removed.
    pub replayed: usize,
    /// Queued operations left after replay.
    pub queue_remaining: usize,
}

enum EngineCommand {
    SyncNow(oneshot::Sender<SyncReport>),
    PushSettings(Value, oneshot::Sender<SyncReport>),
    PushData {
        data_type: String,
        data: DataMap,
        reply: oneshot::Sender<SyncReport>,
    },
    UpdatePreferences(SyncPreferences, oneshot::Sender<Result<()>>),
    Shutdown,
}

/// Outcome of replaying one queued operation.
enum Replayed {
    Settings(UploadAck),
    Data,
    Dropped,
}

/// The sync orchestrator. Drive it with [`SyncEngine::spawn`], or call its
/// methods directly from a single task.
pub struct SyncEngine {
    config: EngineConfig,
    context: SyncContext,
    remote: Arc<dyn RemoteClient>,
    store: Arc<dyn LocalStore>,
    channel: RealtimeChannel,
    queue: OfflineQueue,
    events: EventBus,
    clock: Arc<dyn Clock>,
    state: EngineState,
    /// Latest settings version known to this client.
    last_version: u64,
    /// When local settings last changed, for newer-wins.
    last_local_update: Option<DateTime<Utc>>,
    /// (channel url, token) the channel was opened with.
    endpoint: Option<(String, String)>,
    pull_timer: Option<Interval>,
    push_tx: mpsc::UnboundedSender<InboundMessage>,
    push_rx: mpsc::UnboundedReceiver<InboundMessage>,
    listeners: Vec<(&'static str, ListenerId)>,
}

impl SyncEngine {
    /// Creates an idle engine and opens its offline queue.
    pub fn new(
        config: EngineConfig,
        context: SyncContext,
        remote: Arc<dyn RemoteClient>,
        store: Arc<dyn LocalStore>,
        channel: RealtimeChannel,
    ) -> Result<Self> {
        config.validate()?;
        let queue = OfflineQueue::open(&config.resolve_queue_path()?)?;
        let (push_tx, push_rx) = mpsc::unbounded_channel();

        Ok(SyncEngine {
            config,
            context,
            remote,
            store,
            channel,
            queue,
            events: EventBus::new(),
            clock: Arc::new(SystemClock),
            state: EngineState::Idle,
            last_version: 0,
            last_local_update: None,
            endpoint: None,
            pull_timer: None,
            push_tx,
            push_rx,
            listeners: Vec::new(),
        })
    }

    /// Uses `clock` for local-update instants and queue stamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.queue.set_clock(Arc::clone(&clock));
        self.clock = clock;
        self
    }

    /// Publishes events on `events` instead of a private bus.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Bus the engine publishes [`SyncEvent`]s on.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Whether the engine is idle or active.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Latest settings version known to this client.
    pub fn last_version(&self) -> u64 {
        self.last_version
    }

    /// When local settings last changed, or `None` if they never have.
    pub fn last_local_update(&self) -> Option<DateTime<Utc>> {
        self.last_local_update
    }

    /// Operations waiting in the offline queue.
    pub fn pending_operations(&self) -> Result<Vec<QueuedOperation>> {
        Ok(self.queue.peek_all()?)
    }

    /// Starts the control loop on the current runtime.
    pub fn spawn(self) -> (EngineHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = EngineHandle {
            tx,
            events: self.events.clone(),
        };
        let task = tokio::spawn(self.run(rx));
        (handle, task)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<EngineCommand>) {
        let mut config_rx = self.context.subscribe();
        self.reconcile();

        loop {
            tokio::select! {
                biased;
                cmd = commands.recv() => match cmd {
                    Some(EngineCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd).await,
                },
                changed = config_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    config_rx.borrow_and_update();
                    self.reconcile();
                }
                Some(msg) = self.push_rx.recv() => self.apply_push(msg).await,
                _ = next_tick(&mut self.pull_timer) => {
                    self.perform_sync().await;
                }
            }
        }

        self.deactivate();
        info!("sync engine stopped");
    }

    async fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::SyncNow(reply) => {
                let report = self.perform_sync().await;
                let _ = reply.send(report);
            }
            EngineCommand::PushSettings(settings, reply) => {
                let report = self.push_settings(settings).await;
                let _ = reply.send(report);
            }
            EngineCommand::PushData { data_type, data, reply } => {
                let report = self.push_data(&data_type, data).await;
                let _ = reply.send(report);
            }
            EngineCommand::UpdatePreferences(preferences, reply) => {
                let _ = reply.send(self.update_preferences(preferences).await);
            }
            EngineCommand::Shutdown => {}
        }
    }

    /// Brings Idle/Active in line with the current configuration.
    pub fn reconcile(&mut self) {
        match self.context.current().filter(SyncConfig::is_connected) {
            Some(config) => self.activate(&config),
            None => self.deactivate(),
        }
    }

    fn activate(&mut self, config: &SyncConfig) {
        let token = config.access_token.clone().unwrap_or_default();
        let url = self.config.realtime_url(&config.api_base);
        let endpoint = (url, token);

        if self.state == EngineState::Active {
            if self.endpoint.as_ref() != Some(&endpoint) {
                info!(url = %endpoint.0, "credentials changed, reopening realtime channel");
                self.channel.disconnect();
                self.channel.connect(&endpoint.0, &endpoint.1);
                self.endpoint = Some(endpoint);
            }
            return;
        }

        self.channel.connect(&endpoint.0, &endpoint.1);
        for event in [EVENT_SETTINGS_UPDATE, EVENT_DATA_UPDATE] {
            let tx = self.push_tx.clone();
            let id = self.channel.on(event, move |msg| {
                let _ = tx.send(msg.clone());
            });
            self.listeners.push((event, id));
        }

        // First tick fires immediately: the initial sync.
        let mut timer = tokio::time::interval(self.config.sync_interval());
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.pull_timer = Some(timer);

        info!(url = %endpoint.0, "sync engine active");
        self.endpoint = Some(endpoint);
        self.set_state(EngineState::Active);
    }

    fn deactivate(&mut self) {
        if self.state == EngineState::Idle {
            return;
        }

        self.pull_timer = None;
        for (event, id) in self.listeners.drain(..) {
            self.channel.off(event, id);
        }
        self.channel.disconnect();
        while self.push_rx.try_recv().is_ok() {}
        self.endpoint = None;

        info!("sync engine idle");
        self.set_state(EngineState::Idle);
    }

    fn set_state(&mut self, state: EngineState) {
        self.state = state;
        self.events.emit(SyncEvent::StateChanged(state));
    }

    /// Runs one pull cycle: check, download, upload, replay the queue.
    ///
    /// A failed download or upload does not stop the others. Failing to
    /// read the sync status or the update check aborts the cycle.
    pub async fn perform_sync(&mut self) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.context.is_connected() {
            debug!("sync skipped: not connected");
            report.skipped = true;
            return report;
        }

        match self.run_cycle(&mut report).await {
            Ok(()) => debug!(?report, "sync cycle finished"),
            Err(e) => {
                warn!(error = %e, "sync cycle aborted");
                report.aborted = Some(e.kind());
            }
        }
        self.events.emit(SyncEvent::SyncCompleted(report.clone()));
        report
    }

    async fn run_cycle(&mut self, report: &mut SyncReport) -> Result<()> {
        require_token(&self.context)?;
        let status = self.remote.sync_status().await?;
        let data_types = self.active_data_types(&status);

        require_token(&self.context)?;
        let check = self
            .remote
            .check_updates(self.last_version, data_types.as_deref())
            .await?;
        if check.has_updates {
            let pulled = data_types.as_deref().unwrap_or_default();
            self.pull_updates(&status, &check.updates, pulled, report).await;
        }

        if status.settings_enabled() {
            self.push_local_settings(report).await;
        }
        for data_type in data_types.iter().flatten() {
            self.push_local_data(data_type, report).await;
        }

        self.drain_queue(Some(status), report).await;
        Ok(())
    }

    fn active_data_types(&self, status: &SyncStatus) -> Option<Vec<String>> {
        let enabled = status.data_enabled() && !self.config.data_types.is_empty();
        enabled.then(|| self.config.data_types.clone())
    }

    async fn pull_updates(
        &mut self,
        status: &SyncStatus,
        updates: &PendingUpdates,
        data_types: &[String],
        report: &mut SyncReport,
    ) {
        if updates.settings && status.settings_enabled() {
            match self.pull_settings().await {
                Ok(()) => report.settings_pulled = true,
                Err(e) => warn!(error = %e, "settings download failed"),
            }
        }
        for data_type in data_types.iter().filter(|t| updates.data_changed(t)) {
            match self.pull_data(data_type).await {
                Ok(()) => report.data_pulled.push(data_type.clone()),
                Err(e) => warn!(%data_type, error = %e, "data download failed"),
            }
        }
    }

    async fn pull_settings(&mut self) -> Result<()> {
        require_token(&self.context)?;
        let remote = self.remote.download_settings().await?;
        self.apply_remote_settings(remote.settings, remote.updated_at, Some(remote.version))
            .await
    }

    async fn pull_data(&mut self, data_type: &str) -> Result<()> {
        require_token(&self.context)?;
        let remote = self.remote.download_data(data_type).await?;
        self.apply_remote_data(data_type, remote).await
    }

    /// Resolves remote settings against local ones, saves and notifies.
    async fn apply_remote_settings(
        &mut self,
        settings: Value,
        updated_at: DateTime<Utc>,
        version: Option<u64>,
    ) -> Result<()> {
        let local = self.store.local_settings().await?;
        let resolution = resolve_settings(
            &local,
            &settings,
            updated_at,
            self.config.merge_strategy,
            self.last_local_update,
        );

        self.store.save_local_settings(&resolution.merged).await?;
        self.last_local_update = resolution.local_update;
        if let Some(version) = version {
            self.advance_version(version);
        }

        debug!(
            strategy = %self.config.merge_strategy,
            remote_applied = resolution.remote_applied,
            "remote settings resolved"
        );
        self.events.emit(SyncEvent::SettingsUpdated(resolution.merged));
        Ok(())
    }

    async fn apply_remote_data(&mut self, data_type: &str, remote: DataMap) -> Result<()> {
        let local = self.store.local_data(data_type).await?;
        let merged = merge_data(&local, &remote);
        self.store.save_local_data(data_type, &merged).await?;

        debug!(%data_type, entries = merged.len(), "remote data merged");
        self.events.emit(SyncEvent::DataUpdated {
            data_type: data_type.to_string(),
            data: merged,
        });
        Ok(())
    }

    async fn apply_push(&mut self, msg: InboundMessage) {
        if self.state != EngineState::Active || !self.context.is_connected() {
            debug!(event = msg.event_name(), "realtime push ignored while idle");
            return;
        }

        let result = match msg {
            InboundMessage::SettingsUpdate { settings, updated_at, version } => {
                self.apply_remote_settings(settings, updated_at, version).await
            }
            InboundMessage::DataUpdate { data_type, data } => {
                self.apply_remote_data(&data_type, data).await
            }
            other => {
                debug!(event = other.event_name(), "realtime event not handled by engine");
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to apply realtime update");
        }
    }

    async fn push_local_settings(&mut self, report: &mut SyncReport) {
        match self.store.local_settings().await {
            Ok(Value::Null) => debug!("no local settings to upload"),
            Ok(settings) => self.upload_settings_or_enqueue(settings, report).await,
            Err(e) => warn!(error = %e, "cannot read local settings"),
        }
    }

    async fn push_local_data(&mut self, data_type: &str, report: &mut SyncReport) {
        match self.store.local_data(data_type).await {
            Ok(data) if data.is_empty() => debug!(%data_type, "no local data to upload"),
            Ok(data) => self.upload_data_or_enqueue(data_type, data, report).await,
            Err(e) => warn!(%data_type, error = %e, "cannot read local data"),
        }
    }

    fn uploader(&self) -> Uploader<'_> {
        Uploader {
            remote: self.remote.as_ref(),
            channel: &self.channel,
            context: &self.context,
        }
    }

    async fn upload_settings_or_enqueue(&mut self, settings: Value, report: &mut SyncReport) {
        let result = self.uploader().settings(&settings).await;
        match result {
            Ok(ack) => {
                self.record_upload(ack);
                report.settings_pushed = true;
            }
            Err(e) => {
                warn!(error = %e, "settings upload failed, queueing");
                self.enqueue(OperationKind::Settings, settings, None, report);
            }
        }
    }

    async fn upload_data_or_enqueue(
        &mut self,
        data_type: &str,
        data: DataMap,
        report: &mut SyncReport,
    ) {
        let result = self.uploader().data(data_type, &data).await;
        match result {
            Ok(()) => report.data_pushed.push(data_type.to_string()),
            Err(e) => {
                warn!(%data_type, error = %e, "data upload failed, queueing");
                self.enqueue_data(data_type, data, report);
            }
        }
    }

    fn enqueue_data(&mut self, data_type: &str, data: DataMap, report: &mut SyncReport) {
        let data_type = Some(data_type.to_string());
        self.enqueue(OperationKind::Data, Value::Object(data), data_type, report);
    }

    fn enqueue(
        &mut self,
        kind: OperationKind,
        data: Value,
        data_type: Option<String>,
        report: &mut SyncReport,
    ) {
        match self.queue.enqueue(kind, data, data_type) {
            Ok(_) => report.enqueued += 1,
            Err(e) => error!(%kind, error = %e, "failed to queue operation; it is lost"),
        }
    }

    fn record_upload(&mut self, ack: UploadAck) {
        self.advance_version(ack.version);
        self.last_local_update = Some(self.clock.now());
    }

    fn advance_version(&mut self, version: u64) {
        if version > self.last_version {
            self.last_version = version;
        }
    }

    /// Uploads `settings` now, or queues them if that is not possible.
    ///
    /// Skipped when the remote reports settings sync disabled.
    pub async fn push_settings(&mut self, settings: Value) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.context.is_connected() {
            debug!("not connected, queueing settings upload");
            self.enqueue(OperationKind::Settings, settings, None, &mut report);
            return report;
        }

        match self.remote.sync_status().await {
            Ok(status) if status.settings_enabled() => {
                self.upload_settings_or_enqueue(settings, &mut report).await
            }
            Ok(_) => debug!("settings sync disabled, upload skipped"),
            Err(e) => {
                warn!(error = %e, "sync status unavailable, queueing settings upload");
                self.enqueue(OperationKind::Settings, settings, None, &mut report);
            }
        }
        report
    }

    /// Uploads one collection now, or queues it if that is not possible.
    ///
    /// Skipped when the remote reports data sync disabled.
    pub async fn push_data(&mut self, data_type: &str, data: DataMap) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.context.is_connected() {
            debug!(%data_type, "not connected, queueing data upload");
            self.enqueue_data(data_type, data, &mut report);
            return report;
        }

        match self.remote.sync_status().await {
            Ok(status) if status.data_enabled() => {
                self.upload_data_or_enqueue(data_type, data, &mut report).await
            }
            Ok(_) => debug!(%data_type, "data sync disabled, upload skipped"),
            Err(e) => {
                warn!(%data_type, error = %e, "sync status unavailable, queueing data upload");
                self.enqueue_data(data_type, data, &mut report);
            }
        }
        report
    }

    /// Replays the offline queue if connected.
    pub async fn process_offline_queue(&mut self) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.context.is_connected() {
            report.skipped = true;
            return report;
        }
        self.drain_queue(None, &mut report).await;
        report
    }

    async fn drain_queue(&mut self, status: Option<SyncStatus>, report: &mut SyncReport) {
        match self.queue.is_empty() {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => {
                error!(error = %e, "offline queue unreadable");
                return;
            }
        }

        let status = match status {
            Some(status) => status,
            None => match self.remote.sync_status().await {
                Ok(status) => status,
                Err(e) => {
                    warn!(error = %e, "sync status unavailable, replay postponed");
                    report.queue_remaining = self.queue.len().unwrap_or_default();
                    return;
                }
            },
        };

        let uploader = Uploader {
            remote: self.remote.as_ref(),
            channel: &self.channel,
            context: &self.context,
        };
        let result = self
            .queue
            .process_queue(|op| replay(&uploader, status, op))
            .await;

        match result {
            Ok(drain) => {
                for outcome in &drain.outputs {
                    if let Replayed::Settings(ack) = outcome {
                        self.record_upload(*ack);
                    }
                }
                report.replayed += drain.processed();
                report.queue_remaining = drain.remaining;
            }
            Err(e) => error!(error = %e, "offline queue replay failed"),
        }
    }

    /// Sends sync preferences to the remote.
    pub async fn update_preferences(&mut self, preferences: SyncPreferences) -> Result<()> {
        require_token(&self.context)?;
        self.remote.update_sync_preferences(preferences).await?;
        info!(
            sync_settings = preferences.sync_settings,
            sync_data = preferences.sync_data,
            "sync preferences updated"
        );
        Ok(())
    }
}

fn require_token(context: &SyncContext) -> Result<()> {
    if context.is_connected() {
        Ok(())
    } else {
        Err(Error::NotConnected)
    }
}

/// Sends `msg` on the channel if it is connected.
fn announce(channel: &RealtimeChannel, msg: OutboundMessage) {
    if let Err(e) = channel.send(msg) {
        debug!(error = %e, "realtime broadcast skipped");
    }
}

/// Upload path shared by direct pushes and queue replay.
///
/// Each upload re-checks the token and is announced on the channel once
/// the remote accepts it.
struct Uploader<'a> {
    remote: &'a dyn RemoteClient,
    channel: &'a RealtimeChannel,
    context: &'a SyncContext,
}

impl Uploader<'_> {
    async fn settings(&self, settings: &Value) -> Result<UploadAck> {
        require_token(self.context)?;
        let ack = self.remote.upload_settings(settings).await?;
        let msg = OutboundMessage::settings(settings.clone(), ack.version);
        announce(self.channel, msg);
        Ok(ack)
    }

    async fn data(&self, data_type: &str, data: &DataMap) -> Result<()> {
        require_token(self.context)?;
        self.remote.upload_data(data_type, data).await?;
        let msg = OutboundMessage::data(data_type, data.clone());
        announce(self.channel, msg);
        Ok(())
    }
}

/// Replays one queued operation through the regular upload path.
///
/// Operations for a disabled feature, or malformed ones, are dropped.
async fn replay(
    uploader: &Uploader<'_>,
    status: SyncStatus,
    op: QueuedOperation,
) -> Result<Replayed> {
    match op.kind {
        OperationKind::Settings => {
            if !status.settings_enabled() {
                debug!("settings sync disabled, dropping queued upload");
                return Ok(Replayed::Dropped);
            }
            let ack = uploader.settings(&op.data).await?;
            Ok(Replayed::Settings(ack))
        }
        OperationKind::Data => {
            let (Some(data_type), Value::Object(data)) = (op.data_type.as_deref(), &op.data) else {
                warn!("dropping malformed queued data upload");
                return Ok(Replayed::Dropped);
            };
            if !status.data_enabled() {
                debug!(%data_type, "data sync disabled, dropping queued upload");
                return Ok(Replayed::Dropped);
            }
            uploader.data(data_type, data).await?;
            Ok(Replayed::Data)
        }
    }
}

pub(crate) async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Cloneable handle to a spawned [`SyncEngine`].
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
    events: EventBus,
}

impl EngineHandle {
    /// Runs a pull cycle now and returns its report.
    pub async fn sync_now(&self) -> Result<SyncReport> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::SyncNow(reply)).await?;
        rx.await.map_err(|_| Error::EngineStopped)
    }

    /// Uploads settings, queueing them on failure.
    pub async fn push_settings(&self, settings: Value) -> Result<SyncReport> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::PushSettings(settings, reply)).await?;
        rx.await.map_err(|_| Error::EngineStopped)
    }

    /// Uploads one collection, queueing it on failure.
    pub async fn push_data(
        &self,
        data_type: impl Into<String>,
        data: DataMap,
    ) -> Result<SyncReport> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::PushData {
            data_type: data_type.into(),
            data,
            reply,
        })
        .await?;
        rx.await.map_err(|_| Error::EngineStopped)
    }

    /// Updates the account's sync feature flags.
    ///
    /// Data sync is forced off when settings sync is off.
    pub async fn update_preferences(&self, sync_settings: bool, sync_data: bool) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        let preferences = SyncPreferences::new(sync_settings, sync_data);
        self.send(EngineCommand::UpdatePreferences(preferences, reply)).await?;
        rx.await.map_err(|_| Error::EngineStopped)?
    }

    /// Asks the engine to go idle and exit.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(EngineCommand::Shutdown).await;
    }

    /// Receives the engine's events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Returns true once the engine task has exited.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, cmd: EngineCommand) -> Result<()> {
        self.tx.send(cmd).await.map_err(|_| Error::EngineStopped)
    }
}
