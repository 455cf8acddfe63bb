// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime channel lifecycle against an in-process hub.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use roam_core::protocol::EVENT_SETTINGS_UPDATE;
use roam_core::{InboundMessage, OutboundMessage};
use roam_sync::{
    ChannelConfig, RealtimeChannel, TransportError, STATE_CONNECTED, STATE_DISCONNECTED,
};
use serde_json::json;

const URL: &str = "ws://hub.test/ws";

fn settings_update() -> InboundMessage {
    InboundMessage::SettingsUpdate {
        settings: json!({"theme": "light"}),
        updated_at: ts(10),
        version: Some(3),
    }
}

fn counting_listener(channel: &RealtimeChannel, event: &str) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    channel.on(event, move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    count
}

#[tokio::test]
async fn connect_passes_url_and_token() {
    let hub = MockHub::new();
    let channel = hub.channel();

    channel.connect(URL, TOKEN);

    assert!(wait_until(|| channel.is_connected()).await);
    assert_eq!(hub.last_url().as_deref(), Some(URL));
    assert_eq!(hub.last_token().as_deref(), Some(TOKEN));
    assert_eq!(channel.state(), STATE_CONNECTED);
    channel.disconnect();
}

#[tokio::test]
async fn connect_is_idempotent() {
    let hub = MockHub::new();
    let channel = hub.channel();

    channel.connect(URL, TOKEN);
    channel.connect(URL, TOKEN);
    assert!(wait_until(|| channel.is_connected()).await);
    channel.connect(URL, TOKEN);
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(hub.connects(), 1);
    channel.disconnect();
}

#[tokio::test]
async fn reconnects_after_connection_loss() {
    let hub = MockHub::new();
    let channel = hub.channel();
    channel.connect(URL, TOKEN);
    assert!(wait_until(|| hub.connects() == 1).await);

    assert!(hub.drop_connection());

    assert!(wait_until(|| hub.connects() == 2).await);
    assert!(wait_until(|| channel.is_connected()).await);
    channel.disconnect();
}

#[tokio::test]
async fn retries_failed_connects_with_backoff() {
    let hub = MockHub::new();
    hub.fail_next_connects(3);
    let channel = hub.channel();

    channel.connect(URL, TOKEN);

    assert!(wait_until(|| channel.is_connected()).await);
    assert_eq!(hub.connects(), 1);
    channel.disconnect();
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let hub = MockHub::new();
    hub.fail_next_connects(2);
    let config = ChannelConfig {
        max_retries: 2,
        max_delay_secs: 1,
        initial_delay_ms: 5,
    };
    let channel = RealtimeChannel::new(config, hub.factory());

    channel.connect(URL, TOKEN);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(channel.state(), STATE_DISCONNECTED);
    assert_eq!(hub.connects(), 0);

    // A finished task does not block a fresh connect.
    channel.connect(URL, TOKEN);
    assert!(wait_until(|| channel.is_connected()).await);
    channel.disconnect();
}

#[tokio::test]
async fn inbound_events_reach_listeners() {
    let hub = MockHub::new();
    let channel = hub.channel();
    let count = counting_listener(&channel, EVENT_SETTINGS_UPDATE);
    let other = counting_listener(&channel, "session:expired");
    channel.connect(URL, TOKEN);
    assert!(wait_until(|| hub.has_peer()).await);

    hub.push(settings_update());
    hub.push(settings_update());

    assert!(wait_until(|| count.load(Ordering::SeqCst) == 2).await);
    assert_eq!(other.load(Ordering::SeqCst), 0);
    channel.disconnect();
}

#[tokio::test]
async fn nothing_is_delivered_after_disconnect() {
    let hub = MockHub::new();
    let channel = hub.channel();
    let count = counting_listener(&channel, EVENT_SETTINGS_UPDATE);
    channel.connect(URL, TOKEN);
    assert!(wait_until(|| hub.has_peer()).await);

    assert!(channel.disconnect());
    hub.push(settings_update());
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(channel.state(), STATE_DISCONNECTED);
    assert!(wait_until(|| hub.disconnects() == 1).await);
}

#[tokio::test]
async fn disconnect_without_connection_is_harmless() {
    let hub = MockHub::new();
    let channel = hub.channel();

    assert!(!channel.disconnect());
    assert_eq!(channel.state(), STATE_DISCONNECTED);
}

#[tokio::test]
async fn send_requires_open_connection() {
    let hub = MockHub::new();
    let channel = hub.channel();
    let msg = OutboundMessage::settings(json!({"theme": "dark"}), 4);

    assert!(matches!(channel.send(msg.clone()), Err(TransportError::ConnectionClosed)));

    channel.connect(URL, TOKEN);
    assert!(wait_until(|| channel.is_connected()).await);
    channel.send(msg.clone()).unwrap();

    assert!(wait_until(|| hub.sent() == vec![msg.clone()]).await);
    channel.disconnect();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disconnect_waits_for_running_listener() {
    let hub = MockHub::new();
    let channel = hub.channel();
    let entered = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));
    let (entered_in, finished_in) = (Arc::clone(&entered), Arc::clone(&finished));
    channel.on(EVENT_SETTINGS_UPDATE, move |_| {
        entered_in.store(true, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(100));
        finished_in.store(true, Ordering::SeqCst);
    });

    channel.connect(URL, TOKEN);
    assert!(wait_until(|| hub.has_peer()).await);
    assert!(hub.push(settings_update()));
    assert!(wait_until(|| entered.load(Ordering::SeqCst)).await);

    assert!(channel.disconnect());
    assert!(finished.load(Ordering::SeqCst));
}
