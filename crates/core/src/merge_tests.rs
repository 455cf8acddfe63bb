// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::TimeZone;
use serde_json::json;
use yare::parameterized;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn map(value: Value) -> DataMap {
    match value {
        Value::Object(m) => m,
        _ => DataMap::new(),
    }
}

#[test]
fn remote_wins_overlays_remote_fields() {
    let local = json!({"theme": "light", "lang": "en"});
    let remote = json!({"theme": "dark", "font": 14});

    let res = resolve_settings(&local, &remote, at(100), MergeStrategy::RemoteWins, Some(at(500)));

    assert_eq!(res.merged, json!({"theme": "dark", "lang": "en", "font": 14}));
    assert_eq!(res.local_update, Some(at(100)));
    assert!(res.remote_applied);
}

#[test]
fn local_wins_keeps_local_and_time() {
    let local = json!({"theme": "light"});
    let remote = json!({"theme": "dark"});

    let res = resolve_settings(&local, &remote, at(900), MergeStrategy::LocalWins, Some(at(100)));

    assert_eq!(res.merged, local);
    assert_eq!(res.local_update, Some(at(100)));
    assert!(!res.remote_applied);
}

#[parameterized(
    remote_strictly_newer = { 200, Some(100), true },
    remote_equal = { 100, Some(100), false },
    remote_older = { 50, Some(100), false },
    never_updated_locally = { 1, None, true },
)]
fn newer_wins_matches_remote_wins_iff_strictly_newer(
    remote_secs: i64,
    local_secs: Option<i64>,
    remote_wins: bool,
) {
    let local = json!({"a": 1, "nested": {"x": 1}});
    let remote = json!({"b": 2, "nested": {"y": 2}});
    let last_local = local_secs.map(at);
    let remote_at = at(remote_secs);
    let resolve = |strategy| resolve_settings(&local, &remote, remote_at, strategy, last_local);

    let newer = resolve(MergeStrategy::NewerWins);
    let expected = if remote_wins {
        resolve(MergeStrategy::RemoteWins)
    } else {
        resolve(MergeStrategy::LocalWins)
    };

    assert_eq!(newer, expected);
    if !remote_wins {
        assert_eq!(newer.merged, local);
    }
}

#[test]
fn merge_is_shallow() {
    let local = json!({"editor": {"font": "mono", "size": 12}});
    let remote = json!({"editor": {"size": 14}});

    let res = resolve_settings(&local, &remote, at(10), MergeStrategy::RemoteWins, None);

    // Nested object replaced wholesale, "font" is gone.
    assert_eq!(res.merged, json!({"editor": {"size": 14}}));
}

#[parameterized(
    null_local = { json!(null), json!({"a": 1}), json!({"a": 1}) },
    array_local = { json!([1, 2]), json!({"a": 1}), json!({"a": 1}) },
    null_remote = { json!({"a": 1}), json!(null), json!({"a": 1}) },
    both_empty = { json!({}), json!({}), json!({}) },
)]
fn shallow_merge_non_objects(local: Value, remote: Value, expected: Value) {
    assert_eq!(shallow_merge(&local, &remote), expected);
}

#[test]
fn data_merge_is_remote_overwrite_by_key() {
    let local = map(json!({"a": 1, "b": 2}));
    let remote = map(json!({"b": 3, "c": 4}));

    assert_eq!(Value::Object(merge_data(&local, &remote)), json!({"a": 1, "b": 3, "c": 4}));
}

#[test]
fn data_merge_with_empty_sides() {
    let some = map(json!({"a": 1}));
    let empty = DataMap::new();

    assert_eq!(merge_data(&some, &empty), some);
    assert_eq!(merge_data(&empty, &some), some);
}

#[parameterized(
    remote_wins = { "remote-wins", MergeStrategy::RemoteWins },
    local_wins = { "local-wins", MergeStrategy::LocalWins },
    newer_wins = { "newer-wins", MergeStrategy::NewerWins },
)]
fn strategy_parses(s: &str, expected: MergeStrategy) {
    assert_eq!(s.parse::<MergeStrategy>().unwrap(), expected);
    assert_eq!(expected.to_string(), s);
}

#[test]
fn strategy_defaults_to_newer_wins() {
    assert_eq!(MergeStrategy::default(), MergeStrategy::NewerWins);
}

#[test]
fn strategy_rejects_unknown() {
    assert!(matches!("oldest-wins".parse::<MergeStrategy>(), Err(Error::InvalidStrategy(_))));
}

#[test]
fn strategy_serde_uses_kebab_case() {
    assert_eq!(serde_json::to_value(MergeStrategy::RemoteWins).unwrap(), json!("remote-wins"));
    let parsed: MergeStrategy = serde_json::from_value(json!("local-wins")).unwrap();
    assert_eq!(parsed, MergeStrategy::LocalWins);
}
