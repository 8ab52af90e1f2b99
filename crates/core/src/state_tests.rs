// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use super::*;

fn ws(path: &str) -> Workspace {
    Workspace::local(Path::new(path), None)
}

#[test]
fn first_workspace_becomes_active() {
    let mut state = PersistedState::default();
    let id = state.upsert_workspace(ws("/tmp/a"));
    assert_eq!(state.active_id.as_deref(), Some(id.as_str()));
}

#[test]
fn second_workspace_does_not_steal_active() {
    let mut state = PersistedState::default();
    let first = state.upsert_workspace(ws("/tmp/a"));
    state.upsert_workspace(ws("/tmp/b"));
    assert_eq!(state.active_id.as_deref(), Some(first.as_str()));
    assert_eq!(state.workspaces.len(), 2);
}

#[test]
fn upsert_same_path_is_idempotent() {
    let mut state = PersistedState::default();
    let a = state.upsert_workspace(ws("/tmp/a"));
    let created = state.workspaces[0].created_at;
    let b = state.upsert_workspace(ws("/tmp/a"));
    assert_eq!(a, b);
    assert_eq!(state.workspaces.len(), 1);
    // created_at survives the merge; only name/last_used_at move.
    assert_eq!(state.workspaces[0].created_at, created);
}

#[test]
fn activate_unknown_id_is_rejected() {
    let mut state = PersistedState::default();
    state.upsert_workspace(ws("/tmp/a"));
    assert!(!state.activate("ws-ffffffffffffffff"));
}

#[test]
fn activate_switches_and_touches() {
    let mut state = PersistedState::default();
    state.upsert_workspace(ws("/tmp/a"));
    let b = state.upsert_workspace(ws("/tmp/b"));
    let before = state.workspace(&b).unwrap().last_used_at;
    assert!(state.activate(&b));
    assert_eq!(state.active_id.as_deref(), Some(b.as_str()));
    assert!(state.workspace(&b).unwrap().last_used_at >= before);
}

#[test]
fn empty_document_loads_as_zero_state() {
    let state: PersistedState = serde_json::from_str("{}").unwrap();
    assert_eq!(state.version, 0);
    assert!(state.workspaces.is_empty());
    assert!(state.daemon.is_none());
    assert!(state.active_id.is_none());
}

#[test]
fn document_round_trips() {
    let mut state = PersistedState::default();
    state.upsert_workspace(ws("/tmp/a"));
    state.daemon = Some(ServiceRecord {
        pid: 4242,
        port: 7483,
        base_url: "http://127.0.0.1:7483".to_string(),
        started_at: Utc::now(),
    });
    let json = serde_json::to_string_pretty(&state).unwrap();
    assert!(json.contains("\"activeId\""));
    assert!(json.contains("\"baseUrl\""));
    let back: PersistedState = serde_json::from_str(&json).unwrap();
    assert_eq!(state, back);
}
