// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use super::*;

#[test]
fn local_workspace_names_after_directory() {
    let ws = Workspace::local(Path::new("/tmp/projects/alpha"), None);
    assert_eq!(ws.name, "alpha");
    assert!(ws.is_local());
    assert_eq!(ws.base_url, None);
}

#[test]
fn explicit_name_wins() {
    let ws = Workspace::local(Path::new("/tmp/projects/alpha"), Some("custom".to_string()));
    assert_eq!(ws.name, "custom");
}

#[test]
fn same_path_same_id() {
    let a = Workspace::local(Path::new("/tmp/ws"), None);
    let b = Workspace::local(Path::new("/tmp/ws"), Some("other".to_string()));
    assert_eq!(a.id, b.id);
}

#[test]
fn remote_workspace_carries_url_and_directory() {
    let ws = Workspace::remote("http://box:8100", Some("proj".to_string()), None);
    assert_eq!(ws.workspace_type, WorkspaceType::Remote);
    assert_eq!(ws.base_url.as_deref(), Some("http://box:8100"));
    assert_eq!(ws.directory.as_deref(), Some("proj"));
    assert_eq!(ws.name, "http://box:8100 (proj)");
}

#[test]
fn workspace_round_trips_through_json() {
    let ws = Workspace::local(Path::new("/tmp/ws"), None);
    let json = serde_json::to_string(&ws).unwrap();
    assert!(json.contains("\"workspaceType\":\"local\""));
    assert!(json.contains("\"lastUsedAt\""));
    let back: Workspace = serde_json::from_str(&json).unwrap();
    assert_eq!(ws, back);
}
