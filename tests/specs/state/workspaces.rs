//! Workspace state specs, exercised through the CLI's direct-write path
//! (no daemon).

use crate::prelude::*;

#[test]
fn add_twice_yields_one_entry_with_a_stable_id() {
    let sandbox = Sandbox::new();
    let ws = sandbox.workspace("proj");

    let first =
        sandbox.openwork().args(&["--json", "workspace", "add", ws.to_str().unwrap()]).passes();
    let second =
        sandbox.openwork().args(&["--json", "workspace", "add", ws.to_str().unwrap()]).passes();

    let a: serde_json::Value = serde_json::from_str(&first.stdout()).unwrap();
    let b: serde_json::Value = serde_json::from_str(&second.stdout()).unwrap();
    assert_eq!(a["id"], b["id"], "same path must produce the same id");

    let state = sandbox.state_json();
    assert_eq!(state["workspaces"].as_array().unwrap().len(), 1);
    assert_eq!(state["activeId"], a["id"]);
}

#[test]
fn two_workspaces_first_one_stays_active() {
    let sandbox = Sandbox::new();
    let a = sandbox.workspace("a");
    let b = sandbox.workspace("b");

    sandbox.openwork().args(&["workspace", "add", a.to_str().unwrap()]).passes();
    sandbox.openwork().args(&["workspace", "add", b.to_str().unwrap()]).passes();

    let state = sandbox.state_json();
    let workspaces = state["workspaces"].as_array().unwrap();
    assert_eq!(workspaces.len(), 2);
    assert_ne!(workspaces[0]["id"], workspaces[1]["id"]);
    assert_eq!(state["activeId"], workspaces[0]["id"]);

    let list = sandbox.openwork().args(&["workspace", "list"]).passes().stdout();
    assert!(list.lines().count() >= 2, "{list}");
}

#[test]
fn switch_changes_the_active_workspace() {
    let sandbox = Sandbox::new();
    let a = sandbox.workspace("a");
    let b = sandbox.workspace("b");

    sandbox.openwork().args(&["workspace", "add", a.to_str().unwrap()]).passes();
    let added =
        sandbox.openwork().args(&["--json", "workspace", "add", b.to_str().unwrap()]).passes();
    let b_id = serde_json::from_str::<serde_json::Value>(&added.stdout()).unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    sandbox.openwork().args(&["workspace", "switch", &b_id]).passes();
    assert_eq!(sandbox.state_json()["activeId"], b_id.as_str());
}

#[test]
fn switch_to_unknown_workspace_fails() {
    let sandbox = Sandbox::new();
    let run =
        sandbox.openwork().args(&["workspace", "switch", "ws-ffffffffffffffff"]).fails();
    assert_eq!(run.code(), 1);
    assert!(run.stderr().contains("not found"), "{}", run.stderr());
}

#[test]
fn remote_workspace_round_trips_through_state() {
    let sandbox = Sandbox::new();
    let added = sandbox
        .openwork()
        .args(&[
            "--json",
            "workspace",
            "add-remote",
            "http://box:8100",
            "--directory",
            "proj",
        ])
        .passes();

    let ws: serde_json::Value = serde_json::from_str(&added.stdout()).unwrap();
    assert_eq!(ws["workspaceType"], "remote");
    assert_eq!(ws["baseUrl"], "http://box:8100");

    let info = sandbox
        .openwork()
        .args(&["workspace", "info", ws["id"].as_str().unwrap()])
        .passes()
        .stdout();
    assert!(info.contains("remote"), "{info}");
    assert!(info.contains("http://box:8100"), "{info}");
}

#[test]
fn status_reports_not_running_without_a_daemon() {
    let sandbox = Sandbox::new();
    let out = sandbox.openwork().args(&["status"]).passes().stdout();
    assert!(out.contains("daemon: not running"), "{out}");
    assert!(out.contains("engine: not running"), "{out}");
}

#[test]
fn corrupt_state_file_still_loads() {
    let sandbox = Sandbox::new();
    std::fs::create_dir_all(sandbox.data_dir()).unwrap();
    std::fs::write(sandbox.data_dir().join("state.json"), "{definitely not json").unwrap();

    let out = sandbox.openwork().args(&["status"]).passes().stdout();
    assert!(out.contains("workspaces: 0"), "{out}");
}
