//! CLI help surface specs.

use crate::prelude::*;

#[test]
fn top_level_help_lists_every_verb() {
    let sandbox = Sandbox::new();
    let out = sandbox.openwork().args(&["--help"]).passes().stdout();

    for verb in ["start", "serve", "daemon", "workspace", "instance", "approvals", "status"] {
        assert!(out.contains(verb), "help should list {verb}:\n{out}");
    }
}

#[test]
fn workspace_help_lists_subcommands() {
    let sandbox = Sandbox::new();
    let out = sandbox.openwork().args(&["workspace", "--help"]).passes().stdout();

    for sub in ["add", "add-remote", "list", "switch", "info", "path"] {
        assert!(out.contains(sub), "workspace help should list {sub}:\n{out}");
    }
}

#[test]
fn daemon_help_lists_subcommands() {
    let sandbox = Sandbox::new();
    let out = sandbox.openwork().args(&["daemon", "--help"]).passes().stdout();

    for sub in ["run", "start", "stop", "status"] {
        assert!(out.contains(sub), "daemon help should list {sub}:\n{out}");
    }
}

#[test]
fn version_flag_prints_and_exits_zero() {
    let sandbox = Sandbox::new();
    let out = sandbox.openwork().args(&["--version"]).passes().stdout();
    assert!(out.contains("openwork"));
}
