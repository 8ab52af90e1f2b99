//! Configuration error specs: bad input exits 1 with a useful message.

use crate::prelude::*;

#[test]
fn unknown_subcommand_exits_nonzero() {
    let sandbox = Sandbox::new();
    let run = sandbox.openwork().args(&["frobnicate"]).fails();
    assert_eq!(run.code(), 1);
}

#[test]
fn invalid_sandbox_mode_is_a_config_error() {
    let sandbox = Sandbox::new();
    let run = sandbox.openwork().args(&["--sandbox", "podman", "status"]).fails();
    assert_eq!(run.code(), 1);
    assert!(run.stderr().contains("sandbox"), "{}", run.stderr());
}

#[test]
fn invalid_sidecar_source_is_a_config_error() {
    let sandbox = Sandbox::new();
    let run = sandbox.openwork().args(&["--sidecar-source", "sideload", "status"]).fails();
    assert_eq!(run.code(), 1);
    assert!(run.stderr().contains("sidecar"), "{}", run.stderr());
}

#[test]
fn remote_workspace_rejects_non_http_urls() {
    let sandbox = Sandbox::new();
    let run = sandbox
        .openwork()
        .args(&["workspace", "add-remote", "ftp://box:21"])
        .fails();
    assert_eq!(run.code(), 1);
    assert!(run.stderr().contains("http"), "{}", run.stderr());
}

#[test]
fn approvals_reply_requires_exactly_one_decision() {
    let sandbox = Sandbox::new();
    let run = sandbox.openwork().args(&["approvals", "reply", "ap-1"]).fails();
    assert_eq!(run.code(), 1);
    assert!(run.stderr().contains("--approve"), "{}", run.stderr());
}
