//! Environment precedence specs.

use crate::prelude::*;

#[test]
fn legacy_env_var_warns_once_and_still_works() {
    let sandbox = Sandbox::new();
    let run = sandbox
        .openwork()
        .env("OPENCODE_STUDIO_VERBOSE", "1")
        .args(&["status"])
        .passes();

    let stderr = run.stderr();
    let warnings = stderr.matches("OPENCODE_STUDIO_VERBOSE is deprecated").count();
    assert_eq!(warnings, 1, "exactly one deprecation warning:\n{stderr}");
    assert!(stderr.contains("OPENWORK_VERBOSE"), "warning should name the new key:\n{stderr}");
}

#[test]
fn new_prefix_does_not_warn() {
    let sandbox = Sandbox::new();
    let run = sandbox.openwork().env("OPENWORK_VERBOSE", "1").args(&["status"]).passes();
    assert!(!run.stderr().contains("deprecated"), "{}", run.stderr());
}

#[test]
fn unknown_env_keys_are_ignored() {
    let sandbox = Sandbox::new();
    sandbox
        .openwork()
        .env("OPENWORK_TOTALLY_UNKNOWN_KNOB", "whatever")
        .args(&["status"])
        .passes();
}

#[test]
fn data_dir_env_controls_state_location() {
    let sandbox = Sandbox::new();
    sandbox
        .openwork()
        .args(&["workspace", "add"])
        .args(&[sandbox.workspace("proj").to_str().unwrap()])
        .passes();

    assert!(
        sandbox.data_dir().join("state.json").exists(),
        "state must land under OPENWORK_DATA_DIR"
    );
}
