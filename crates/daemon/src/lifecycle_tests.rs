// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use openwork_resolver::{ResolverConfig, SourcePreference};

use super::*;

fn cfg(dir: &Path) -> DaemonConfig {
    DaemonConfig {
        data_dir: dir.to_path_buf(),
        host: "127.0.0.1".to_string(),
        port: 0,
        engine_host: "127.0.0.1".to_string(),
        engine_port: 0,
        engine_cors: vec![],
        engine_auth: None,
        resolver: ResolverConfig {
            source: SourcePreference::Auto,
            allow_external: false,
            cache_dir: dir.join("sidecars"),
            base_url: "https://releases.invalid".to_string(),
            manifest_url: "https://releases.invalid/manifest.json".to_string(),
            sandbox: false,
            override_path: None,
        },
        run_id: "run-test".to_string(),
    }
}

#[test]
fn lock_is_exclusive_per_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = cfg(dir.path());

    let guard = acquire_lock(&config).unwrap();
    let err = acquire_lock(&config).unwrap_err();
    assert!(matches!(err, DaemonError::AlreadyRunning(_)));

    drop(guard);
    acquire_lock(&config).unwrap();
}

#[test]
fn lock_file_records_our_pid() {
    let dir = tempfile::tempdir().unwrap();
    let config = cfg(dir.path());
    let _guard = acquire_lock(&config).unwrap();

    let content = std::fs::read_to_string(config.lock_path()).unwrap();
    assert_eq!(content.trim(), std::process::id().to_string());
}

#[test]
fn startup_marker_and_error_are_discoverable() {
    let dir = tempfile::tempdir().unwrap();
    let config = cfg(dir.path());

    write_startup_marker(&config).unwrap();
    write_startup_error(&config, &DaemonError::NoActiveWorkspace);

    let content = std::fs::read_to_string(config.log_path()).unwrap();
    let parsed = parse_startup_error(&content).unwrap();
    assert!(parsed.contains("no active local workspace"), "{parsed}");
}

#[test]
fn errors_before_the_last_marker_are_ignored() {
    let content = format!(
        "ERROR old failure\n{marker}123) ---\n\nall good\n",
        marker = STARTUP_MARKER_PREFIX
    );
    assert!(parse_startup_error(&content).is_none());
}

#[test]
fn log_rotation_shifts_files() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("daemon.log");

    // Under the limit: untouched.
    std::fs::write(&log, "small").unwrap();
    rotate_log_if_needed(&log);
    assert!(log.exists());

    // Over the limit: rotated to .1.
    std::fs::write(&log, vec![b'x'; 11 * 1024 * 1024]).unwrap();
    rotate_log_if_needed(&log);
    assert!(!log.exists());
    assert!(dir.path().join("daemon.log.1").exists());
}
