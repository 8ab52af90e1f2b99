// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn bundled_path_sits_next_to_the_orchestrator() {
    let path = bundled_path(Path::new("/opt/openwork/bin"), "opencode");
    assert_eq!(path, Path::new("/opt/openwork/bin/opencode"));
}

#[test]
fn local_manifest_loads_when_present() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(LOCAL_MANIFEST_NAME),
        r#"{ "opencode": { "version": "1.2.3", "sha256": "cafe" } }"#,
    )
    .unwrap();

    let manifest = load_local_manifest(dir.path()).unwrap();
    assert_eq!(manifest.entry("opencode").unwrap().version, "1.2.3");
}

#[test]
fn absent_or_corrupt_manifest_is_none() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_local_manifest(dir.path()).is_none());

    std::fs::write(dir.path().join(LOCAL_MANIFEST_NAME), "{broken").unwrap();
    assert!(load_local_manifest(dir.path()).is_none());
}

#[test]
fn path_lookup_finds_executables() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("probe-bin");
    std::fs::write(&bin, "#!/bin/sh\n").unwrap();

    let original = std::env::var_os("PATH");
    std::env::set_var("PATH", dir.path());
    let found = path_lookup("probe-bin");
    match original {
        Some(p) => std::env::set_var("PATH", p),
        None => std::env::remove_var("PATH"),
    }

    assert_eq!(found, Some(bin));
}
