// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use yare::parameterized;

use super::*;

#[parameterized(
    bare = { "1.2.3", Some("1.2.3") },
    in_sentence = { "opencode 1.2.3 (release)", Some("1.2.3") },
    v_prefixed = { "v0.9.0", Some("0.9.0") },
    prerelease = { "2.0.0-beta.1", Some("2.0.0-beta.1") },
    build_meta = { "1.0.0+abcdef", Some("1.0.0+abcdef") },
    picks_first = { "cli 1.1.1 engine 2.2.2", Some("1.1.1") },
    two_part = { "1.2", None },
    four_part = { "1.2.3.4", None },
    trailing_junk = { "1.2.3abc", None },
    empty = { "", None },
    words_only = { "no version here", None },
)]
fn semver_extraction(input: &str, expected: Option<&str>) {
    assert_eq!(extract_semver(input).as_deref(), expected);
}

#[test]
fn matching_versions_pass() {
    check_version("opencode", "1.2.3", "1.2.3", false).unwrap();
}

#[test]
fn mismatch_is_fatal_for_managed_sources() {
    let err = check_version("opencode", "1.2.3", "9.9.9", false).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("1.2.3") && msg.contains("9.9.9"), "{msg}");
}

#[test]
fn mismatch_only_warns_for_external() {
    check_version("opencode", "1.2.3", "9.9.9", true).unwrap();
}

#[tokio::test]
async fn probe_reads_version_from_a_real_binary() {
    // Fake sidecar: a shell script that answers --version.
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("fake-engine");
    std::fs::write(&bin, "#!/bin/sh\necho \"fake-engine 3.1.4\"\n").unwrap();
    crate::remote::make_executable(&bin).unwrap();

    let version = probe_version(&bin, "fake-engine").await.unwrap();
    assert_eq!(version, "3.1.4");
}

#[tokio::test]
async fn probe_fails_on_unparseable_output() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("mute");
    std::fs::write(&bin, "#!/bin/sh\necho \"no version output\"\n").unwrap();
    crate::remote::make_executable(&bin).unwrap();

    let err = probe_version(&bin, "mute").await.unwrap_err();
    assert!(matches!(err, ResolveError::Probe { .. }));
}
