// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn absent_file_is_none() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_allowlist(&dir.path().join("missing.json")).unwrap().is_none());
}

#[test]
fn corrupt_file_is_an_error_not_an_open_door() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("allowlist.json");
    std::fs::write(&path, "{oops").unwrap();
    assert!(matches!(load_allowlist(&path), Err(SandboxError::BadAllowlist { .. })));
}

#[test]
fn document_parses_with_camel_case_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("allowlist.json");
    std::fs::write(
        &path,
        r#"{
          "allowedRoots": [
            { "path": "/srv/projects", "allowReadWrite": true, "description": "work" }
          ],
          "blockedPatterns": [".terraform"]
        }"#,
    )
    .unwrap();

    let allowlist = load_allowlist(&path).unwrap().unwrap();
    assert_eq!(allowlist.allowed_roots.len(), 1);
    assert!(allowlist.allowed_roots[0].allow_read_write);
    assert_eq!(allowlist.blocked_patterns, vec![".terraform".to_string()]);
}

#[test]
fn default_patterns_are_always_merged() {
    let allowlist = MountAllowlist {
        allowed_roots: vec![],
        blocked_patterns: vec![".terraform".to_string(), ".ssh".to_string()],
    };
    let patterns = allowlist.effective_blocked_patterns();
    // Every default present, user addition appended, duplicate not doubled.
    for default in DEFAULT_BLOCKED_PATTERNS {
        assert!(patterns.iter().any(|p| p == default), "missing default {default}");
    }
    assert!(patterns.iter().any(|p| p == ".terraform"));
    assert_eq!(patterns.iter().filter(|p| *p == ".ssh").count(), 1);
}

#[test]
fn template_is_valid_json() {
    let template = allowlist_template();
    let parsed: MountAllowlist = serde_json::from_str(&template).unwrap();
    assert!(!parsed.allowed_roots.is_empty());
}

#[test]
fn explicit_path_override_wins() {
    let path = allowlist_path(Some(Path::new("/etc/openwork/allow.json")));
    assert_eq!(path, Path::new("/etc/openwork/allow.json"));
}
