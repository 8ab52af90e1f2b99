// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use super::*;

fn cfg(dir: &Path, source: SourcePreference, allow_external: bool) -> ResolverConfig {
    ResolverConfig {
        source,
        allow_external,
        cache_dir: dir.join("sidecars"),
        base_url: "https://releases.invalid".to_string(),
        manifest_url: "https://releases.invalid/manifest.json".to_string(),
        sandbox: false,
        override_path: None,
    }
}

fn fake_binary(dir: &Path, name: &str, version: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\necho \"{name} {version}\"\n")).unwrap();
    remote::make_executable(&path).unwrap();
    path
}

#[tokio::test]
async fn external_requires_allow_external() {
    let dir = tempfile::tempdir().unwrap();
    let bin = fake_binary(dir.path(), "opencode", "1.2.3");

    let mut config = cfg(dir.path(), SourcePreference::External, false);
    config.override_path = Some(bin);
    let err = Resolver::new(config).resolve("opencode").await.unwrap_err();
    assert!(matches!(err, ResolveError::ExternalNotAllowed { .. }));
}

#[tokio::test]
async fn external_override_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = cfg(dir.path(), SourcePreference::External, true);
    config.override_path = Some(dir.path().join("missing-bin"));
    let err = Resolver::new(config).resolve("opencode").await.unwrap_err();
    assert!(matches!(err, ResolveError::BinaryMissing { .. }));
}

#[tokio::test]
async fn external_override_resolves_and_probes() {
    let dir = tempfile::tempdir().unwrap();
    let bin = fake_binary(dir.path(), "opencode", "9.9.9");

    let mut config = cfg(dir.path(), SourcePreference::External, true);
    config.override_path = Some(bin.clone());
    let resolved = Resolver::new(config).resolve("opencode").await.unwrap();

    assert_eq!(resolved.path, bin);
    assert_eq!(resolved.source, openwork_core::state::BinaryProvenance::External);
    assert_eq!(resolved.actual_version.as_deref(), Some("9.9.9"));
}

#[test]
fn sandbox_resolution_forces_linux() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = cfg(dir.path(), SourcePreference::Auto, false);
    config.sandbox = true;
    let resolver = Resolver::new(config);
    assert_eq!(resolver.triple().platform, openwork_core::Platform::Linux);
}

#[test]
fn source_preference_parses() {
    assert_eq!("auto".parse::<SourcePreference>().unwrap(), SourcePreference::Auto);
    assert_eq!("bundled".parse::<SourcePreference>().unwrap(), SourcePreference::Bundled);
    assert!("sideloaded".parse::<SourcePreference>().is_err());
}
