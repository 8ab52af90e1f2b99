// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn mode_parses_all_values() {
    assert_eq!("none".parse::<SandboxMode>().unwrap(), SandboxMode::None);
    assert_eq!("auto".parse::<SandboxMode>().unwrap(), SandboxMode::Auto);
    assert_eq!("docker".parse::<SandboxMode>().unwrap(), SandboxMode::Docker);
    assert_eq!("container".parse::<SandboxMode>().unwrap(), SandboxMode::Container);
    assert!("podman".parse::<SandboxMode>().is_err());
}

#[tokio::test]
async fn none_mode_probes_nothing() {
    assert_eq!(probe_mode(SandboxMode::None).await.unwrap(), None);
}

#[cfg(not(all(target_os = "macos", target_arch = "aarch64")))]
#[tokio::test]
async fn apple_container_is_rejected_off_apple_silicon() {
    let err = probe_mode(SandboxMode::Container).await.unwrap_err();
    assert!(err.to_string().contains("Apple-silicon"));
}
