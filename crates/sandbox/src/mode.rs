// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sandbox mode selection and runtime probing.

use std::str::FromStr;

use openwork_supervisor::cmd::{run_with_timeout, PROBE_TIMEOUT};
use tokio::process::Command;
use tracing::debug;

use crate::SandboxError;

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SandboxMode {
    #[default]
    None,
    Auto,
    Docker,
    Container,
}

impl FromStr for SandboxMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "auto" => Ok(Self::Auto),
            "docker" => Ok(Self::Docker),
            "container" => Ok(Self::Container),
            other => Err(format!(
                "unknown sandbox mode {other:?} (expected none, auto, docker or container)"
            )),
        }
    }
}

/// A working container runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerCli {
    Docker,
    /// Apple's `container` CLI, Apple-silicon macOS only.
    AppleContainer,
}

impl ContainerCli {
    pub fn command(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::AppleContainer => "container",
        }
    }
}

/// Is the Apple `container` CLI even a candidate on this host?
fn apple_container_supported() -> bool {
    cfg!(all(target_os = "macos", target_arch = "aarch64"))
}

/// Resolve the requested mode to a runtime.
///
/// `auto` probes the Apple CLI first (where supported) then Docker, and
/// falls back to no sandbox when neither answers. Explicit modes fail hard
/// when their runtime does not work.
pub async fn probe_mode(mode: SandboxMode) -> Result<Option<ContainerCli>, SandboxError> {
    match mode {
        SandboxMode::None => Ok(None),
        SandboxMode::Docker => {
            if cli_works(ContainerCli::Docker).await {
                Ok(Some(ContainerCli::Docker))
            } else {
                Err(SandboxError::NoRuntime("docker is not responding".to_string()))
            }
        }
        SandboxMode::Container => {
            if !apple_container_supported() {
                return Err(SandboxError::NoRuntime(
                    "the container CLI is only supported on Apple-silicon macOS".to_string(),
                ));
            }
            if cli_works(ContainerCli::AppleContainer).await {
                Ok(Some(ContainerCli::AppleContainer))
            } else {
                Err(SandboxError::NoRuntime("container CLI is not responding".to_string()))
            }
        }
        SandboxMode::Auto => {
            if apple_container_supported() && cli_works(ContainerCli::AppleContainer).await {
                return Ok(Some(ContainerCli::AppleContainer));
            }
            if cli_works(ContainerCli::Docker).await {
                return Ok(Some(ContainerCli::Docker));
            }
            debug!(component = "sandbox", "no container runtime found, running unsandboxed");
            Ok(None)
        }
    }
}

async fn cli_works(cli: ContainerCli) -> bool {
    let mut cmd = Command::new(cli.command());
    cmd.arg("--version");
    match run_with_timeout(cmd, PROBE_TIMEOUT, cli.command()).await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "mode_tests.rs"]
mod tests;
