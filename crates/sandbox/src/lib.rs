// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container sandboxing for the sidecar pair.
//!
//! Runs engine + app server inside a container with a validated
//! host/container boundary: only the workspace, a per-workspace persist
//! directory, and the engine config directory are mounted by default;
//! anything else must pass the mount allowlist. The runtime is staged into
//! the persist directory (sidecar binaries + generated entrypoint) so the
//! container image needs nothing preinstalled.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod allowlist;
mod entrypoint;
mod mode;
mod mounts;
mod runner;

pub use allowlist::{
    allowlist_path, allowlist_template, load_allowlist, MountAllowlist, DEFAULT_BLOCKED_PATTERNS,
};
pub use entrypoint::{cleanup_staging, shell_quote, stage_runtime, EntrypointConfig, StagedRuntime};
pub use mode::{probe_mode, ContainerCli, SandboxMode};
pub use mounts::{validate_mount, MountSpec};
pub use runner::{SandboxLaunch, SandboxRunner, ENGINE_INTERNAL_PORT, SERVER_INTERNAL_PORT};

use thiserror::Error;

/// Sandbox failures.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("no container runtime available: {0}")]
    NoRuntime(String),

    #[error("invalid mount spec {spec:?}: {reason}")]
    BadMountSpec { spec: String, reason: String },

    #[error(
        "extra mount {spec:?} requires a mount allowlist, and none exists at {path}.\n\
         Create one, for example:\n{template}"
    )]
    AllowlistMissing { spec: String, path: String, template: String },

    #[error("mount {spec:?} is blocked: path segment matches pattern {pattern:?}")]
    BlockedPattern { spec: String, pattern: String },

    #[error("mount {spec:?} is outside every allowed root in the allowlist")]
    OutsideAllowedRoots { spec: String },

    #[error("allowlist at {path} is invalid: {reason}")]
    BadAllowlist { path: String, reason: String },

    #[error("container command failed: {0}")]
    Container(String),

    #[error("container {name} did not reach running state: {reason}")]
    NotRunning { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
