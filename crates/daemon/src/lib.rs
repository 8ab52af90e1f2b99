// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The router daemon.
//!
//! A single long-lived process that owns one engine instance and exposes
//! a loopback HTTP control plane multiplexing workspaces over it. The
//! daemon is the sole writer of the persisted state while it is alive; it
//! records itself there only after its own `/health` answers, and clears
//! the record on graceful shutdown. The engine is intentionally left
//! running across daemon restarts and re-adopted through its persisted
//! record.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod router;
pub mod routes;
pub mod server;

pub use config::DaemonConfig;
pub use engine::{seed_engine_config, EngineLauncher, EngineManager, ProcessLauncher};
pub use router::DaemonCtx;
pub use server::run;

use thiserror::Error;

/// Daemon failures.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("another daemon already holds the lock at {0}")]
    AlreadyRunning(String),

    #[error("no active local workspace; add one with `openwork workspace add <path>`")]
    NoActiveWorkspace,

    #[error("workspace {0} not found")]
    WorkspaceNotFound(String),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("state store error: {0}")]
    Store(#[from] openwork_storage::StoreError),

    #[error("binary resolution failed: {0}")]
    Resolve(#[from] openwork_resolver::ResolveError),

    #[error("engine spawn failed: {0}")]
    EngineSpawn(String),

    #[error("engine health: {0}")]
    Health(#[from] openwork_supervisor::HealthError),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
