// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run lifecycle.
//!
//! A run moves `starting → running → healthy → (detached | shutting_down)
//! → terminated`. The supervision loop owns the back half: it watches for
//! child exits and interrupt signals, fans out shutdown exactly once, and
//! produces the process exit code.

use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::child::{ChildExit, Supervisor};

/// Lifecycle states of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Starting,
    Running,
    Healthy,
    Detached,
    ShuttingDown,
    Terminated,
}

impl RunState {
    /// Legal transitions of the run state machine.
    pub fn can_transition(self, to: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, to),
            (Starting, Running)
                | (Running, Healthy)
                | (Healthy, Detached)
                // Unexpected child exit or interrupt, from any live state.
                | (Starting, ShuttingDown)
                | (Running, ShuttingDown)
                | (Healthy, ShuttingDown)
                | (ShuttingDown, Terminated)
        )
    }
}

/// Terminal result of a supervised run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub exit_code: i32,
}

/// Drive a healthy run to completion.
///
/// Returns when an interrupt arrives (exit 0) or a child dies unexpectedly
/// (the child's code, or 1). Exits observed while detached or while a
/// shutdown cascade is already in flight are ignored.
pub async fn supervise_until_shutdown(
    supervisor: Arc<Supervisor>,
    mut exits: mpsc::UnboundedReceiver<ChildExit>,
) -> std::io::Result<RunOutcome> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        tokio::select! {
            exit = exits.recv() => {
                let Some(exit) = exit else {
                    // Channel closed: every child gone, nothing left to watch.
                    return Ok(RunOutcome { exit_code: 0 });
                };
                if supervisor.is_detached() || supervisor.shutting_down() {
                    continue;
                }
                error!(
                    component = exit.name.as_str(),
                    pid = exit.pid,
                    code = exit.code,
                    "child exited unexpectedly, shutting down run"
                );
                supervisor.shutdown_all().await;
                return Ok(RunOutcome { exit_code: exit.code.unwrap_or(1) });
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                supervisor.shutdown_all().await;
                return Ok(RunOutcome { exit_code: 0 });
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                supervisor.shutdown_all().await;
                return Ok(RunOutcome { exit_code: 0 });
            }
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
