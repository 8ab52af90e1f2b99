// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers.

use std::process::Output;
use std::time::Duration;

use tokio::process::Command;

/// Default timeout for short command probes (container CLI, etc.).
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(2500);

/// Timeout for `--version` probes of resolved binaries.
pub const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(4);

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting
/// timeout expiration into a descriptive error message. The child process
/// is killed automatically if the timeout elapses (via the tokio `Child`
/// drop implementation).
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{} failed: {}", description, io_err)),
        Err(_elapsed) => {
            Err(format!("{} timed out after {:.1}s", description, timeout.as_secs_f64()))
        }
    }
}

#[cfg(test)]
#[path = "cmd_tests.rs"]
mod tests;
