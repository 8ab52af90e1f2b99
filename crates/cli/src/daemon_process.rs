// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management.
//!
//! The daemon is this same executable invoked as `openwork daemon run`,
//! spawned detached with the caller's configuration flags. Startup is
//! verified through the state file's daemon record and `/health`; early
//! exits are diagnosed from the daemon log's last startup marker.

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use openwork_daemon::lifecycle::parse_startup_error;
use openwork_storage::{StateStore, STALE_PROBE_TIMEOUT};
use openwork_supervisor::health::probe_ok;
use openwork_supervisor::process::process_alive;

use crate::client::ClientError;
use crate::config::RunConfig;

/// Budget for the daemon to come up.
const START_TIMEOUT: Duration = Duration::from_secs(10);

const START_POLL: Duration = Duration::from_millis(100);

/// Spawn a detached daemon child inheriting this invocation's flags.
pub fn start_daemon_background(cfg: &RunConfig) -> Result<Child, ClientError> {
    let exe = std::env::current_exe()?;
    let mut cmd = Command::new(exe);
    cmd.args(["daemon", "run"])
        .arg("--data-dir")
        .arg(&cfg.data_dir)
        .arg("--daemon-host")
        .arg(&cfg.daemon_host)
        .arg("--daemon-port")
        .arg(cfg.daemon_port.to_string())
        .arg("--opencode-host")
        .arg(&cfg.engine_host)
        .arg("--opencode-port")
        .arg(cfg.engine_port.to_string())
        .arg("--sidecar-base-url")
        .arg(&cfg.sidecar_base_url)
        .arg("--sidecar-manifest")
        .arg(&cfg.sidecar_manifest)
        .arg("--run-id")
        .arg(&cfg.run_id)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd.arg("--sidecar-source").arg(match cfg.sidecar_source {
        openwork_resolver::SourcePreference::Auto => "auto",
        openwork_resolver::SourcePreference::Bundled => "bundled",
        openwork_resolver::SourcePreference::Downloaded => "downloaded",
        openwork_resolver::SourcePreference::External => "external",
    });
    if cfg.allow_external {
        cmd.arg("--allow-external");
    }
    if let Some(bin) = &cfg.engine_bin {
        cmd.arg("--opencode-bin").arg(bin);
    }
    for origin in &cfg.cors {
        cmd.arg("--cors").arg(origin);
    }

    cmd.spawn().map_err(|e| ClientError::StartFailed(e.to_string()))
}

/// Wait until the spawned daemon records itself and answers `/health`,
/// watching for an early exit.
pub async fn wait_for_daemon(cfg: &RunConfig, mut child: Child) -> Result<(), ClientError> {
    let store = StateStore::new(&cfg.data_dir);
    let client = reqwest::Client::new();
    let deadline = Instant::now() + START_TIMEOUT;

    while Instant::now() < deadline {
        // Early exit means startup failure; the log has the reason.
        if let Ok(Some(status)) = child.try_wait() {
            let reason = read_startup_error(cfg)
                .unwrap_or_else(|| format!("daemon exited with {status}"));
            return Err(ClientError::StartFailed(reason));
        }

        if let Some(record) = store.load().daemon {
            if process_alive(record.pid)
                && probe_ok(&client, &format!("{}/health", record.base_url), STALE_PROBE_TIMEOUT)
                    .await
            {
                return Ok(());
            }
        }
        tokio::time::sleep(START_POLL).await;
    }

    Err(read_startup_error(cfg)
        .map(ClientError::StartFailed)
        .unwrap_or(ClientError::StartTimeout))
}

/// Read the daemon log from its last startup marker, looking for errors.
pub fn read_startup_error(cfg: &RunConfig) -> Option<String> {
    let content = std::fs::read_to_string(cfg.data_dir.join("daemon.log")).ok()?;
    parse_startup_error(&content)
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
