// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container launch and health gating.
//!
//! Only the app server's port is published; the engine stays internal and
//! is reachable solely through the app server's reverse proxy. The gating
//! order is therefore: container running, then app-server `/health`, then
//! the engine probed through the proxy path.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use openwork_supervisor::cmd::{run_with_timeout, PROBE_TIMEOUT};
use openwork_supervisor::health;
use tokio::process::Command;
use tracing::info;

use crate::entrypoint::{
    StagedRuntime, CONTAINER_ENGINE_CONFIG, CONTAINER_PERSIST, CONTAINER_SIDECARS,
    CONTAINER_WORKSPACE,
};
use crate::mode::ContainerCli;
use crate::mounts::MountSpec;
use crate::SandboxError;

/// Fixed engine port inside the container.
pub const ENGINE_INTERNAL_PORT: u16 = 4096;

/// Fixed app-server port inside the container.
pub const SERVER_INTERNAL_PORT: u16 = 8100;

/// How long the container gets to reach `running`.
const RUNNING_TIMEOUT: Duration = Duration::from_secs(30);

const RUNNING_POLL: Duration = Duration::from_millis(250);

/// Everything needed to start one sandboxed run.
#[derive(Debug, Clone)]
pub struct SandboxLaunch {
    pub image: String,
    pub container_name: String,
    pub workspace: PathBuf,
    pub persist_dir: PathBuf,
    pub engine_config_dir: PathBuf,
    pub staged: StagedRuntime,
    pub extra_mounts: Vec<MountSpec>,
    /// Host port published onto the app server's internal port.
    pub published_port: u16,
}

/// Drives one container runtime CLI.
#[derive(Debug, Clone, Copy)]
pub struct SandboxRunner {
    cli: ContainerCli,
}

impl SandboxRunner {
    pub fn new(cli: ContainerCli) -> Self {
        Self { cli }
    }

    pub fn cli(&self) -> ContainerCli {
        self.cli
    }

    /// Arguments for the attached `run` invocation.
    ///
    /// The container runs attached (no `-d`): its lifetime is the spawned
    /// child's lifetime, so the supervisor watches it like any other
    /// sidecar.
    pub fn run_args(&self, launch: &SandboxLaunch) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            launch.container_name.clone(),
            "-p".to_string(),
            format!("{}:{}", launch.published_port, SERVER_INTERNAL_PORT),
            "-v".to_string(),
            format!("{}:{}", launch.workspace.display(), CONTAINER_WORKSPACE),
            "-v".to_string(),
            format!("{}:{}", launch.persist_dir.display(), CONTAINER_PERSIST),
            "-v".to_string(),
            format!("{}:{}:ro", launch.staged.sidecars_dir.display(), CONTAINER_SIDECARS),
            "-v".to_string(),
            format!("{}:{}:ro", launch.engine_config_dir.display(), CONTAINER_ENGINE_CONFIG),
        ];
        for mount in &launch.extra_mounts {
            args.push("-v".to_string());
            args.push(mount.volume_arg());
        }
        args.push("--entrypoint".to_string());
        args.push(format!("{CONTAINER_SIDECARS}/entrypoint.sh"));
        args.push(launch.image.clone());
        args
    }

    /// Poll `inspect` until the container reports running.
    ///
    /// Individual inspect failures are transient (the name may not be
    /// registered yet right after spawn); only the deadline is fatal.
    pub async fn wait_running(&self, name: &str) -> Result<(), SandboxError> {
        let deadline = Instant::now() + RUNNING_TIMEOUT;
        let mut last = String::from("no inspect completed");
        while Instant::now() < deadline {
            let mut cmd = Command::new(self.cli.command());
            cmd.args(["inspect", "-f", "{{.State.Running}}", name]);
            match run_with_timeout(cmd, PROBE_TIMEOUT, "container inspect").await {
                Ok(output) if output.status.success() => {
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    if stdout.trim() == "true" {
                        info!(component = "sandbox", container = name, "container is running");
                        return Ok(());
                    }
                    last = format!("state {}", stdout.trim());
                }
                Ok(output) => {
                    last = String::from_utf8_lossy(&output.stderr).trim().to_string();
                }
                Err(e) => last = e,
            }
            tokio::time::sleep(RUNNING_POLL).await;
        }
        Err(SandboxError::NotRunning { name: name.to_string(), reason: last })
    }

    /// Gate the sandboxed pair: app server first, then the engine through
    /// the proxy.
    pub async fn health_gate(
        &self,
        client: &reqwest::Client,
        server_base: &str,
        timeout: Duration,
    ) -> Result<(), SandboxError> {
        health::wait_for_healthy(
            client,
            &format!("{server_base}/health"),
            timeout,
            health::DEFAULT_POLL,
        )
        .await
        .map_err(|e| SandboxError::Container(e.to_string()))?;

        wait_for_proxy_alive(client, server_base, timeout).await
    }

}

/// Probe the engine through the app server's reverse proxy.
///
/// Older app-server builds answer the proxied health path with redirects
/// or 404s even when the proxy is wired up, so any non-5xx response counts
/// as "proxy alive"; only 5xx (proxy reached nothing) and connection
/// errors keep us waiting.
async fn wait_for_proxy_alive(
    client: &reqwest::Client,
    server_base: &str,
    timeout: Duration,
) -> Result<(), SandboxError> {
    let url = format!("{server_base}/opencode/health");
    let deadline = Instant::now() + timeout;
    let mut last = String::from("no probe completed");

    while Instant::now() < deadline {
        match client.get(&url).timeout(Duration::from_secs(2)).send().await {
            Ok(resp) if !resp.status().is_server_error() => return Ok(()),
            Ok(resp) => last = format!("status {}", resp.status()),
            Err(e) => last = e.to_string(),
        }
        tokio::time::sleep(health::DEFAULT_POLL).await;
    }
    Err(SandboxError::Container(format!(
        "engine proxy at {url} not alive after {:.1}s (last error: {last})",
        timeout.as_secs_f64()
    )))
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
