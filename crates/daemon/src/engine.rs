// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One engine per daemon.
//!
//! `ensure_engine` is the only gate to the engine: it reuses the persisted
//! record when the recorded pid is alive and answering, and otherwise
//! spawns a fresh engine against the active local workspace. A tokio mutex
//! makes the whole check-spawn-gate sequence single-flight, so a burst of
//! requests against a cold daemon collapses to one spawn.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use openwork_core::state::BinaryProvenance;
use openwork_core::{
    BinaryRecord, Diagnostics, PersistedState, ServiceRecord, SidecarRecord, Workspace,
};
use openwork_resolver::{Resolver, ResolverConfig, ENGINE_BIN};
use openwork_storage::{StateStore, STALE_PROBE_TIMEOUT};
use openwork_supervisor::child::pump_lines;
use openwork_supervisor::health::{probe_ok, wait_for_healthy, DEFAULT_POLL, DEFAULT_TIMEOUT};
use openwork_supervisor::{port, process, RUN_ID_ENV};
use parking_lot::Mutex;
use tokio::process::Command;
use tracing::{debug, info};

use crate::DaemonError;

/// Spawns engine processes. Abstracted so the single-flight and reuse
/// rules are testable without a real engine binary.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    /// Start an engine for `workspace` listening on `port`; returns its pid.
    async fn spawn(&self, workspace: &Workspace, port: u16) -> Result<u32, DaemonError>;
}

/// Production launcher: resolves the engine binary and spawns
/// `opencode serve`.
pub struct ProcessLauncher {
    resolver: ResolverConfig,
    hostname: String,
    cors: Vec<String>,
    auth: Option<String>,
    run_id: String,
    diagnostics: Arc<Mutex<Diagnostics>>,
}

impl ProcessLauncher {
    pub fn new(
        resolver: ResolverConfig,
        hostname: String,
        cors: Vec<String>,
        auth: Option<String>,
        run_id: String,
        diagnostics: Arc<Mutex<Diagnostics>>,
    ) -> Self {
        Self { resolver, hostname, cors, auth, run_id, diagnostics }
    }
}

#[async_trait]
impl EngineLauncher for ProcessLauncher {
    async fn spawn(&self, workspace: &Workspace, port: u16) -> Result<u32, DaemonError> {
        let resolved = Resolver::new(self.resolver.clone()).resolve(ENGINE_BIN).await?;
        info!(component = "engine",
            path = %resolved.path.display(),
            version = resolved.actual_version.as_deref().unwrap_or("unknown"),
            "spawning engine");
        {
            let mut diagnostics = self.diagnostics.lock();
            diagnostics.binaries.insert(
                ENGINE_BIN.to_string(),
                BinaryRecord {
                    path: resolved.path.display().to_string(),
                    source: resolved.source,
                    expected_version: resolved.expected_version.clone(),
                    actual_version: resolved.actual_version.clone(),
                },
            );
            diagnostics.sidecar = Some(SidecarRecord {
                source: Some(provenance_str(resolved.source).to_string()),
                version: resolved.actual_version.clone(),
                base_url: Some(self.resolver.base_url.clone()),
            });
        }

        let mut cmd = Command::new(&resolved.path);
        cmd.arg("serve")
            .arg("--hostname")
            .arg(&self.hostname)
            .arg("--port")
            .arg(port.to_string())
            .current_dir(&workspace.path)
            .env(RUN_ID_ENV, &self.run_id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // The engine outlives daemon restarts; never tie it to this handle.
            .kill_on_drop(false);
        for origin in &self.cors {
            cmd.arg("--cors").arg(origin);
        }
        if let Some(auth) = &self.auth {
            cmd.env("OPENCODE_AUTH", auth);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| DaemonError::EngineSpawn(format!("{}: {e}", resolved.path.display())))?;
        let pid = child.id().unwrap_or_default();

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump_lines(stdout, "engine".to_string(), false, false));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump_lines(stderr, "engine".to_string(), true, false));
        }
        // Reap if it dies while this daemon is alive; the record's health
        // probe handles the case where it dies after we are gone.
        tokio::spawn(async move {
            let _ = child.wait().await;
        });

        Ok(pid)
    }
}

/// Owns the ensure-engine critical section.
pub struct EngineManager {
    launcher: Arc<dyn EngineLauncher>,
    client: reqwest::Client,
    ensure_flight: tokio::sync::Mutex<()>,
    engine_host: String,
    preferred_port: u16,
}

impl EngineManager {
    pub fn new(launcher: Arc<dyn EngineLauncher>, engine_host: String, preferred_port: u16) -> Self {
        Self {
            launcher,
            client: reqwest::Client::new(),
            ensure_flight: tokio::sync::Mutex::new(()),
            engine_host,
            preferred_port,
        }
    }

    /// Reuse the live engine or spawn one; single-flight under a burst.
    ///
    /// The persisted record is written only after the engine's `/health`
    /// has answered.
    pub async fn ensure_engine(
        &self,
        data_dir: &Path,
        store: &StateStore,
        state: &Mutex<PersistedState>,
    ) -> Result<ServiceRecord, DaemonError> {
        let _flight = self.ensure_flight.lock().await;

        let existing_engine = state.lock().engine.clone();
        if let Some(record) = existing_engine {
            if process::process_alive(record.pid)
                && probe_ok(
                    &self.client,
                    &format!("{}/health", record.base_url),
                    STALE_PROBE_TIMEOUT,
                )
                .await
            {
                debug!(component = "engine", pid = record.pid, "reusing live engine");
                return Ok(record);
            }
            debug!(component = "engine", pid = record.pid, "persisted engine is stale");
        }

        let workspace = state
            .lock()
            .active_workspace()
            .filter(|ws| ws.is_local())
            .cloned()
            .ok_or(DaemonError::NoActiveWorkspace)?;
        seed_engine_config(data_dir, &workspace)?;

        let port = port::allocate(&self.engine_host, self.preferred_port)?;
        let pid = self.launcher.spawn(&workspace, port).await?;
        let base_url = format!("http://{}:{}", self.engine_host, port);
        wait_for_healthy(&self.client, &format!("{base_url}/health"), DEFAULT_TIMEOUT, DEFAULT_POLL)
            .await?;

        let record = ServiceRecord { pid, port, base_url, started_at: Utc::now() };
        {
            let mut guard = state.lock();
            guard.engine = Some(record.clone());
            store.save(&guard)?;
        }
        info!(component = "engine", pid, port, workspace = workspace.id.as_str(),
            "engine is healthy");
        Ok(record)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

fn provenance_str(source: BinaryProvenance) -> &'static str {
    match source {
        BinaryProvenance::Bundled => "bundled",
        BinaryProvenance::Downloaded => "downloaded",
        BinaryProvenance::External => "external",
    }
}

/// Ensure the per-workspace engine config directory exists and carries a
/// seed config the engine can start from.
pub fn seed_engine_config(data_dir: &Path, workspace: &Workspace) -> Result<PathBuf, DaemonError> {
    let dir = data_dir.join("engine-config").join(&workspace.id);
    std::fs::create_dir_all(&dir)?;
    let config_path = dir.join("opencode.json");
    if !config_path.exists() {
        let seed = serde_json::json!({
            "workspace": workspace.path,
        });
        std::fs::write(&config_path, serde_json::to_string_pretty(&seed).unwrap_or_default())?;
    }
    Ok(dir)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
