// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands.
//!
//! Connecting consults the persisted state first: a recorded daemon whose
//! pid is alive and whose `/health` answers within the staleness budget is
//! authoritative; anything else is treated as not running and (for
//! commands that need one) auto-started.

use std::path::PathBuf;

use openwork_core::Workspace;
use openwork_storage::{StateStore, STALE_PROBE_TIMEOUT};
use openwork_supervisor::health::probe_ok;
use openwork_supervisor::process::process_alive;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::RunConfig;
use crate::daemon_process;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running")]
    NotRunning,

    #[error("failed to start daemon: {0}")]
    StartFailed(String),

    #[error("timed out waiting for the daemon to start")]
    StartTimeout,

    #[error("daemon rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP client for the router daemon's control plane.
#[derive(Debug)]
pub struct DaemonClient {
    base_url: String,
    client: reqwest::Client,
}

impl DaemonClient {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Connect to a live daemon; never starts one.
    pub async fn connect(cfg: &RunConfig) -> Result<Self, ClientError> {
        let store = StateStore::new(&cfg.data_dir);
        let state = store.load();
        let Some(record) = state.daemon else {
            return Err(ClientError::NotRunning);
        };

        let client = reqwest::Client::new();
        let fresh = process_alive(record.pid)
            && probe_ok(&client, &format!("{}/health", record.base_url), STALE_PROBE_TIMEOUT)
                .await;
        if !fresh {
            return Err(ClientError::NotRunning);
        }
        Ok(Self { base_url: record.base_url, client })
    }

    /// Connect, auto-starting a detached daemon when none is live.
    pub async fn connect_or_start(cfg: &RunConfig) -> Result<Self, ClientError> {
        match Self::connect(cfg).await {
            Ok(client) => Ok(client),
            Err(ClientError::NotRunning) => {
                let child = daemon_process::start_daemon_background(cfg)?;
                daemon_process::wait_for_daemon(cfg, child).await?;
                Self::connect(cfg).await
            }
            Err(e) => Err(e),
        }
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        self.get_json("/health").await
    }

    pub async fn list_workspaces(&self) -> Result<(Option<String>, Vec<Workspace>), ClientError> {
        let body = self.get_json("/workspaces").await?;
        let active_id = body["activeId"].as_str().map(String::from);
        let workspaces =
            serde_json::from_value(body["workspaces"].clone()).unwrap_or_default();
        Ok((active_id, workspaces))
    }

    pub async fn add_workspace(
        &self,
        path: &std::path::Path,
        name: Option<&str>,
    ) -> Result<Workspace, ClientError> {
        self.post_workspace("/workspaces", json!({ "path": path, "name": name })).await
    }

    pub async fn add_remote_workspace(
        &self,
        base_url: &str,
        directory: Option<&str>,
        name: Option<&str>,
    ) -> Result<Workspace, ClientError> {
        self.post_workspace(
            "/workspaces/remote",
            json!({ "baseUrl": base_url, "directory": directory, "name": name }),
        )
        .await
    }

    pub async fn get_workspace(&self, id: &str) -> Result<Workspace, ClientError> {
        let body = self.get_json(&format!("/workspaces/{id}")).await?;
        serde_json::from_value(body).map_err(|e| ClientError::Rejected {
            status: 200,
            message: format!("malformed workspace payload: {e}"),
        })
    }

    pub async fn activate_workspace(&self, id: &str) -> Result<Workspace, ClientError> {
        let body = self.post_json(&format!("/workspaces/{id}/activate"), None).await?;
        serde_json::from_value(body).map_err(|e| ClientError::Rejected {
            status: 200,
            message: format!("malformed workspace payload: {e}"),
        })
    }

    pub async fn workspace_path(&self, id: &str) -> Result<Value, ClientError> {
        self.get_json(&format!("/workspaces/{id}/path")).await
    }

    pub async fn dispose_instance(&self, id: &str) -> Result<Value, ClientError> {
        self.post_json(&format!("/instances/{id}/dispose"), None).await
    }

    pub async fn shutdown(&self) -> Result<(), ClientError> {
        self.post_json("/shutdown", None).await?;
        Ok(())
    }

    async fn post_workspace(&self, path: &str, body: Value) -> Result<Workspace, ClientError> {
        let value = self.post_json(path, Some(body)).await?;
        serde_json::from_value(value).map_err(|e| ClientError::Rejected {
            status: 200,
            message: format!("malformed workspace payload: {e}"),
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        let resp = self.client.get(format!("{}{path}", self.base_url)).send().await?;
        Self::into_value(resp).await
    }

    async fn post_json(&self, path: &str, body: Option<Value>) -> Result<Value, ClientError> {
        let mut request = self.client.post(format!("{}{path}", self.base_url));
        if let Some(body) = body {
            request = request.json(&body);
        }
        Self::into_value(request.send().await?).await
    }

    async fn into_value(resp: reqwest::Response) -> Result<Value, ClientError> {
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or_else(|_| json!({}));
        if !status.is_success() {
            let message = body["error"].as_str().unwrap_or("unknown error").to_string();
            return Err(ClientError::Rejected { status: status.as_u16(), message });
        }
        Ok(body)
    }
}

/// Pid recorded for the live daemon, if any (used by `daemon stop`).
pub fn recorded_daemon_pid(data_dir: &PathBuf) -> Option<u32> {
    StateStore::new(data_dir).load().daemon.map(|d| d.pid)
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
