// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use openwork_core::Workspace;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::router::DaemonCtx;
use crate::DaemonError;

#[derive(Debug, Deserialize)]
pub struct AddWorkspaceBody {
    pub path: PathBuf,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRemoteBody {
    pub base_url: String,
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// GET /health
pub async fn health(State(ctx): State<Arc<DaemonCtx>>) -> Json<Value> {
    let (daemon, engine, active_id, workspace_count) = {
        let state = ctx.state.lock();
        (
            state.daemon.clone(),
            state.engine.clone(),
            state.active_id.clone(),
            state.workspaces.len(),
        )
    };
    Json(json!({
        "ok": true,
        "daemon": daemon,
        "engine": engine,
        "activeId": active_id,
        "workspaceCount": workspace_count,
        "uptimeSecs": ctx.start_time.elapsed().as_secs(),
        "diagnostics": ctx.diagnostics.lock().clone(),
    }))
}

/// GET /workspaces
pub async fn list_workspaces(State(ctx): State<Arc<DaemonCtx>>) -> Json<Value> {
    let state = ctx.state.lock();
    Json(json!({ "activeId": state.active_id, "workspaces": state.workspaces }))
}

/// POST /workspaces
pub async fn add_workspace(
    State(ctx): State<Arc<DaemonCtx>>,
    Json(body): Json<AddWorkspaceBody>,
) -> Result<Json<Workspace>, DaemonError> {
    if !body.path.is_absolute() {
        return Err(DaemonError::BadRequest(format!(
            "workspace path must be absolute, got {}",
            body.path.display()
        )));
    }
    std::fs::create_dir_all(&body.path)?;
    let workspace = Workspace::local(&body.path, body.name);
    crate::engine::seed_engine_config(&ctx.cfg.data_dir, &workspace)?;

    let stored = {
        let mut state = ctx.state.lock();
        let id = state.upsert_workspace(workspace);
        let stored = state.workspace(&id).cloned();
        ctx.store.save(&state)?;
        stored
    };
    let stored = stored.ok_or_else(|| DaemonError::BadRequest("workspace vanished".into()))?;
    info!(component = "daemon", id = stored.id.as_str(), "workspace upserted");
    Ok(Json(stored))
}

/// POST /workspaces/remote
pub async fn add_remote_workspace(
    State(ctx): State<Arc<DaemonCtx>>,
    Json(body): Json<AddRemoteBody>,
) -> Result<Json<Workspace>, DaemonError> {
    let scheme_ok =
        body.base_url.starts_with("http://") || body.base_url.starts_with("https://");
    if !scheme_ok {
        return Err(DaemonError::BadRequest(format!(
            "baseUrl must be http or https, got {}",
            body.base_url
        )));
    }
    let workspace = Workspace::remote(&body.base_url, body.directory, body.name);

    let stored = {
        let mut state = ctx.state.lock();
        let id = state.upsert_workspace(workspace);
        let stored = state.workspace(&id).cloned();
        ctx.store.save(&state)?;
        stored
    };
    let stored = stored.ok_or_else(|| DaemonError::BadRequest("workspace vanished".into()))?;
    info!(component = "daemon", id = stored.id.as_str(), "remote workspace upserted");
    Ok(Json(stored))
}

/// GET /workspaces/:id
pub async fn get_workspace(
    State(ctx): State<Arc<DaemonCtx>>,
    Path(id): Path<String>,
) -> Result<Json<Workspace>, DaemonError> {
    ctx.state
        .lock()
        .workspace(&id)
        .cloned()
        .map(Json)
        .ok_or(DaemonError::WorkspaceNotFound(id))
}

/// POST /workspaces/:id/activate
pub async fn activate_workspace(
    State(ctx): State<Arc<DaemonCtx>>,
    Path(id): Path<String>,
) -> Result<Json<Workspace>, DaemonError> {
    let stored = {
        let mut state = ctx.state.lock();
        if !state.activate(&id) {
            return Err(DaemonError::WorkspaceNotFound(id));
        }
        let stored = state.workspace(&id).cloned();
        ctx.store.save(&state)?;
        stored
    };
    let stored = stored.ok_or(DaemonError::WorkspaceNotFound(id))?;
    info!(component = "daemon", id = stored.id.as_str(), "workspace activated");
    Ok(Json(stored))
}

/// GET /workspaces/:id/path
///
/// Local workspaces need the engine up first; remote workspaces forward
/// against their own base URL.
pub async fn workspace_path(
    State(ctx): State<Arc<DaemonCtx>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, DaemonError> {
    let workspace = ctx
        .state
        .lock()
        .workspace(&id)
        .cloned()
        .ok_or_else(|| DaemonError::WorkspaceNotFound(id.clone()))?;

    let (base, directory) = if workspace.is_local() {
        let record = ctx.engine.ensure_engine(&ctx.cfg.data_dir, &ctx.store, &ctx.state).await?;
        (record.base_url, workspace.path.display().to_string())
    } else {
        let base = workspace
            .base_url
            .clone()
            .ok_or_else(|| DaemonError::BadRequest("remote workspace without baseUrl".into()))?;
        (base, workspace.directory.clone().unwrap_or_default())
    };

    let resp = ctx
        .client
        .get(format!("{base}/path"))
        .query(&[("directory", directory.as_str())])
        .send()
        .await?;
    let body: Value = resp.json().await.unwrap_or_else(|_| json!({}));
    Ok(Json(body))
}

/// POST /instances/:id/dispose
pub async fn dispose_instance(
    State(ctx): State<Arc<DaemonCtx>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, DaemonError> {
    let workspace = ctx
        .state
        .lock()
        .workspace(&id)
        .cloned()
        .ok_or_else(|| DaemonError::WorkspaceNotFound(id.clone()))?;

    let Some(record) = ({ ctx.state.lock().engine.clone() }) else {
        // Nothing running, nothing to drop.
        return Ok(Json(json!({ "disposed": false })));
    };

    let resp = ctx
        .client
        .post(format!("{}/instances/dispose", record.base_url))
        .json(&json!({ "directory": workspace.path }))
        .send()
        .await?;
    info!(component = "daemon", id = workspace.id.as_str(), "instance dispose requested");
    Ok(Json(json!({ "disposed": resp.status().is_success() })))
}

/// POST /shutdown
///
/// Clears the daemon record, answers 200, then stops the serve loop.
pub async fn shutdown(State(ctx): State<Arc<DaemonCtx>>) -> Result<Json<Value>, DaemonError> {
    {
        let mut state = ctx.state.lock();
        state.daemon = None;
        ctx.store.save(&state)?;
    }
    info!(component = "daemon", "shutdown requested via control plane");
    ctx.shutdown.notify_one();
    Ok(Json(json!({ "ok": true })))
}
