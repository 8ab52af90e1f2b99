// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `openwork workspace` - workspace management.
//!
//! Workspace mutations normally route through the daemon's control plane
//! (auto-starting it when needed). When daemon autostart is disabled and
//! no daemon is live, mutations fall back to writing the state file
//! directly; that branch is the only CLI write path, per the
//! single-writer rule.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use openwork_core::{PersistedState, Workspace};
use openwork_storage::StateStore;

use crate::client::{ClientError, DaemonClient};
use crate::config::RunConfig;
use crate::output::{format_age, format_or_json};

#[derive(Debug, Args)]
pub struct WorkspaceArgs {
    #[command(subcommand)]
    pub command: WorkspaceCommand,
}

#[derive(Debug, Subcommand)]
pub enum WorkspaceCommand {
    /// Register a local directory as a workspace (and activate it if first)
    Add {
        path: PathBuf,
        /// Human-readable name (default: the directory name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Register a remote app server as a workspace
    AddRemote {
        base_url: String,
        /// Directory on the remote side
        #[arg(long)]
        directory: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// List workspaces
    List,
    /// Make a workspace the active one
    Switch { id: String },
    /// Show one workspace
    Info { id: String },
    /// Resolve a workspace's path through the engine
    Path { id: String },
}

/// Daemon autostart can be disabled for scripting and tests.
fn autostart_enabled() -> bool {
    openwork_core::env::flag("DAEMON_AUTOSTART").unwrap_or(true)
}

pub async fn handle(cfg: &RunConfig, args: WorkspaceArgs) -> Result<i32> {
    match args.command {
        WorkspaceCommand::Add { path, name } => add(cfg, path, name).await,
        WorkspaceCommand::AddRemote { base_url, directory, name } => {
            add_remote(cfg, base_url, directory, name).await
        }
        WorkspaceCommand::List => list(cfg).await,
        WorkspaceCommand::Switch { id } => switch(cfg, id).await,
        WorkspaceCommand::Info { id } => info(cfg, id).await,
        WorkspaceCommand::Path { id } => path(cfg, id).await,
    }
}

async fn connect_for_mutation(cfg: &RunConfig) -> Result<Option<DaemonClient>, ClientError> {
    if autostart_enabled() {
        return DaemonClient::connect_or_start(cfg).await.map(Some);
    }
    match DaemonClient::connect(cfg).await {
        Ok(client) => Ok(Some(client)),
        Err(ClientError::NotRunning) => Ok(None),
        Err(e) => Err(e),
    }
}

async fn add(cfg: &RunConfig, path: PathBuf, name: Option<String>) -> Result<i32> {
    let path = if path.is_absolute() { path } else { std::env::current_dir()?.join(path) };

    let workspace = match connect_for_mutation(cfg).await? {
        Some(client) => client.add_workspace(&path, name.as_deref()).await?,
        None => {
            // No live daemon: the CLI owns the state file for this write.
            std::fs::create_dir_all(&path)?;
            let store = StateStore::new(&cfg.data_dir);
            let mut state = store.load();
            let id = state.upsert_workspace(Workspace::local(&path, name));
            store.save(&state)?;
            state.workspace(&id).cloned().ok_or_else(|| anyhow!("workspace vanished"))?
        }
    };

    print_workspace(cfg, &workspace, "added")
}

async fn add_remote(
    cfg: &RunConfig,
    base_url: String,
    directory: Option<String>,
    name: Option<String>,
) -> Result<i32> {
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(anyhow!("baseUrl must be http or https, got {base_url}"));
    }

    let workspace = match connect_for_mutation(cfg).await? {
        Some(client) => {
            client.add_remote_workspace(&base_url, directory.as_deref(), name.as_deref()).await?
        }
        None => {
            let store = StateStore::new(&cfg.data_dir);
            let mut state = store.load();
            let id = state.upsert_workspace(Workspace::remote(&base_url, directory, name));
            store.save(&state)?;
            state.workspace(&id).cloned().ok_or_else(|| anyhow!("workspace vanished"))?
        }
    };

    print_workspace(cfg, &workspace, "added")
}

async fn list(cfg: &RunConfig) -> Result<i32> {
    let (active_id, workspaces) = match DaemonClient::connect(cfg).await {
        Ok(client) => client.list_workspaces().await?,
        Err(ClientError::NotRunning) if !autostart_enabled() => {
            let state = StateStore::new(&cfg.data_dir).load();
            (state.active_id.clone(), state.workspaces)
        }
        Err(ClientError::NotRunning) => {
            let client = DaemonClient::connect_or_start(cfg).await?;
            client.list_workspaces().await?
        }
        Err(e) => return Err(e.into()),
    };

    let obj = serde_json::json!({ "activeId": &active_id, "workspaces": &workspaces });
    format_or_json(cfg.output_format(), &obj, || {
        if workspaces.is_empty() {
            println!("no workspaces; add one with `openwork workspace add <path>`");
            return;
        }
        for ws in &workspaces {
            let marker = if Some(ws.id.as_str()) == active_id.as_deref() { "*" } else { " " };
            let target = match ws.base_url.as_deref() {
                Some(url) => url.to_string(),
                None => ws.path.display().to_string(),
            };
            println!(
                "{marker} {}  {}  {}  (used {} ago)",
                ws.id,
                ws.name,
                target,
                format_age(ws.last_used_at)
            );
        }
    })?;
    Ok(0)
}

async fn switch(cfg: &RunConfig, id: String) -> Result<i32> {
    let workspace = match connect_for_mutation(cfg).await? {
        Some(client) => client.activate_workspace(&id).await?,
        None => {
            let store = StateStore::new(&cfg.data_dir);
            let mut state = store.load();
            if !state.activate(&id) {
                return Err(anyhow!("workspace {id} not found"));
            }
            store.save(&state)?;
            state.workspace(&id).cloned().ok_or_else(|| anyhow!("workspace vanished"))?
        }
    };
    print_workspace(cfg, &workspace, "activated")
}

async fn info(cfg: &RunConfig, id: String) -> Result<i32> {
    let workspace = match DaemonClient::connect(cfg).await {
        Ok(client) => client.get_workspace(&id).await?,
        Err(ClientError::NotRunning) => {
            let state: PersistedState = StateStore::new(&cfg.data_dir).load();
            state.workspace(&id).cloned().ok_or_else(|| anyhow!("workspace {id} not found"))?
        }
        Err(e) => return Err(e.into()),
    };

    format_or_json(cfg.output_format(), &workspace, || {
        println!("id: {}", workspace.id);
        println!("name: {}", workspace.name);
        match workspace.base_url.as_deref() {
            Some(url) => {
                println!("type: remote");
                println!("baseUrl: {url}");
                if let Some(dir) = workspace.directory.as_deref() {
                    println!("directory: {dir}");
                }
            }
            None => {
                println!("type: local");
                println!("path: {}", workspace.path.display());
            }
        }
        println!("created: {}", workspace.created_at.to_rfc3339());
        println!("last used: {}", workspace.last_used_at.to_rfc3339());
    })?;
    Ok(0)
}

async fn path(cfg: &RunConfig, id: String) -> Result<i32> {
    // Path resolution needs the engine, which needs the daemon.
    let client = DaemonClient::connect_or_start(cfg).await?;
    let resolved = client.workspace_path(&id).await?;
    format_or_json(cfg.output_format(), &resolved, || {
        println!("{resolved}");
    })?;
    Ok(0)
}

fn print_workspace(cfg: &RunConfig, workspace: &Workspace, verb: &str) -> Result<i32> {
    format_or_json(cfg.output_format(), workspace, || {
        println!("{verb} {} ({})", workspace.id, workspace.name);
    })?;
    Ok(0)
}
