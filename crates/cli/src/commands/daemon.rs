// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `openwork daemon` - router daemon management.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use openwork_supervisor::process::process_alive;

use crate::client::{recorded_daemon_pid, ClientError, DaemonClient};
use crate::config::RunConfig;
use crate::output::format_or_json;

/// Budget for the daemon process to disappear after `/shutdown`.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Debug, Subcommand)]
pub enum DaemonCommand {
    /// Run the daemon in the foreground (normally spawned by the CLI)
    Run,
    /// Start a daemon in the background if none is live
    Start,
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
}

pub async fn handle(cfg: &RunConfig, args: DaemonArgs) -> Result<i32> {
    match args.command {
        DaemonCommand::Run => {
            openwork_daemon::run(cfg.daemon_config()).await?;
            Ok(0)
        }
        DaemonCommand::Start => start(cfg).await,
        DaemonCommand::Stop => stop(cfg).await,
        DaemonCommand::Status => status(cfg).await,
    }
}

async fn start(cfg: &RunConfig) -> Result<i32> {
    if let Ok(client) = DaemonClient::connect(cfg).await {
        let health = client.health().await?;
        format_or_json(cfg.output_format(), &health, || {
            println!("daemon already running at {}", client.base_url());
        })?;
        return Ok(0);
    }

    let client = DaemonClient::connect_or_start(cfg).await?;
    let health = client.health().await?;
    format_or_json(cfg.output_format(), &health, || {
        println!("daemon started at {}", client.base_url());
    })?;
    Ok(0)
}

async fn stop(cfg: &RunConfig) -> Result<i32> {
    let pid = recorded_daemon_pid(&cfg.data_dir);
    let client = match DaemonClient::connect(cfg).await {
        Ok(client) => client,
        Err(ClientError::NotRunning) => {
            format_or_json(cfg.output_format(), &serde_json::json!({ "status": "not_running" }), || {
                println!("daemon not running");
            })?;
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    };

    client.shutdown().await?;
    if let Some(pid) = pid {
        let deadline = Instant::now() + STOP_TIMEOUT;
        while Instant::now() < deadline && process_alive(pid) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        if process_alive(pid) {
            return Err(anyhow!("daemon (pid {pid}) did not exit after shutdown"));
        }
    }

    format_or_json(cfg.output_format(), &serde_json::json!({ "status": "stopped" }), || {
        println!("daemon stopped");
    })?;
    Ok(0)
}

async fn status(cfg: &RunConfig) -> Result<i32> {
    match DaemonClient::connect(cfg).await {
        Ok(client) => {
            let health = client.health().await?;
            format_or_json(cfg.output_format(), &health, || {
                println!("status: running");
                println!("url: {}", client.base_url());
                if let Some(active) = health["activeId"].as_str() {
                    println!("active workspace: {active}");
                }
                println!(
                    "workspaces: {}",
                    health["workspaceCount"].as_u64().unwrap_or(0)
                );
                match health["engine"].is_object() {
                    true => println!(
                        "engine: running (pid {}, port {})",
                        health["engine"]["pid"], health["engine"]["port"]
                    ),
                    false => println!("engine: not running"),
                }
            })?;
            Ok(0)
        }
        Err(ClientError::NotRunning) => {
            format_or_json(cfg.output_format(), &serde_json::json!({ "status": "not_running" }), || {
                println!("daemon not running");
            })?;
            Ok(0)
        }
        Err(e) => Err(e.into()),
    }
}
