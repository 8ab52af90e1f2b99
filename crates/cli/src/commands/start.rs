// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `openwork start` - foreground supervision of the sidecar pair.
//!
//! Ordering contract: the engine must answer `/health` before the app
//! server is spawned, and the app server must answer before the run is
//! declared ready. In sandbox mode the container must be running before
//! the app-server probe begins, and the engine is gated last, through the
//! app server's reverse proxy.

use std::sync::Arc;

use anyhow::{Context, Result};
use openwork_core::local_workspace_id;
use openwork_core::Workspace;
use openwork_resolver::{ResolvedBinary, Resolver, APP_SERVER_BIN, ENGINE_BIN};
use openwork_sandbox::{
    allowlist_path, cleanup_staging, load_allowlist, probe_mode, stage_runtime, validate_mount,
    ContainerCli, EntrypointConfig, SandboxLaunch, SandboxRunner, ENGINE_INTERNAL_PORT,
};
use openwork_supervisor::child::{ChildSpec, Supervisor};
use openwork_supervisor::health::{wait_for_healthy, DEFAULT_POLL, EXTENDED_TIMEOUT};
use openwork_supervisor::logfmt::LogFormat;
use openwork_supervisor::run::supervise_until_shutdown;
use openwork_supervisor::{port, ChildExit};
use tokio::sync::mpsc;
use tracing::info;

use crate::config::RunConfig;

#[derive(Debug, clap::Args)]
pub struct StartArgs {
    /// Release the children once healthy and return to the shell
    #[arg(long)]
    pub detach: bool,
}

/// What a successful bring-up produced.
struct ReadyInfo {
    engine_port: u16,
    server_port: u16,
    token: String,
    engine: ResolvedBinary,
    server: ResolvedBinary,
}

pub async fn start(cfg: &RunConfig, args: &StartArgs) -> Result<i32> {
    let sandbox_cli = probe_mode(cfg.sandbox_mode).await?;
    let json_logs = cfg.log_format == LogFormat::Json;
    let (supervisor, exits) = Supervisor::new(&cfg.run_id, json_logs);

    let ready = match sandbox_cli {
        None => host_start(cfg, &supervisor).await,
        Some(cli) => sandbox_start(cfg, cli, &supervisor).await,
    };

    match ready {
        Ok(ready) => {
            emit_ready(cfg, &ready);
            finish(cfg, args, supervisor, exits).await
        }
        Err(e) => {
            supervisor.shutdown_all().await;
            Err(e)
        }
    }
}

/// Unsandboxed path: both sidecars as direct children.
async fn host_start(cfg: &RunConfig, supervisor: &Arc<Supervisor>) -> Result<ReadyInfo> {
    std::fs::create_dir_all(&cfg.workspace)?;
    let client = reqwest::Client::new();

    let engine = Resolver::new(cfg.resolver_config(false, cfg.engine_bin.clone()))
        .resolve(ENGINE_BIN)
        .await?;
    let server = Resolver::new(cfg.resolver_config(false, cfg.server_bin.clone()))
        .resolve(APP_SERVER_BIN)
        .await?;

    // Engine first; the app server is only spawned once it answers.
    let engine_port = port::allocate(&cfg.engine_host, cfg.engine_port)?;
    let engine_url = format!("http://{}:{}", cfg.engine_host, engine_port);
    let mut engine_spec = ChildSpec::new("engine", &engine.path)
        .arg("serve")
        .arg("--hostname")
        .arg(&cfg.engine_host)
        .arg("--port")
        .arg(engine_port.to_string())
        .cwd(cfg.engine_workdir.clone().unwrap_or_else(|| cfg.workspace.clone()));
    for origin in &cfg.cors {
        engine_spec = engine_spec.arg("--cors").arg(origin);
    }
    if let Some(auth) = &cfg.engine_auth {
        engine_spec = engine_spec.env("OPENCODE_AUTH", auth);
    }
    supervisor.start(engine_spec)?;
    wait_for_healthy(&client, &format!("{engine_url}/health"), cfg.health_timeout, DEFAULT_POLL)
        .await
        .context("engine failed to become healthy")?;

    let server_port = port::allocate(&cfg.server_host, cfg.server_port)?;
    let server_url = format!("http://{}:{}", cfg.server_host, server_port);
    let token = run_token(cfg);
    let mut server_spec = ChildSpec::new("app-server", &server.path)
        .arg("--host")
        .arg(&cfg.server_host)
        .arg("--port")
        .arg(server_port.to_string())
        .arg("--workspace")
        .arg(cfg.workspace.display().to_string())
        .arg("--token")
        .arg(&token)
        .arg("--approval-mode")
        .arg(cfg.approval_mode.as_str())
        .arg("--approval-timeout")
        .arg(cfg.approval_timeout.to_string())
        .arg("--engine-url")
        .arg(&engine_url);
    if let Some(host_token) = &cfg.server_host_token {
        server_spec = server_spec.arg("--host-token").arg(host_token);
    }
    if cfg.read_only {
        server_spec = server_spec.arg("--read-only");
    }
    for origin in &cfg.cors {
        server_spec = server_spec.arg("--cors").arg(origin);
    }
    if let Some(auth) = &cfg.engine_auth {
        server_spec = server_spec.env("OPENCODE_AUTH", auth);
    }
    supervisor.start(server_spec)?;
    wait_for_healthy(&client, &format!("{server_url}/health"), cfg.health_timeout, DEFAULT_POLL)
        .await
        .context("app server failed to become healthy")?;

    Ok(ReadyInfo { engine_port, server_port, token, engine, server })
}

/// Sandboxed path: the pair runs inside one container; only the app
/// server's port is published.
async fn sandbox_start(
    cfg: &RunConfig,
    cli: ContainerCli,
    supervisor: &Arc<Supervisor>,
) -> Result<ReadyInfo> {
    // Mount policy first: a rejected mount must fail before any network
    // or staging work happens.
    let allowlist_location = allowlist_path(cfg.sandbox_allowlist.as_deref());
    let allowlist = load_allowlist(&allowlist_location)?;
    let mut extra_mounts = Vec::with_capacity(cfg.sandbox_mounts.len());
    for raw in &cfg.sandbox_mounts {
        extra_mounts.push(validate_mount(raw, allowlist.as_ref(), &allowlist_location)?);
    }

    std::fs::create_dir_all(&cfg.workspace)?;
    let client = reqwest::Client::new();

    // Binaries for the container: always the Linux triple.
    let engine = Resolver::new(cfg.resolver_config(true, cfg.engine_bin.clone()))
        .resolve(ENGINE_BIN)
        .await?;
    let server = Resolver::new(cfg.resolver_config(true, cfg.server_bin.clone()))
        .resolve(APP_SERVER_BIN)
        .await?;

    let ws_id = local_workspace_id(&cfg.workspace);
    let container_name = format!("openwork-{ws_id}");
    let persist_root = cfg.sandbox_persist_dir.clone();
    let ws_persist = persist_root.join("persist").join(&ws_id);
    std::fs::create_dir_all(&ws_persist)?;
    let engine_config_dir = openwork_daemon::seed_engine_config(
        &cfg.data_dir,
        &Workspace::local(&cfg.workspace, None),
    )?;

    let token = run_token(cfg);
    let mut server_args = vec![
        "--token".to_string(),
        token.clone(),
        "--approval-mode".to_string(),
        cfg.approval_mode.as_str().to_string(),
        "--approval-timeout".to_string(),
        cfg.approval_timeout.to_string(),
    ];
    if let Some(host_token) = &cfg.server_host_token {
        server_args.push("--host-token".to_string());
        server_args.push(host_token.clone());
    }
    if cfg.read_only {
        server_args.push("--read-only".to_string());
    }
    for origin in &cfg.cors {
        server_args.push("--cors".to_string());
        server_args.push(origin.clone());
    }

    let staged = stage_runtime(
        &persist_root,
        &ws_id,
        &engine.path,
        &server.path,
        &EntrypointConfig { server_args, engine_auth: cfg.engine_auth.clone() },
    )?;

    let published_port = port::allocate(&cfg.server_host, cfg.server_port)?;
    let launch = SandboxLaunch {
        image: cfg.sandbox_image.clone(),
        container_name: container_name.clone(),
        workspace: cfg.workspace.clone(),
        persist_dir: ws_persist,
        engine_config_dir,
        staged: staged.clone(),
        extra_mounts,
        published_port,
    };
    let runner = SandboxRunner::new(cli);

    // Cleanup hook runs once at shutdown fan-out. Detached runs never
    // fan out, which is exactly the spec'd behavior: container and
    // staging stay behind for inspection.
    {
        let name = container_name.clone();
        let staged = staged.clone();
        let runtime_cmd = cli.command();
        supervisor.set_cleanup(Box::new(move || {
            let _ = std::process::Command::new(runtime_cmd).args(["rm", "-f", &name]).output();
            cleanup_staging(&staged);
        }));
    }

    let spec = ChildSpec::new("sandbox", cli.command()).args(runner.run_args(&launch));
    supervisor.start(spec)?;

    runner.wait_running(&container_name).await?;
    // Container bootstrap (image pull, cold engine start) is a long boot;
    // the gate gets the extended budget unless the user asked for more.
    let gate_timeout = cfg.health_timeout.max(EXTENDED_TIMEOUT);
    let server_url = format!("http://{}:{}", cfg.server_host, published_port);
    runner.health_gate(&client, &server_url, gate_timeout).await?;

    Ok(ReadyInfo {
        engine_port: ENGINE_INTERNAL_PORT,
        server_port: published_port,
        token,
        engine,
        server,
    })
}

/// The app-server API token for this run: configured, else minted.
fn run_token(cfg: &RunConfig) -> String {
    cfg.server_token
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string())
}

/// The ready event: in json mode this is the machine-readable line the
/// desktop shell (or a script) picks the ports and token out of.
fn emit_ready(cfg: &RunConfig, ready: &ReadyInfo) {
    let connect_url = cfg
        .connect_host
        .as_ref()
        .map(|host| format!("http://{host}:{}", ready.server_port))
        .unwrap_or_default();
    info!(
        component = "orchestrator",
        opencode.port = ready.engine_port,
        openwork.port = ready.server_port,
        openwork.token = ready.token.as_str(),
        connect.url = connect_url.as_str(),
        diagnostics.binaries.opencode.source = source_str(&ready.engine),
        diagnostics.binaries.opencode.expectedVersion =
            ready.engine.expected_version.as_deref().unwrap_or(""),
        diagnostics.binaries.opencode.actualVersion =
            ready.engine.actual_version.as_deref().unwrap_or(""),
        diagnostics.binaries.openwork_server.actualVersion =
            ready.server.actual_version.as_deref().unwrap_or(""),
        "run ready"
    );
}

fn source_str(binary: &ResolvedBinary) -> &'static str {
    match binary.source {
        openwork_core::state::BinaryProvenance::Bundled => "bundled",
        openwork_core::state::BinaryProvenance::Downloaded => "downloaded",
        openwork_core::state::BinaryProvenance::External => "external",
    }
}

/// Detach or supervise to completion.
async fn finish(
    cfg: &RunConfig,
    args: &StartArgs,
    supervisor: Arc<Supervisor>,
    exits: mpsc::UnboundedReceiver<ChildExit>,
) -> Result<i32> {
    if args.detach {
        let children = supervisor.detach();
        if cfg.json {
            let summary: Vec<_> = children
                .iter()
                .map(|(name, pid)| serde_json::json!({ "name": name, "pid": pid }))
                .collect();
            println!("{}", serde_json::json!({ "detached": true, "children": summary }));
        } else {
            for (name, pid) in &children {
                println!("{name} running (pid {pid})");
            }
            println!("detached; children keep running");
        }
        return Ok(0);
    }

    let outcome = supervise_until_shutdown(supervisor, exits).await?;
    Ok(outcome.exit_code)
}
