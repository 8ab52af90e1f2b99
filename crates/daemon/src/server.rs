// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and serve loop.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use openwork_core::{Diagnostics, ServiceRecord};
use openwork_storage::{clear_stale_services, Liveness, StateStore, STALE_PROBE_TIMEOUT};
use openwork_supervisor::health::probe_ok;
use openwork_supervisor::process::process_alive;
use parking_lot::Mutex;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info};

use crate::engine::{EngineManager, ProcessLauncher};
use crate::router::{router, DaemonCtx};
use crate::{lifecycle, DaemonConfig, DaemonError};

/// Run the daemon until shutdown. This is the body of
/// `openwork daemon run`.
pub async fn run(cfg: DaemonConfig) -> Result<(), DaemonError> {
    std::fs::create_dir_all(&cfg.data_dir)?;
    let lock = lifecycle::acquire_lock(&cfg)?;
    lifecycle::rotate_log_if_needed(&cfg.log_path());
    lifecycle::write_startup_marker(&cfg)?;
    let log_guard = lifecycle::setup_logging(&cfg)?;

    info!("starting router daemon (run id {})", cfg.run_id);
    match run_inner(&cfg).await {
        Ok(()) => {
            lifecycle::release_lock(&cfg);
            info!("daemon stopped");
            drop(log_guard);
            drop(lock);
            Ok(())
        }
        Err(e) => {
            lifecycle::write_startup_error(&cfg, &e);
            error!("failed to start daemon: {e}");
            lifecycle::release_lock(&cfg);
            drop(log_guard);
            drop(lock);
            Err(e)
        }
    }
}

async fn run_inner(cfg: &DaemonConfig) -> Result<(), DaemonError> {
    let store = StateStore::new(&cfg.data_dir);
    let mut state = store.load();

    // Resolve any stale records left by a crashed daemon before serving.
    let client = reqwest::Client::new();
    let daemon_liveness = service_liveness(&client, state.daemon.as_ref()).await;
    let engine_liveness = service_liveness(&client, state.engine.as_ref()).await;
    if clear_stale_services(&mut state, daemon_liveness, engine_liveness) {
        store.save(&state)?;
        info!("cleared stale service records from state");
    }

    // Preferred port first; fall back to an OS-assigned one.
    let listener = match tokio::net::TcpListener::bind((cfg.host.as_str(), cfg.port)).await {
        Ok(listener) => listener,
        Err(_) => tokio::net::TcpListener::bind((cfg.host.as_str(), 0)).await?,
    };
    let port = listener.local_addr()?.port();
    let base_url = format!("http://{}:{}", cfg.host, port);

    let shutdown = Arc::new(Notify::new());
    let diagnostics = Arc::new(Mutex::new(Diagnostics::default()));
    let launcher = ProcessLauncher::new(
        cfg.resolver.clone(),
        cfg.engine_host.clone(),
        cfg.engine_cors.clone(),
        cfg.engine_auth.clone(),
        cfg.run_id.clone(),
        Arc::clone(&diagnostics),
    );
    let ctx = Arc::new(DaemonCtx {
        cfg: cfg.clone(),
        store: store.clone(),
        state: Mutex::new(state),
        engine: EngineManager::new(Arc::new(launcher), cfg.engine_host.clone(), cfg.engine_port),
        client: client.clone(),
        diagnostics,
        start_time: Instant::now(),
        shutdown: Arc::clone(&shutdown),
    });

    let serve_shutdown = Arc::clone(&shutdown);
    let app = router(Arc::clone(&ctx));
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { serve_shutdown.notified().await })
            .await;
        if let Err(e) = result {
            error!("control plane stopped with error: {e}");
        }
    });

    // The daemon record is written only once our own health answers.
    let health_url = format!("{base_url}/health");
    openwork_supervisor::health::wait_for_healthy(
        &client,
        &health_url,
        openwork_supervisor::health::DEFAULT_TIMEOUT,
        openwork_supervisor::health::DEFAULT_POLL,
    )
    .await?;
    {
        let mut guard = ctx.state.lock();
        guard.daemon = Some(ServiceRecord {
            pid: std::process::id(),
            port,
            base_url: base_url.clone(),
            started_at: Utc::now(),
        });
        guard.cli_version = Some(env!("CARGO_PKG_VERSION").to_string());
        ctx.store.save(&guard)?;
    }
    info!("daemon ready, listening on {base_url}");

    // Signal readiness for a parent waiting on stdout.
    println!("READY {base_url}");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = shutdown.notified() => info!("shutdown requested via control plane"),
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }
    shutdown.notify_waiters();
    let _ = server.await;

    // Clear our record; the engine record stays so the next daemon can
    // re-adopt the running engine.
    {
        let mut guard = ctx.state.lock();
        guard.daemon = None;
        ctx.store.save(&guard)?;
    }
    Ok(())
}

async fn service_liveness(
    client: &reqwest::Client,
    record: Option<&ServiceRecord>,
) -> Option<Liveness> {
    let record = record?;
    let pid_alive = process_alive(record.pid);
    let health_ok = pid_alive
        && probe_ok(client, &format!("{}/health", record.base_url), STALE_PROBE_TIMEOUT).await;
    Some(Liveness { pid_alive, health_ok })
}
