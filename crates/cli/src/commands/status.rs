// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `openwork status` - one-shot view of daemon, engine and workspaces.

use anyhow::Result;
use openwork_storage::{StateStore, STALE_PROBE_TIMEOUT};
use openwork_supervisor::health::probe_ok;
use openwork_supervisor::process::process_alive;

use crate::config::RunConfig;
use crate::output::{format_age, format_or_json};

pub async fn handle(cfg: &RunConfig) -> Result<i32> {
    let state = StateStore::new(&cfg.data_dir).load();
    let client = reqwest::Client::new();

    let daemon_live = match &state.daemon {
        Some(record) => {
            process_alive(record.pid)
                && probe_ok(&client, &format!("{}/health", record.base_url), STALE_PROBE_TIMEOUT)
                    .await
        }
        None => false,
    };
    let engine_live = match &state.engine {
        Some(record) => {
            process_alive(record.pid)
                && probe_ok(&client, &format!("{}/health", record.base_url), STALE_PROBE_TIMEOUT)
                    .await
        }
        None => false,
    };

    let obj = serde_json::json!({
        "dataDir": cfg.data_dir,
        "daemon": if daemon_live { state.daemon.clone() } else { None },
        "engine": if engine_live { state.engine.clone() } else { None },
        "activeId": &state.active_id,
        "workspaceCount": state.workspaces.len(),
        "cliVersion": env!("CARGO_PKG_VERSION"),
    });

    format_or_json(cfg.output_format(), &obj, || {
        println!("data dir: {}", cfg.data_dir.display());
        match (&state.daemon, daemon_live) {
            (Some(record), true) => {
                println!(
                    "daemon: running (pid {}, {}, up since {} ago)",
                    record.pid,
                    record.base_url,
                    format_age(record.started_at)
                );
            }
            _ => println!("daemon: not running"),
        }
        match (&state.engine, engine_live) {
            (Some(record), true) => {
                println!("engine: running (pid {}, port {})", record.pid, record.port);
            }
            _ => println!("engine: not running"),
        }
        match &state.active_id {
            Some(id) => println!("active workspace: {id}"),
            None => println!("active workspace: none"),
        }
        println!("workspaces: {}", state.workspaces.len());
    })?;
    Ok(0)
}
