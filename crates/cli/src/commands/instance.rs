// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `openwork instance` - engine instance management.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::config::RunConfig;
use crate::output::format_or_json;

#[derive(Debug, Args)]
pub struct InstanceArgs {
    #[command(subcommand)]
    pub command: InstanceCommand,
}

#[derive(Debug, Subcommand)]
pub enum InstanceCommand {
    /// Ask the engine to drop in-memory state for a workspace
    Dispose { id: String },
}

pub async fn handle(cfg: &RunConfig, args: InstanceArgs) -> Result<i32> {
    match args.command {
        InstanceCommand::Dispose { id } => {
            let client = DaemonClient::connect_or_start(cfg).await?;
            let result = client.dispose_instance(&id).await?;
            format_or_json(cfg.output_format(), &result, || {
                if result["disposed"].as_bool().unwrap_or(false) {
                    println!("instance disposed for workspace {id}");
                } else {
                    println!("nothing to dispose for workspace {id}");
                }
            })?;
            Ok(0)
        }
    }
}
