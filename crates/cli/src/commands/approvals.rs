// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `openwork approvals` - pending approvals, proxied to the app server.
//!
//! The approval workflow itself lives in the app server; these commands
//! only mirror its HTTP semantics, so the exit code follows the
//! response status.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use serde_json::Value;

use crate::config::RunConfig;
use crate::exit_error::ExitError;
use crate::output::format_or_json;

#[derive(Debug, Args)]
pub struct ApprovalsArgs {
    #[command(subcommand)]
    pub command: ApprovalsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ApprovalsCommand {
    /// List pending approvals
    List,
    /// Reply to a pending approval
    Reply {
        id: String,
        /// Approve the request
        #[arg(long, conflicts_with = "deny")]
        approve: bool,
        /// Deny the request
        #[arg(long)]
        deny: bool,
    },
}

pub async fn handle(cfg: &RunConfig, args: ApprovalsArgs) -> Result<i32> {
    let base = cfg.server_base_url();
    let client = reqwest::Client::new();

    match args.command {
        ApprovalsCommand::List => {
            let mut request = client.get(format!("{base}/approvals"));
            if let Some(token) = &cfg.server_token {
                request = request.bearer_auth(token);
            }
            let resp = request.send().await?;
            let status = resp.status();
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            if !status.is_success() {
                return Err(ExitError::new(1, format!("app server answered {status}")).into());
            }
            format_or_json(cfg.output_format(), &body, || match body.as_array() {
                Some(items) if items.is_empty() => println!("no pending approvals"),
                Some(items) => {
                    for item in items {
                        println!(
                            "{}  {}",
                            item["id"].as_str().unwrap_or("?"),
                            item["summary"].as_str().unwrap_or("")
                        );
                    }
                }
                None => println!("{body}"),
            })?;
            Ok(0)
        }
        ApprovalsCommand::Reply { id, approve, deny } => {
            if approve == deny {
                return Err(anyhow!("pass exactly one of --approve or --deny"));
            }
            let decision = if approve { "approve" } else { "deny" };
            let mut request = client
                .post(format!("{base}/approvals/{id}"))
                .json(&serde_json::json!({ "decision": decision }));
            if let Some(token) = &cfg.server_token {
                request = request.bearer_auth(token);
            }
            let resp = request.send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(ExitError::new(1, format!("app server answered {status}")).into());
            }
            let obj = serde_json::json!({ "id": &id, "decision": decision, "ok": true });
            format_or_json(cfg.output_format(), &obj, || {
                println!("{decision} sent for {id}");
            })?;
            Ok(0)
        }
    }
}
