// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenWork orchestrator CLI.
//!
//! Fronts the engine (`opencode`) and app server (`openwork-server`):
//! resolves version-matched binaries, supervises them as a foreground run
//! or routes workspaces through the long-lived daemon, optionally inside
//! a container sandbox.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod config;
mod daemon_process;
mod exit_error;
mod output;

use clap::{Parser, Subcommand};
use openwork_supervisor::logfmt;

use crate::config::{GlobalArgs, RunConfig};
use crate::exit_error::ExitError;

#[derive(Parser)]
#[command(
    name = "openwork",
    version,
    about = "Supervises the opencode engine and openwork app server"
)]
struct Cli {
    #[command(flatten)]
    globals: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the engine + app-server pair in the foreground
    Start(commands::start::StartArgs),
    /// Like start, with the terminal UI disabled
    Serve(commands::start::StartArgs),
    /// Router daemon management
    Daemon(commands::daemon::DaemonArgs),
    /// Workspace management
    Workspace(commands::workspace::WorkspaceArgs),
    /// Engine instance management
    Instance(commands::instance::InstanceArgs),
    /// Pending approvals (served by the app server)
    Approvals(commands::approvals::ApprovalsArgs),
    /// Orchestrator status
    Status,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let cfg = match RunConfig::from_args(&cli.globals) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    };

    // `daemon run` owns its own (file) logging; everything else logs to
    // stdout in the configured format.
    let is_daemon_run = matches!(
        &cli.command,
        Command::Daemon(args) if matches!(args.command, commands::daemon::DaemonCommand::Run)
    );
    if !is_daemon_run {
        logfmt::init(&cfg.log_options());
    }

    match dispatch(cli.command, &cfg).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let code = e.downcast_ref::<ExitError>().map(|x| x.code).unwrap_or(1);
            if cfg.json {
                eprintln!("{}", serde_json::json!({ "error": format!("{e:#}") }));
            } else {
                eprintln!("error: {e:#}");
            }
            std::process::exit(code);
        }
    }
}

async fn dispatch(command: Command, cfg: &RunConfig) -> anyhow::Result<i32> {
    match command {
        Command::Start(args) => commands::start::start(cfg, &args).await,
        Command::Serve(args) => {
            // The TUI is a desktop-shell concern; serve is start without it.
            commands::start::start(cfg, &args).await
        }
        Command::Daemon(args) => commands::daemon::handle(cfg, args).await,
        Command::Workspace(args) => commands::workspace::handle(cfg, args).await,
        Command::Instance(args) => commands::instance::handle(cfg, args).await,
        Command::Approvals(args) => commands::approvals::handle(cfg, args).await,
        Command::Status => commands::status::handle(cfg).await,
    }
}
