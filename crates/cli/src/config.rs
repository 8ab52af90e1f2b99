// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration assembly.
//!
//! Precedence per value: command-line flag > `OPENWORK_*` environment >
//! legacy `OPENCODE_STUDIO_*` environment (one-time deprecation warning)
//! > built-in default. Unknown environment keys are ignored.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use openwork_core::env;
use openwork_daemon::config::{DEFAULT_DAEMON_PORT, DEFAULT_ENGINE_PORT};
use openwork_daemon::DaemonConfig;
use openwork_resolver::{ResolverConfig, SourcePreference};
use openwork_sandbox::SandboxMode;
use openwork_supervisor::logfmt::{stdout_is_tty, LogFormat, LogOptions};

/// Default app-server port preference.
pub const DEFAULT_SERVER_PORT: u16 = 8100;

/// Default sidecar release host.
pub const DEFAULT_SIDECAR_BASE_URL: &str = "https://releases.openwork.sh";

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum ApprovalMode {
    Auto,
    #[default]
    Prompt,
}

impl ApprovalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Prompt => "prompt",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Global flags shared by every verb.
#[derive(Debug, Args, Default)]
pub struct GlobalArgs {
    /// Workspace directory the engine acts over
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// State root (default: ~/.local/state/openwork)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Router daemon bind host
    #[arg(long, global = true)]
    pub daemon_host: Option<String>,

    /// Router daemon preferred port
    #[arg(long, global = true)]
    pub daemon_port: Option<u16>,

    /// Explicit engine binary (requires --allow-external)
    #[arg(long, global = true)]
    pub opencode_bin: Option<PathBuf>,

    /// Engine bind host
    #[arg(long, global = true)]
    pub opencode_host: Option<String>,

    /// Engine preferred port
    #[arg(long, global = true)]
    pub opencode_port: Option<u16>,

    /// Engine working directory (default: the workspace)
    #[arg(long, global = true)]
    pub opencode_workdir: Option<PathBuf>,

    /// Engine basic-auth credentials, user:pass
    #[arg(long, global = true)]
    pub opencode_auth: Option<String>,

    /// Explicit app-server binary (requires --allow-external)
    #[arg(long, global = true)]
    pub openwork_bin: Option<PathBuf>,

    /// App-server bind host
    #[arg(long, global = true)]
    pub openwork_host: Option<String>,

    /// App-server preferred port
    #[arg(long, global = true)]
    pub openwork_port: Option<u16>,

    /// App-server API token (default: generated per run)
    #[arg(long, global = true)]
    pub openwork_token: Option<String>,

    /// Token reserved for host-originated requests
    #[arg(long, global = true)]
    pub openwork_host_token: Option<String>,

    /// Approval mode for engine actions
    #[arg(long, global = true, value_enum)]
    pub approval_mode: Option<ApprovalMode>,

    /// Approval timeout in seconds
    #[arg(long, global = true)]
    pub approval_timeout: Option<u64>,

    /// Health-gate timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Refuse write operations in the app server
    #[arg(long, global = true)]
    pub read_only: bool,

    /// Additional CORS origin (repeatable)
    #[arg(long = "cors", global = true)]
    pub cors: Vec<String>,

    /// Hostname to advertise in the LAN connect URL
    #[arg(long, global = true)]
    pub connect_host: Option<String>,

    /// Sidecar source preference: auto, bundled, downloaded, external
    #[arg(long, global = true)]
    pub sidecar_source: Option<String>,

    /// Base URL for sidecar asset downloads
    #[arg(long, global = true)]
    pub sidecar_base_url: Option<String>,

    /// Remote sidecar manifest URL
    #[arg(long, global = true)]
    pub sidecar_manifest: Option<String>,

    /// Permit external (user-supplied) sidecar binaries
    #[arg(long, global = true)]
    pub allow_external: bool,

    /// Sandbox mode: none, auto, docker, container
    #[arg(long = "sandbox", global = true)]
    pub sandbox_mode: Option<String>,

    /// Container image for the sandbox
    #[arg(long, global = true)]
    pub sandbox_image: Option<String>,

    /// Persist directory mounted into the sandbox
    #[arg(long, global = true)]
    pub sandbox_persist_dir: Option<PathBuf>,

    /// Extra sandbox mount, hostPath:containerSubPath[:ro|rw] (repeatable)
    #[arg(long = "sandbox-mount", global = true)]
    pub sandbox_mounts: Vec<String>,

    /// Mount allowlist location override
    #[arg(long, global = true)]
    pub sandbox_allowlist: Option<PathBuf>,

    /// JSON command output
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose (debug-level) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormatArg>,

    /// Colorize pretty logs
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorMode>,

    /// Run id for log correlation (default: generated UUID)
    #[arg(long, global = true)]
    pub run_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

/// Fully resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_dir: PathBuf,
    pub workspace: PathBuf,
    pub daemon_host: String,
    pub daemon_port: u16,

    pub engine_bin: Option<PathBuf>,
    pub engine_host: String,
    pub engine_port: u16,
    pub engine_workdir: Option<PathBuf>,
    pub engine_auth: Option<String>,

    pub server_bin: Option<PathBuf>,
    pub server_host: String,
    pub server_port: u16,
    pub server_token: Option<String>,
    pub server_host_token: Option<String>,

    pub approval_mode: ApprovalMode,
    pub approval_timeout: u64,
    pub health_timeout: Duration,
    pub read_only: bool,
    pub cors: Vec<String>,
    pub connect_host: Option<String>,

    pub sidecar_source: SourcePreference,
    pub sidecar_base_url: String,
    pub sidecar_manifest: String,
    pub allow_external: bool,

    pub sandbox_mode: SandboxMode,
    pub sandbox_image: String,
    pub sandbox_persist_dir: PathBuf,
    pub sandbox_mounts: Vec<String>,
    pub sandbox_allowlist: Option<PathBuf>,

    pub json: bool,
    pub verbose: bool,
    pub log_format: LogFormat,
    pub color: bool,
    pub run_id: String,
}

impl RunConfig {
    pub fn from_args(args: &GlobalArgs) -> Result<Self> {
        let data_dir = match &args.data_dir {
            Some(dir) => dir.clone(),
            None => env::data_dir().context("could not determine data dir")?,
        };
        let workspace = match &args.workspace {
            Some(ws) => ws.clone(),
            None => match env::var("WORKSPACE") {
                Some(ws) => PathBuf::from(ws),
                None => std::env::current_dir()?,
            },
        };

        let sidecar_source = resolve_parsed(
            args.sidecar_source.as_deref(),
            "SIDECAR_SOURCE",
            SourcePreference::Auto,
        )?;
        let sandbox_mode =
            resolve_parsed(args.sandbox_mode.as_deref(), "SANDBOX", SandboxMode::None)?;
        let log_format = match args.log_format {
            Some(LogFormatArg::Pretty) => LogFormat::Pretty,
            Some(LogFormatArg::Json) => LogFormat::Json,
            None => resolve_parsed(None, "LOG_FORMAT", LogFormat::Pretty)?,
        };

        let color_mode = args.color.unwrap_or_else(|| match env::var("COLOR").as_deref() {
            Some("always") => ColorMode::Always,
            Some("never") => ColorMode::Never,
            _ => ColorMode::Auto,
        });
        let color = match color_mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => stdout_is_tty(),
        };

        let sidecar_base_url = args
            .sidecar_base_url
            .clone()
            .or_else(|| env::var("SIDECAR_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_SIDECAR_BASE_URL.to_string());
        let sidecar_manifest = args
            .sidecar_manifest
            .clone()
            .or_else(|| env::var("SIDECAR_MANIFEST"))
            .unwrap_or_else(|| format!("{}/manifest.json", sidecar_base_url.trim_end_matches('/')));

        Ok(Self {
            workspace,
            daemon_host: args
                .daemon_host
                .clone()
                .or_else(|| env::var("DAEMON_HOST"))
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            daemon_port: args
                .daemon_port
                .or_else(|| env::var_parsed("DAEMON_PORT"))
                .unwrap_or(DEFAULT_DAEMON_PORT),

            engine_bin: args.opencode_bin.clone(),
            engine_host: args
                .opencode_host
                .clone()
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            engine_port: args
                .opencode_port
                .or_else(|| env::var_parsed("ENGINE_PORT"))
                .unwrap_or(DEFAULT_ENGINE_PORT),
            engine_workdir: args.opencode_workdir.clone(),
            engine_auth: args.opencode_auth.clone().or_else(|| env::var("ENGINE_AUTH")),

            server_bin: args.openwork_bin.clone(),
            server_host: args
                .openwork_host
                .clone()
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            server_port: args
                .openwork_port
                .or_else(|| env::var_parsed("SERVER_PORT"))
                .unwrap_or(DEFAULT_SERVER_PORT),
            server_token: args.openwork_token.clone().or_else(|| env::var("TOKEN")),
            server_host_token: args
                .openwork_host_token
                .clone()
                .or_else(|| env::var("HOST_TOKEN")),

            approval_mode: args.approval_mode.unwrap_or_else(|| {
                match env::var("APPROVAL_MODE").as_deref() {
                    Some("auto") => ApprovalMode::Auto,
                    _ => ApprovalMode::Prompt,
                }
            }),
            approval_timeout: args
                .approval_timeout
                .or_else(|| env::var_parsed("APPROVAL_TIMEOUT"))
                .unwrap_or(120),
            health_timeout: Duration::from_secs(args.timeout.unwrap_or(10)),
            read_only: args.read_only,
            cors: if args.cors.is_empty() {
                env::var("CORS")
                    .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect())
                    .unwrap_or_default()
            } else {
                args.cors.clone()
            },
            connect_host: args.connect_host.clone(),

            sidecar_source,
            sidecar_base_url,
            sidecar_manifest,
            allow_external: args.allow_external || env::flag("ALLOW_EXTERNAL").unwrap_or(false),

            sandbox_mode,
            sandbox_image: args
                .sandbox_image
                .clone()
                .or_else(|| env::var("SANDBOX_IMAGE"))
                .unwrap_or_else(|| "ghcr.io/openwork/sandbox:latest".to_string()),
            sandbox_persist_dir: args
                .sandbox_persist_dir
                .clone()
                .or_else(|| env::var("SANDBOX_PERSIST_DIR").map(PathBuf::from))
                .unwrap_or_else(|| data_dir.clone()),
            sandbox_mounts: args.sandbox_mounts.clone(),
            sandbox_allowlist: args.sandbox_allowlist.clone(),

            json: args.json,
            verbose: args.verbose || env::flag("VERBOSE").unwrap_or(false),
            log_format,
            color,
            run_id: args
                .run_id
                .clone()
                .or_else(|| env::var("RUN_ID"))
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),

            data_dir,
        })
    }

    /// Resolver configuration for engine/app-server lookup.
    pub fn resolver_config(&self, sandbox: bool, override_path: Option<PathBuf>) -> ResolverConfig {
        ResolverConfig {
            source: self.sidecar_source,
            allow_external: self.allow_external,
            cache_dir: openwork_core::env::var("SIDECAR_CACHE")
                .map(PathBuf::from)
                .unwrap_or_else(|| self.data_dir.join("sidecars")),
            base_url: self.sidecar_base_url.clone(),
            manifest_url: self.sidecar_manifest.clone(),
            sandbox,
            override_path,
        }
    }

    /// Configuration for a daemon process sharing this invocation's flags.
    pub fn daemon_config(&self) -> DaemonConfig {
        DaemonConfig {
            data_dir: self.data_dir.clone(),
            host: self.daemon_host.clone(),
            port: self.daemon_port,
            engine_host: self.engine_host.clone(),
            engine_port: self.engine_port,
            engine_cors: self.cors.clone(),
            engine_auth: self.engine_auth.clone(),
            resolver: self.resolver_config(false, self.engine_bin.clone()),
            run_id: self.run_id.clone(),
        }
    }

    /// Preferred daemon base URL (the record in the state file wins when
    /// a daemon is already running).
    pub fn daemon_base_url(&self) -> String {
        format!("http://{}:{}", self.daemon_host, self.daemon_port)
    }

    /// App-server base URL assembled from this invocation's flags.
    pub fn server_base_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }

    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            format: self.log_format,
            color: self.color,
            run_id: self.run_id.clone(),
            verbose: self.verbose,
        }
    }

    pub fn output_format(&self) -> crate::output::OutputFormat {
        if self.json {
            crate::output::OutputFormat::Json
        } else {
            crate::output::OutputFormat::Text
        }
    }
}

/// Flag value, else env value, else default; parse failures are
/// configuration errors.
fn resolve_parsed<T>(flag: Option<&str>, env_key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    if let Some(raw) = flag {
        return raw.parse().map_err(|e: String| anyhow!(e));
    }
    if let Some(raw) = env::var(env_key) {
        return raw.parse().map_err(|e: String| anyhow!(e));
    }
    Ok(default)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
