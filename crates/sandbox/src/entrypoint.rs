// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Staged container runtime.
//!
//! The container image is assumed to carry nothing but a shell: the
//! runtime is staged on the host under
//! `<persist>/sandbox/<container-name>/sidecars/` (both sidecar binaries
//! plus a generated `entrypoint.sh`) and bind-mounted in. Every value
//! substituted into the script goes through [`shell_quote`]; a workspace
//! path with a hostile name must never become shell syntax.

use std::path::{Path, PathBuf};

use crate::runner::{ENGINE_INTERNAL_PORT, SERVER_INTERNAL_PORT};
use crate::SandboxError;

/// In-container mount points, fixed by the generated script.
pub const CONTAINER_WORKSPACE: &str = "/workspace";
pub const CONTAINER_PERSIST: &str = "/persist";
pub const CONTAINER_SIDECARS: &str = "/sidecars";
pub const CONTAINER_ENGINE_CONFIG: &str = "/host-engine-config";

/// What the entrypoint launches.
#[derive(Debug, Clone)]
pub struct EntrypointConfig {
    /// Extra flags forwarded verbatim to the app server.
    pub server_args: Vec<String>,
    /// Basic-auth credentials exported to the engine, `user:pass`.
    pub engine_auth: Option<String>,
}

/// The staged directory and its entrypoint script.
#[derive(Debug, Clone)]
pub struct StagedRuntime {
    /// `<persist>/sandbox/<container-name>`.
    pub dir: PathBuf,
    /// Host path of `sidecars/entrypoint.sh`.
    pub entrypoint: PathBuf,
    /// Host path of the `sidecars/` directory, mounted at `/sidecars`.
    pub sidecars_dir: PathBuf,
}

/// POSIX single-quote escaping: `'` becomes `'\''`.
pub fn shell_quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for c in s.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Copy the sidecars into the staging directory and write the entrypoint.
pub fn stage_runtime(
    persist_dir: &Path,
    container_name: &str,
    engine_bin: &Path,
    server_bin: &Path,
    cfg: &EntrypointConfig,
) -> Result<StagedRuntime, SandboxError> {
    let dir = persist_dir.join("sandbox").join(container_name);
    let sidecars_dir = dir.join("sidecars");
    std::fs::create_dir_all(&sidecars_dir)?;

    let staged_engine = sidecars_dir.join("opencode");
    let staged_server = sidecars_dir.join("openwork-server");
    std::fs::copy(engine_bin, &staged_engine)?;
    std::fs::copy(server_bin, &staged_server)?;
    make_executable(&staged_engine)?;
    make_executable(&staged_server)?;

    let entrypoint = sidecars_dir.join("entrypoint.sh");
    std::fs::write(&entrypoint, render_entrypoint(cfg))?;
    make_executable(&entrypoint)?;

    Ok(StagedRuntime { dir, entrypoint, sidecars_dir })
}

/// Remove the staging directory. Detached runs skip this so the staged
/// runtime stays inspectable.
pub fn cleanup_staging(staged: &StagedRuntime) {
    let _ = std::fs::remove_dir_all(&staged.dir);
}

fn render_entrypoint(cfg: &EntrypointConfig) -> String {
    let mut script = String::new();
    script.push_str("#!/bin/sh\n");
    script.push_str("set -eu\n\n");

    // XDG dirs live under the persist mount so engine state survives
    // container replacement.
    for (var, sub) in [
        ("XDG_DATA_HOME", "data"),
        ("XDG_CONFIG_HOME", "config"),
        ("XDG_STATE_HOME", "state"),
        ("XDG_CACHE_HOME", "cache"),
    ] {
        script.push_str(&format!("export {var}={}\n", shell_quote(&format!("{CONTAINER_PERSIST}/xdg/{sub}"))));
    }
    script.push_str("mkdir -p \"$XDG_DATA_HOME\" \"$XDG_CONFIG_HOME\" \"$XDG_STATE_HOME\" \"$XDG_CACHE_HOME\"\n\n");

    // Seed the engine config from the host copy.
    script.push_str(&format!(
        "if [ -d {config} ]; then\n  mkdir -p \"$XDG_CONFIG_HOME/opencode\"\n  cp -R {config}/. \"$XDG_CONFIG_HOME/opencode/\"\nfi\n\n",
        config = shell_quote(CONTAINER_ENGINE_CONFIG),
    ));

    if let Some(auth) = &cfg.engine_auth {
        script.push_str(&format!("export OPENCODE_AUTH={}\n\n", shell_quote(auth)));
    }

    // Engine in the background on its fixed internal port.
    script.push_str(&format!(
        "{bin} serve --hostname {host} --port {port} &\n\n",
        bin = shell_quote(&format!("{CONTAINER_SIDECARS}/opencode")),
        host = shell_quote("0.0.0.0"),
        port = shell_quote(&ENGINE_INTERNAL_PORT.to_string()),
    ));

    // App server in the foreground; its exit is the container's exit.
    script.push_str(&format!(
        "exec {bin} --host {host} --port {port} --workspace {workspace} --engine-url {engine}",
        bin = shell_quote(&format!("{CONTAINER_SIDECARS}/openwork-server")),
        host = shell_quote("0.0.0.0"),
        port = shell_quote(&SERVER_INTERNAL_PORT.to_string()),
        workspace = shell_quote(CONTAINER_WORKSPACE),
        engine = shell_quote(&format!("http://127.0.0.1:{ENGINE_INTERNAL_PORT}")),
    ));
    for arg in &cfg.server_args {
        script.push(' ');
        script.push_str(&shell_quote(arg));
    }
    script.push('\n');
    script
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "entrypoint_tests.rs"]
mod tests;
