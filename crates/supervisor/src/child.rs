// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process ownership.
//!
//! Every sidecar runs as a [`Supervisor`]-owned child: spawned with piped
//! stdio, each output line re-emitted as a log event tagged with the
//! child's component name, exits reported on a channel the run loop
//! watches. Stopping is graceful-then-force: SIGTERM, a short grace
//! period, then SIGKILL, always waiting for the exit to be observed.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::logfmt;
use crate::process;
use crate::RUN_ID_ENV;

/// Grace period between SIGTERM and SIGKILL.
pub const STOP_GRACE: Duration = Duration::from_millis(2500);

const EXIT_POLL: Duration = Duration::from_millis(50);

/// Errors from child supervision.
#[derive(Debug, Error)]
pub enum SuperviseError {
    #[error("failed to spawn {name}: {source}")]
    Spawn { name: String, source: std::io::Error },

    #[error("{name} exited during startup with {code:?}")]
    EarlyExit { name: String, code: Option<i32> },
}

/// What to spawn.
#[derive(Debug, Clone)]
pub struct ChildSpec {
    /// Component name used to tag the child's log lines.
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl ChildSpec {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), program: program.into(), args: Vec::new(), cwd: None, env: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I: IntoIterator<Item = S>, S: Into<String>>(mut self, args: I) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

/// A child exit observed by the supervisor.
#[derive(Debug, Clone)]
pub struct ChildExit {
    pub name: String,
    pub pid: u32,
    pub code: Option<i32>,
}

struct ChildEntry {
    name: String,
    pid: u32,
    exited: Arc<AtomicBool>,
    exit_code: Arc<Mutex<Option<i32>>>,
    stdio_tasks: Vec<JoinHandle<()>>,
}

/// Owns the children of one run.
pub struct Supervisor {
    json_logs: bool,
    run_id: String,
    children: Mutex<Vec<ChildEntry>>,
    exit_tx: mpsc::UnboundedSender<ChildExit>,
    shutdown_started: AtomicBool,
    detached: AtomicBool,
    cleanup: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Supervisor {
    /// Create a supervisor and the exit stream its run loop consumes.
    pub fn new(run_id: &str, json_logs: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<ChildExit>) {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        let supervisor = Arc::new(Self {
            json_logs,
            run_id: run_id.to_string(),
            children: Mutex::new(Vec::new()),
            exit_tx,
            shutdown_started: AtomicBool::new(false),
            detached: AtomicBool::new(false),
            cleanup: Mutex::new(None),
        });
        (supervisor, exit_rx)
    }

    /// Register a hook run exactly once at the start of `shutdown_all`
    /// (sandbox container teardown).
    pub fn set_cleanup(&self, hook: Box<dyn FnOnce() + Send>) {
        *self.cleanup.lock() = Some(hook);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    /// Spawn a child and begin streaming its stdio.
    ///
    /// The child's environment always carries the run id. `kill_on_drop`
    /// stays off: detached runs leave children alive after the
    /// orchestrator exits.
    pub fn start(&self, spec: ChildSpec) -> Result<u32, SuperviseError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .env(RUN_ID_ENV, &self.run_id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .map_err(|source| SuperviseError::Spawn { name: spec.name.clone(), source })?;
        let pid = child.id().unwrap_or_default();
        info!(component = spec.name.as_str(), pid, "child started");

        let exited = Arc::new(AtomicBool::new(false));
        let exit_code = Arc::new(Mutex::new(None));
        let mut stdio_tasks = Vec::with_capacity(2);

        if let Some(stdout) = child.stdout.take() {
            stdio_tasks.push(tokio::spawn(pump_lines(
                stdout,
                spec.name.clone(),
                false,
                self.json_logs,
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            stdio_tasks.push(tokio::spawn(pump_lines(
                stderr,
                spec.name.clone(),
                true,
                self.json_logs,
            )));
        }

        // Reaper task: waits for the exit, records it, notifies the run loop.
        {
            let name = spec.name.clone();
            let exited = Arc::clone(&exited);
            let exit_code = Arc::clone(&exit_code);
            let exit_tx = self.exit_tx.clone();
            tokio::spawn(async move {
                let code = match child.wait().await {
                    Ok(status) => status.code(),
                    Err(e) => {
                        warn!(component = name.as_str(), error = %e, "failed to reap child");
                        None
                    }
                };
                *exit_code.lock() = code;
                exited.store(true, Ordering::SeqCst);
                let _ = exit_tx.send(ChildExit { name, pid, code });
            });
        }

        self.children.lock().push(ChildEntry {
            name: spec.name,
            pid,
            exited,
            exit_code,
            stdio_tasks,
        });
        Ok(pid)
    }

    /// Stop one child: SIGTERM, grace period, SIGKILL, wait for the reap.
    pub async fn stop(&self, pid: u32) {
        let entry = {
            let children = self.children.lock();
            children.iter().find(|c| c.pid == pid).map(|c| {
                (c.name.clone(), Arc::clone(&c.exited))
            })
        };
        let Some((name, exited)) = entry else { return };
        if exited.load(Ordering::SeqCst) {
            return;
        }

        process::send_term(pid);
        if wait_flag(&exited, STOP_GRACE).await {
            return;
        }

        warn!(component = name.as_str(), pid, "child ignored SIGTERM, killing");
        process::send_kill(pid);
        // SIGKILL cannot be ignored; wait for the reaper to observe it.
        while !exited.load(Ordering::SeqCst) {
            tokio::time::sleep(EXIT_POLL).await;
        }
    }

    /// Stop every child concurrently. Idempotent: the first call wins, any
    /// later call (including re-entry from exit cascades) is a no-op.
    pub async fn shutdown_all(&self) {
        if self.shutdown_started.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(hook) = self.cleanup.lock().take() {
            hook();
        }

        let pids: Vec<u32> = self.children.lock().iter().map(|c| c.pid).collect();
        futures_util::future::join_all(pids.into_iter().map(|pid| self.stop(pid))).await;
        info!("all children stopped");
    }

    /// Whether a shutdown cascade has already begun.
    pub fn shutting_down(&self) -> bool {
        self.shutdown_started.load(Ordering::SeqCst)
    }

    /// Release the children: stop streaming stdio and stop reacting to
    /// their exits. They keep running after this process exits.
    pub fn detach(&self) -> Vec<(String, u32)> {
        self.detached.store(true, Ordering::SeqCst);
        let mut children = self.children.lock();
        let mut summary = Vec::with_capacity(children.len());
        for child in children.iter_mut() {
            for task in child.stdio_tasks.drain(..) {
                task.abort();
            }
            summary.push((child.name.clone(), child.pid));
        }
        info!(children = summary.len(), "detached; children left running");
        summary
    }

    /// Exit code recorded for a child, if it has exited.
    pub fn exit_code(&self, pid: u32) -> Option<i32> {
        let children = self.children.lock();
        let entry = children.iter().find(|c| c.pid == pid)?;
        if entry.exited.load(Ordering::SeqCst) {
            *entry.exit_code.lock()
        } else {
            None
        }
    }
}

/// Wait until `flag` becomes true or `timeout` elapses.
async fn wait_flag(flag: &AtomicBool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if flag.load(Ordering::SeqCst) {
            return true;
        }
        tokio::time::sleep(EXIT_POLL).await;
    }
    flag.load(Ordering::SeqCst)
}

/// Stream one stdio pipe line by line into the log stream.
///
/// In json mode, lines that already parse as OTEL records pass through
/// verbatim so structured sidecar logs are not double-wrapped.
pub async fn pump_lines<R>(reader: R, component: String, is_stderr: bool, json_logs: bool)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        if json_logs && logfmt::is_otel_record(&line) {
            logfmt::emit_passthrough(&line);
            continue;
        }
        if is_stderr {
            error!(component = component.as_str(), "{}", line);
        } else {
            info!(component = component.as_str(), "{}", line);
        }
    }
}

#[cfg(test)]
#[path = "child_tests.rs"]
mod tests;
