// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: lock, log file, startup marker.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use fs2::FileExt;

use crate::{DaemonConfig, DaemonError};

/// Startup marker prefix written to the log before anything else.
/// The spawning CLI scans from the last marker for startup errors.
/// Full format: "--- openwork daemon: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- openwork daemon: starting (pid: ";

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep.
const MAX_ROTATED_LOGS: u32 = 3;

/// Held for the daemon's lifetime; the exclusive flock is the
/// one-daemon-per-data-dir guarantee.
#[derive(Debug)]
pub struct LockGuard {
    // NOTE(lifetime): held to maintain the exclusive file lock; released on drop
    #[allow(dead_code)]
    file: File,
}

/// Acquire the daemon lock and record our pid in it.
pub fn acquire_lock(cfg: &DaemonConfig) -> Result<LockGuard, DaemonError> {
    std::fs::create_dir_all(&cfg.data_dir)?;
    let path = cfg.lock_path();
    let mut file = std::fs::OpenOptions::new().create(true).write(true).open(&path)?;
    file.try_lock_exclusive()
        .map_err(|_| DaemonError::AlreadyRunning(path.display().to_string()))?;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(LockGuard { file })
}

/// Remove the lock file on graceful shutdown.
pub fn release_lock(cfg: &DaemonConfig) {
    let _ = std::fs::remove_file(cfg.lock_path());
}

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `daemon.log` → `daemon.log.1` → `.2` → `.3`, deleting the
/// oldest. Best-effort: rotation failures must not block startup.
pub fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let _ = std::fs::rename(format!("{log_str}.{i}"), format!("{log_str}.{}", i + 1));
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Append the startup marker (before tracing setup, so the CLI can find
/// where this attempt begins even if logging never initializes).
pub fn write_startup_marker(cfg: &DaemonConfig) -> Result<(), DaemonError> {
    if let Some(parent) = cfg.log_path().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file =
        std::fs::OpenOptions::new().create(true).append(true).open(cfg.log_path())?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())?;
    Ok(())
}

/// Write a startup error synchronously so the spawning CLI sees it even
/// when the process exits before the non-blocking logger flushes.
pub fn write_startup_error(cfg: &DaemonConfig, error: &DaemonError) {
    let Ok(mut file) =
        std::fs::OpenOptions::new().create(true).append(true).open(cfg.log_path())
    else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start daemon: {error}");
}

/// Parse a startup error out of log content: lines after the last marker
/// that look like errors.
pub fn parse_startup_error(content: &str) -> Option<String> {
    let start = content.rfind(STARTUP_MARKER_PREFIX)?;
    let errors: Vec<&str> = content[start..]
        .lines()
        .filter(|line| line.contains("ERROR") || line.contains("failed to start"))
        .collect();
    if errors.is_empty() {
        None
    } else {
        Some(errors.join("\n"))
    }
}

/// Set up the daemon's file logger. Returns the worker guard that must
/// stay alive for the process lifetime.
pub fn setup_logging(
    cfg: &DaemonConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard, DaemonError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_path = cfg.log_path();
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let dir = log_path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "daemon.log".into());
    let file_appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init();

    Ok(guard)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
