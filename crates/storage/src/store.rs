// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State document load/save.
//!
//! Loads never fail: a missing, empty, or corrupt file yields the zero
//! state so the orchestrator can always start. Saves go through a temp
//! file + rename in the same directory so readers never observe a torn
//! document, and the previous file is rotated to `.bak` first.

use std::fs;
use std::path::{Path, PathBuf};

use openwork_core::{PersistedState, STATE_VERSION};
use thiserror::Error;

/// Errors from state persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

const MAX_BAK_FILES: u32 = 3;

/// Handle to the persisted state file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store rooted at `<data_dir>/state.json`.
    pub fn new(data_dir: &Path) -> Self {
        Self { path: data_dir.join("state.json") }
    }

    /// Store at an explicit file path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state document.
    ///
    /// Missing file, unreadable file, or unparseable JSON all normalize to
    /// the zero state; a warning is logged for corrupt documents so the
    /// overwrite on next save is not silent.
    pub fn load(&self) -> PersistedState {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return PersistedState::default(),
        };
        if raw.trim().is_empty() {
            return PersistedState::default();
        }
        match serde_json::from_str::<PersistedState>(&raw) {
            Ok(mut state) => {
                if state.version == 0 {
                    state.version = STATE_VERSION;
                }
                state
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e,
                    "state file is corrupt; starting from zero state");
                PersistedState::default()
            }
        }
    }

    /// Save the state document atomically.
    ///
    /// Writes `<path>.tmp`, rotates the existing file to `.bak`, then
    /// renames the temp file into place.
    pub fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;

        if self.path.exists() {
            let bak = rotate_bak_path(&self.path);
            let _ = fs::copy(&self.path, bak);
        }

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
