// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! Every recognized variable exists under two names: the current
//! `OPENWORK_*` prefix and the legacy `OPENCODE_STUDIO_*` prefix from the
//! product's previous incarnation. The new name wins; the legacy name is a
//! fallback that emits one deprecation warning per variable per process.

use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;

use parking_lot::Mutex;
use thiserror::Error;

/// Current environment prefix.
pub const ENV_PREFIX: &str = "OPENWORK_";

/// Legacy environment prefix, still honored with a deprecation warning.
pub const LEGACY_ENV_PREFIX: &str = "OPENCODE_STUDIO_";

static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("could not determine home directory")]
    NoHome,
}

/// Read `OPENWORK_<key>`, falling back to `OPENCODE_STUDIO_<key>`.
///
/// `key` is the unprefixed suffix, e.g. `"DATA_DIR"`. Empty values are
/// treated as unset.
pub fn var(key: &str) -> Option<String> {
    if let Ok(value) = std::env::var(format!("{ENV_PREFIX}{key}")) {
        if !value.is_empty() {
            return Some(value);
        }
    }
    let legacy = format!("{LEGACY_ENV_PREFIX}{key}");
    if let Ok(value) = std::env::var(&legacy) {
        if !value.is_empty() {
            warn_legacy_once(key, &legacy);
            return Some(value);
        }
    }
    None
}

/// Read and parse a variable; unparseable values are treated as unset.
pub fn var_parsed<T: FromStr>(key: &str) -> Option<T> {
    var(key).and_then(|s| s.parse().ok())
}

/// Read a boolean variable. `1`, `true`, `yes`, `on` are true;
/// `0`, `false`, `no`, `off` are false; anything else is unset.
pub fn flag(key: &str) -> Option<bool> {
    match var(key)?.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Resolve the data dir: `OPENWORK_DATA_DIR` > `$XDG_STATE_HOME/openwork` >
/// `~/.local/state/openwork`.
pub fn data_dir() -> Result<PathBuf, EnvError> {
    if let Some(dir) = var("DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("openwork"));
        }
    }
    let home = std::env::var("HOME").map_err(|_| EnvError::NoHome)?;
    Ok(PathBuf::from(home).join(".local/state/openwork"))
}

fn warn_legacy_once(key: &str, legacy: &str) {
    let mut warned = WARNED.lock();
    let set = warned.get_or_insert_with(HashSet::new);
    if set.insert(key.to_string()) {
        tracing::warn!(
            "{legacy} is deprecated; use {ENV_PREFIX}{key} instead (legacy value still honored)"
        );
        eprintln!("warn: {legacy} is deprecated; use {ENV_PREFIX}{key} instead");
    }
}

/// Test hook: forget which legacy names have warned.
#[cfg(test)]
pub(crate) fn reset_warned() {
    *WARNED.lock() = None;
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
