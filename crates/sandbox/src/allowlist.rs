// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The mount allowlist: the on-disk policy gating extra bind-mounts.
//!
//! Absence of the file deterministically disables extra mounts. Default
//! blocked patterns are always merged into whatever the user configures;
//! they can add patterns but never remove the defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::SandboxError;

/// File name under the user config directory.
pub const ALLOWLIST_FILE: &str = "sandbox-mount-allowlist.json";

/// Patterns no mount may traverse, regardless of user configuration.
/// Matching is per path segment (see `mounts`).
pub const DEFAULT_BLOCKED_PATTERNS: &[&str] = &[
    ".ssh",
    ".gnupg",
    ".aws",
    ".azure",
    ".kube",
    ".config/gcloud",
    ".env",
    ".netrc",
    ".npmrc",
    ".pgpass",
    ".docker/config.json",
    "id_rsa",
    "id_ed25519",
    "credentials",
];

/// One directory tree the user permits mounting from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedRoot {
    pub path: String,
    #[serde(default)]
    pub allow_read_write: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The allowlist document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MountAllowlist {
    #[serde(default)]
    pub allowed_roots: Vec<AllowedRoot>,
    #[serde(default)]
    pub blocked_patterns: Vec<String>,
}

impl MountAllowlist {
    /// Defaults merged with user patterns, defaults first.
    pub fn effective_blocked_patterns(&self) -> Vec<String> {
        let mut patterns: Vec<String> =
            DEFAULT_BLOCKED_PATTERNS.iter().map(|p| (*p).to_string()).collect();
        for pattern in &self.blocked_patterns {
            if !patterns.iter().any(|existing| existing == pattern) {
                patterns.push(pattern.clone());
            }
        }
        patterns
    }
}

/// Resolve the allowlist location: explicit override, else
/// `~/.config/openwork/sandbox-mount-allowlist.json`.
pub fn allowlist_path(override_path: Option<&Path>) -> PathBuf {
    if let Some(path) = override_path {
        return path.to_path_buf();
    }
    if let Some(value) = openwork_core::env::var("SANDBOX_ALLOWLIST") {
        return PathBuf::from(value);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("openwork")
        .join(ALLOWLIST_FILE)
}

/// Load the allowlist. `Ok(None)` when the file does not exist; a present
/// but unparseable file is an error rather than an open door.
pub fn load_allowlist(path: &Path) -> Result<Option<MountAllowlist>, SandboxError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let allowlist = serde_json::from_str(&raw).map_err(|e| SandboxError::BadAllowlist {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(Some(allowlist))
}

/// A pastable starter document, embedded in the rejection error.
pub fn allowlist_template() -> String {
    let template = MountAllowlist {
        allowed_roots: vec![AllowedRoot {
            path: "~/projects".to_string(),
            allow_read_write: false,
            description: Some("project checkouts the sandbox may read".to_string()),
        }],
        blocked_patterns: vec![],
    };
    serde_json::to_string_pretty(&template).unwrap_or_default()
}

#[cfg(test)]
#[path = "allowlist_tests.rs"]
mod tests;
