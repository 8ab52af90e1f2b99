// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extra bind-mount validation.
//!
//! A mount request `hostPath:containerSubPath[:ro|rw]` must clear four
//! gates before it reaches the container runtime:
//!
//! 1. the host path is absolute (after `~` expansion) and exists — the
//!    real path (symlinks resolved) is what gets checked and mounted;
//! 2. no segment of the real path matches a blocked pattern;
//! 3. the real path is contained in at least one allowed root;
//! 4. `rw` is only honored when the matching root allows read-write,
//!    otherwise the mount is downgraded to read-only.

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::allowlist::MountAllowlist;
use crate::SandboxError;

/// A validated extra mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    /// Real host path, symlinks resolved.
    pub host: PathBuf,
    /// Relative target under the container mount root.
    pub container_sub: String,
    pub read_write: bool,
}

impl MountSpec {
    /// Render as a container runtime `-v` argument, mounting under
    /// `/mnt/<sub>`.
    pub fn volume_arg(&self) -> String {
        let mode = if self.read_write { "rw" } else { "ro" };
        format!("{}:/mnt/{}:{}", self.host.display(), self.container_sub, mode)
    }
}

/// Validate one `hostPath:containerSubPath[:ro|rw]` request against the
/// allowlist (or its absence).
pub fn validate_mount(
    spec: &str,
    allowlist: Option<&MountAllowlist>,
    allowlist_location: &Path,
) -> Result<MountSpec, SandboxError> {
    let (host_raw, sub, rw_requested) = parse_spec(spec)?;

    // Gate 0: no allowlist file, no extra mounts. The error carries a
    // pastable starter document.
    let Some(allowlist) = allowlist else {
        return Err(SandboxError::AllowlistMissing {
            spec: spec.to_string(),
            path: allowlist_location.display().to_string(),
            template: crate::allowlist::allowlist_template(),
        });
    };

    // Gate 1: absolute after ~ expansion, and real on disk.
    let expanded = expand_tilde(&host_raw);
    if !expanded.is_absolute() {
        return Err(SandboxError::BadMountSpec {
            spec: spec.to_string(),
            reason: format!("host path {} is not absolute", expanded.display()),
        });
    }
    let real = expanded.canonicalize().map_err(|e| SandboxError::BadMountSpec {
        spec: spec.to_string(),
        reason: format!("host path {} cannot be resolved: {e}", expanded.display()),
    })?;

    // Gate 2: blocked patterns always apply.
    if let Some(pattern) = blocked_pattern_hit(&real, &allowlist.effective_blocked_patterns()) {
        return Err(SandboxError::BlockedPattern { spec: spec.to_string(), pattern });
    }

    // Gate 3: containment in an allowed root.
    let root = allowlist
        .allowed_roots
        .iter()
        .find(|r| {
            let root_path = expand_tilde(&r.path);
            root_path.canonicalize().map(|rp| real.starts_with(rp)).unwrap_or(false)
        })
        .ok_or_else(|| SandboxError::OutsideAllowedRoots { spec: spec.to_string() })?;

    // Gate 4: rw only where the root grants it.
    let read_write = if rw_requested && !root.allow_read_write {
        warn!(component = "sandbox",
            "mount {spec} downgraded to read-only: root {} is read-only", root.path);
        false
    } else {
        rw_requested
    };

    Ok(MountSpec { host: real, container_sub: sub, read_write })
}

/// Split `hostPath:containerSubPath[:ro|rw]`.
fn parse_spec(spec: &str) -> Result<(String, String, bool), SandboxError> {
    let parts: Vec<&str> = spec.split(':').collect();
    let (host, sub, mode) = match parts.as_slice() {
        [host, sub] => (host, sub, "ro"),
        [host, sub, mode] => (host, sub, *mode),
        _ => {
            return Err(SandboxError::BadMountSpec {
                spec: spec.to_string(),
                reason: "expected hostPath:containerSubPath[:ro|rw]".to_string(),
            })
        }
    };
    if host.is_empty() || sub.is_empty() {
        return Err(SandboxError::BadMountSpec {
            spec: spec.to_string(),
            reason: "host path and container sub-path must be non-empty".to_string(),
        });
    }
    if sub.starts_with('/') || sub.split('/').any(|seg| seg == "..") {
        return Err(SandboxError::BadMountSpec {
            spec: spec.to_string(),
            reason: "container sub-path must be relative and must not traverse".to_string(),
        });
    }
    let rw = match mode {
        "ro" => false,
        "rw" => true,
        other => {
            return Err(SandboxError::BadMountSpec {
                spec: spec.to_string(),
                reason: format!("unknown mode {other:?} (expected ro or rw)"),
            })
        }
    };
    Ok(((*host).to_string(), (*sub).to_string(), rw))
}

/// `~` and `~/...` expansion against `$HOME`.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// First blocked pattern any segment of `path` matches.
///
/// Single-segment patterns match one path component exactly; patterns
/// containing `/` match a consecutive run of components.
fn blocked_pattern_hit(path: &Path, patterns: &[String]) -> Option<String> {
    let segments: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(seg) => Some(seg.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    for pattern in patterns {
        let pattern_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
        if pattern_segments.is_empty() {
            continue;
        }
        let hit = segments
            .windows(pattern_segments.len())
            .any(|window| window.iter().map(String::as_str).eq(pattern_segments.iter().copied()));
        if hit {
            return Some(pattern.clone());
        }
    }
    None
}

#[cfg(test)]
#[path = "mounts_tests.rs"]
mod tests;
