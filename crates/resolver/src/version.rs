// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version probing of resolved binaries.

use std::path::Path;

use openwork_supervisor::cmd::{run_with_timeout, VERSION_PROBE_TIMEOUT};
use tokio::process::Command;
use tracing::warn;

use crate::ResolveError;

/// Run `<bin> --version` and extract a semver-shaped token.
pub async fn probe_version(bin: &Path, name: &str) -> Result<String, ResolveError> {
    let mut cmd = Command::new(bin);
    cmd.arg("--version");
    let output = run_with_timeout(cmd, VERSION_PROBE_TIMEOUT, &format!("{name} --version"))
        .await
        .map_err(|reason| ResolveError::Probe { name: name.to_string(), reason })?;

    let combined = format!(
        "{} {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    extract_semver(&combined).ok_or_else(|| ResolveError::Probe {
        name: name.to_string(),
        reason: format!("no version token in output: {:?}", combined.trim()),
    })
}

/// First `MAJOR.MINOR.PATCH[-pre]` token in `s`.
///
/// A leading `v` on the token is tolerated and stripped.
pub fn extract_semver(s: &str) -> Option<String> {
    for raw in s.split_whitespace() {
        let token = raw.trim_start_matches('v');
        if let Some(version) = parse_semver_token(token) {
            return Some(version);
        }
    }
    None
}

fn parse_semver_token(token: &str) -> Option<String> {
    let core_end = token
        .find(|c: char| c != '.' && !c.is_ascii_digit())
        .unwrap_or(token.len());
    let (core, rest) = token.split_at(core_end);

    let mut parts = core.split('.');
    let (major, minor, patch) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    for part in [major, minor, patch] {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    // Accept a pre-release / build suffix, reject embedded junk like "1.2.3abc".
    if rest.is_empty() {
        return Some(core.to_string());
    }
    if rest.starts_with('-') || rest.starts_with('+') {
        return Some(format!("{core}{rest}"));
    }
    None
}

/// Assert the probed version matches the expectation.
///
/// External binaries only warn: the user supplied them explicitly, so a
/// mismatch is annotated rather than fatal.
pub fn check_version(
    name: &str,
    expected: &str,
    actual: &str,
    external: bool,
) -> Result<(), ResolveError> {
    if expected == actual {
        return Ok(());
    }
    if external {
        warn!(
            component = "resolver",
            expected, actual, "external {name} reports a different version than expected"
        );
        return Ok(());
    }
    Err(ResolveError::VersionMismatch {
        name: name.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
