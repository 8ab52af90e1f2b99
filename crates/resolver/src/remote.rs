// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote manifest fetch and asset downloads.
//!
//! The sidecar cache is append-only per `(version, triple, asset)`:
//! writers land bytes under a temp suffix and rename into place, so a
//! concurrent reader either sees the complete file or nothing.

use std::path::Path;
use std::time::Duration;

use openwork_core::{SidecarManifest, TargetAsset};

use crate::digest::file_sha256;
use crate::ResolveError;

/// Budget for manifest/HEAD fetches.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared HTTP client for resolver traffic.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("openwork/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// Fetch and parse the remote sidecar manifest.
pub async fn fetch_manifest(
    client: &reqwest::Client,
    url: &str,
) -> Result<SidecarManifest, ResolveError> {
    let resp = client.get(url).timeout(FETCH_TIMEOUT).send().await?.error_for_status()?;
    Ok(resp.json().await?)
}

/// Resolve the download URL for a manifest target.
///
/// Absolute `url` wins; otherwise `asset` is joined onto the base URL.
pub fn asset_url(base_url: &str, _name: &str, target: &TargetAsset) -> Option<String> {
    if let Some(url) = &target.url {
        return Some(url.clone());
    }
    let asset = target.asset.as_ref()?;
    Some(format!("{}/{}", base_url.trim_end_matches('/'), asset))
}

/// Is a verified copy already in the cache?
pub fn cached(dest: &Path, sha256: Option<&str>) -> Result<bool, ResolveError> {
    if !dest.is_file() {
        return Ok(false);
    }
    match sha256 {
        Some(expected) => Ok(file_sha256(dest)?.eq_ignore_ascii_case(expected)),
        // No digest to check against; presence is the best we can do.
        None => Ok(true),
    }
}

/// Download `url` into `dest`, verifying SHA-256 when provided.
pub async fn download(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    sha256: Option<&str>,
    name: &str,
) -> Result<(), ResolveError> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let resp = client.get(url).send().await?.error_for_status().map_err(|e| {
        ResolveError::Download { name: name.to_string(), reason: e.to_string() }
    })?;
    let bytes = resp.bytes().await?;

    let tmp = dest.with_extension(format!("tmp-{}", std::process::id()));
    std::fs::write(&tmp, &bytes)?;

    if let Some(expected) = sha256 {
        let actual = file_sha256(&tmp)?;
        if !actual.eq_ignore_ascii_case(expected) {
            let _ = std::fs::remove_file(&tmp);
            return Err(ResolveError::HashMismatch {
                name: name.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
    }

    make_executable(&tmp)?;
    std::fs::rename(&tmp, dest)?;
    Ok(())
}

#[cfg(unix)]
pub fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
