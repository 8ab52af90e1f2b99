// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine fallback: the public releases API.
//!
//! When neither a bundled binary nor a remote manifest entry matches, the
//! engine can still be fetched from its latest published release: pick the
//! target-appropriate archive (zip or tar.gz), extract it, and copy out
//! the engine executable.

use std::path::{Path, PathBuf};

use openwork_core::state::BinaryProvenance;
use openwork_core::{Platform, TargetTriple};
use serde::Deserialize;
use tracing::info;

use crate::remote::{download, make_executable, FETCH_TIMEOUT};
use crate::version::extract_semver;
use crate::{ResolveError, ResolvedBinary, ENGINE_BIN};

/// Latest-release endpoint for the engine.
pub const RELEASES_LATEST_URL: &str =
    "https://api.github.com/repos/sst/opencode/releases/latest";

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// Pick the release asset for a triple.
///
/// Candidates must name the platform and either name the architecture or
/// be architecture-neutral. Ties break `adhoc` > `universal` > `aarch64` >
/// first match.
pub fn pick_release_asset<'a>(
    assets: &'a [ReleaseAsset],
    triple: TargetTriple,
) -> Option<&'a ReleaseAsset> {
    let platform_tokens: &[&str] = match triple.platform {
        Platform::Linux => &["linux"],
        Platform::Darwin => &["darwin", "macos", "mac"],
        Platform::Windows => &["windows", "win32"],
    };
    let arch_tokens: &[&str] = match triple.arch {
        openwork_core::Arch::X64 => &["x64", "x86_64", "amd64"],
        openwork_core::Arch::Arm64 => &["arm64", "aarch64"],
    };

    let candidates: Vec<&ReleaseAsset> = assets
        .iter()
        .filter(|a| {
            let name = a.name.to_ascii_lowercase();
            if !is_archive(&name) {
                return false;
            }
            platform_tokens.iter().any(|t| name.contains(t))
                && (arch_tokens.iter().any(|t| name.contains(t))
                    || name.contains("universal")
                    || name.contains("adhoc"))
        })
        .collect();

    for preferred in ["adhoc", "universal", "aarch64"] {
        if let Some(asset) =
            candidates.iter().find(|a| a.name.to_ascii_lowercase().contains(preferred))
        {
            return Some(asset);
        }
    }
    candidates.first().copied()
}

fn is_archive(name: &str) -> bool {
    name.ends_with(".zip") || name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

/// Download and unpack the latest engine release into the sidecar cache.
pub async fn download_latest_engine(
    client: &reqwest::Client,
    cache_dir: &Path,
    triple: TargetTriple,
) -> Result<ResolvedBinary, ResolveError> {
    let release: Release = client
        .get(RELEASES_LATEST_URL)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| ResolveError::Download { name: ENGINE_BIN.to_string(), reason: e.to_string() })?
        .json()
        .await?;

    let version = extract_semver(&release.tag_name).unwrap_or_else(|| release.tag_name.clone());
    let asset = pick_release_asset(&release.assets, triple).ok_or_else(|| {
        ResolveError::ManifestMissing {
            url: RELEASES_LATEST_URL.to_string(),
            name: ENGINE_BIN.to_string(),
            triple: triple.to_string(),
        }
    })?;

    let target_dir = cache_dir.join(&version).join(triple.to_string());
    let final_bin = target_dir.join(ENGINE_BIN);
    if final_bin.is_file() {
        return Ok(ResolvedBinary {
            path: final_bin,
            source: BinaryProvenance::Downloaded,
            expected_version: Some(version),
            actual_version: None,
        });
    }

    let archive_path = target_dir.join(&asset.name);
    download(client, &asset.browser_download_url, &archive_path, None, ENGINE_BIN).await?;

    let unpack_dir = target_dir.join("unpacked");
    extract_archive(&archive_path, &unpack_dir)?;
    let extracted = find_engine_binary(&unpack_dir).ok_or_else(|| ResolveError::Download {
        name: ENGINE_BIN.to_string(),
        reason: format!("archive {} contains no {ENGINE_BIN} executable", asset.name),
    })?;

    std::fs::copy(&extracted, &final_bin)?;
    make_executable(&final_bin)?;
    let _ = std::fs::remove_dir_all(&unpack_dir);
    let _ = std::fs::remove_file(&archive_path);

    info!(component = "resolver", version = version.as_str(),
        "fetched engine from latest release");
    Ok(ResolvedBinary {
        path: final_bin,
        source: BinaryProvenance::Downloaded,
        expected_version: Some(version),
        actual_version: None,
    })
}

/// Unpack a `.zip` or `.tar.gz`/`.tgz` archive into `dest`.
fn extract_archive(archive: &Path, dest: &Path) -> Result<(), ResolveError> {
    std::fs::create_dir_all(dest)?;
    let name = archive.file_name().map(|n| n.to_string_lossy().to_ascii_lowercase());
    let name = name.as_deref().unwrap_or("");

    if name.ends_with(".zip") {
        let file = std::fs::File::open(archive)?;
        let mut zip = zip::ZipArchive::new(file).map_err(|e| ResolveError::Download {
            name: ENGINE_BIN.to_string(),
            reason: format!("bad zip archive: {e}"),
        })?;
        zip.extract(dest).map_err(|e| ResolveError::Download {
            name: ENGINE_BIN.to_string(),
            reason: format!("zip extraction failed: {e}"),
        })?;
        return Ok(());
    }

    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        let file = std::fs::File::open(archive)?;
        let tar = flate2::read::GzDecoder::new(file);
        tar::Archive::new(tar).unpack(dest)?;
        return Ok(());
    }

    Err(ResolveError::Download {
        name: ENGINE_BIN.to_string(),
        reason: format!("unsupported archive type: {name}"),
    })
}

/// Locate the engine executable inside an unpacked archive.
fn find_engine_binary(dir: &Path) -> Option<PathBuf> {
    let expected = format!("{ENGINE_BIN}{}", std::env::consts::EXE_SUFFIX);
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = std::fs::read_dir(&current).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.file_name() == Some(std::ffi::OsStr::new(&expected)) {
                return Some(path);
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "releases_tests.rs"]
mod tests;
