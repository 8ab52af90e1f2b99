// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sidecar binary resolution.
//!
//! Produces a [`ResolvedBinary`] per sidecar with provenance guarantees:
//! bundled binaries verify against the local version manifest, downloads
//! verify against the remote manifest's SHA-256, external binaries are
//! only permitted when explicitly allowed. Every resolved binary is
//! version-probed before use.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod digest;
mod local;
mod releases;
mod remote;
mod version;

pub use digest::file_sha256;
pub use local::{bundled_path, hash_stable_platform, load_local_manifest, LOCAL_MANIFEST_NAME};
pub use releases::pick_release_asset;
pub use remote::{asset_url, fetch_manifest, FETCH_TIMEOUT};
pub use version::{check_version, extract_semver, probe_version};

use std::path::PathBuf;

use openwork_core::state::BinaryProvenance;
use openwork_core::TargetTriple;
use thiserror::Error;
use tracing::{debug, info};

/// Engine binary name.
pub const ENGINE_BIN: &str = "opencode";

/// App server binary name.
pub const APP_SERVER_BIN: &str = "openwork-server";

/// Where to look for a sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourcePreference {
    #[default]
    Auto,
    Bundled,
    Downloaded,
    External,
}

impl std::str::FromStr for SourcePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "bundled" => Ok(Self::Bundled),
            "downloaded" => Ok(Self::Downloaded),
            "external" => Ok(Self::External),
            other => Err(format!(
                "unknown sidecar source {other:?} (expected auto, bundled, downloaded or external)"
            )),
        }
    }
}

/// A binary the orchestrator may execute.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBinary {
    pub path: PathBuf,
    pub source: BinaryProvenance,
    pub expected_version: Option<String>,
    pub actual_version: Option<String>,
}

/// Resolution failures.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{name}: no {source_kind} binary found ({hint})")]
    BinaryMissing { name: String, source_kind: &'static str, hint: String },

    #[error("{name}: SHA-256 mismatch (expected {expected}, got {actual}); re-download or reinstall")]
    HashMismatch { name: String, expected: String, actual: String },

    #[error("{name}: version mismatch (expected {expected}, got {actual}); update the bundled sidecars or pass --allow-external with an override")]
    VersionMismatch { name: String, expected: String, actual: String },

    #[error("{name}: external binaries are disabled; pass --allow-external to permit {path}")]
    ExternalNotAllowed { name: String, path: String },

    #[error("{name}: download failed: {reason}")]
    Download { name: String, reason: String },

    #[error("{name}: version probe failed: {reason}")]
    Probe { name: String, reason: String },

    #[error("sidecar manifest at {url} has no entry for {name} on {triple}")]
    ManifestMissing { url: String, name: String, triple: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Resolver configuration for one run.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub source: SourcePreference,
    pub allow_external: bool,
    /// Cache root, `<data-dir>/sidecars`.
    pub cache_dir: PathBuf,
    /// Base URL assets with relative `asset` names are joined onto.
    pub base_url: String,
    /// Remote sidecar manifest URL.
    pub manifest_url: String,
    /// Resolve for the sandbox container (forces a Linux triple).
    pub sandbox: bool,
    /// Explicit override path (`--opencode-bin` style flags).
    pub override_path: Option<PathBuf>,
}

/// Resolves sidecar binaries for one run.
pub struct Resolver {
    cfg: ResolverConfig,
    triple: TargetTriple,
    client: reqwest::Client,
}

impl Resolver {
    pub fn new(cfg: ResolverConfig) -> Self {
        let triple = if cfg.sandbox { TargetTriple::sandbox_host() } else { TargetTriple::host() };
        Self { cfg, triple, client: remote::http_client() }
    }

    pub fn triple(&self) -> TargetTriple {
        self.triple
    }

    /// Resolve `name` per the configured source preference, then verify
    /// its version. An explicit override path short-circuits the
    /// preference: the user named a binary, so only the external rules
    /// apply to it.
    pub async fn resolve(&self, name: &str) -> Result<ResolvedBinary, ResolveError> {
        let mut resolved = if self.cfg.override_path.is_some() {
            self.resolve_external(name)?
        } else {
            match self.cfg.source {
                SourcePreference::Bundled => self.resolve_bundled(name)?,
                SourcePreference::Downloaded => self.resolve_downloaded(name).await?,
                SourcePreference::External => self.resolve_external(name)?,
                SourcePreference::Auto => self.resolve_auto(name).await?,
            }
        };
        self.verify_version(name, &mut resolved).await?;
        Ok(resolved)
    }

    /// `auto`: bundled if present, else downloaded, else external when
    /// allowed.
    async fn resolve_auto(&self, name: &str) -> Result<ResolvedBinary, ResolveError> {
        match self.resolve_bundled(name) {
            Ok(resolved) => return Ok(resolved),
            Err(e) => debug!(component = "resolver", "no bundled {name}: {e}"),
        }
        match self.resolve_downloaded(name).await {
            Ok(resolved) => return Ok(resolved),
            Err(e) if self.cfg.allow_external => {
                debug!(component = "resolver", "download unavailable for {name}: {e}");
            }
            Err(e) => return Err(e),
        }
        self.resolve_external(name)
    }

    fn resolve_bundled(&self, name: &str) -> Result<ResolvedBinary, ResolveError> {
        let exe_dir = orchestrator_dir()?;
        let path = local::bundled_path(&exe_dir, name);
        if !path.exists() {
            return Err(ResolveError::BinaryMissing {
                name: name.to_string(),
                source_kind: "bundled",
                hint: format!("expected next to the orchestrator at {}", path.display()),
            });
        }

        let manifest = local::load_local_manifest(&exe_dir);
        let entry = manifest.as_ref().and_then(|m| m.entry(name).cloned());
        if local::hash_stable_platform() {
            if let Some(expected) = entry.as_ref().and_then(|e| e.sha256.clone()) {
                let actual = digest::file_sha256(&path)?;
                if !actual.eq_ignore_ascii_case(&expected) {
                    return Err(ResolveError::HashMismatch {
                        name: name.to_string(),
                        expected,
                        actual,
                    });
                }
            }
        }

        Ok(ResolvedBinary {
            path,
            source: BinaryProvenance::Bundled,
            expected_version: entry.map(|e| e.version),
            actual_version: None,
        })
    }

    async fn resolve_downloaded(&self, name: &str) -> Result<ResolvedBinary, ResolveError> {
        match self.resolve_from_manifest(name).await {
            Ok(resolved) => Ok(resolved),
            // The engine has one extra fallback: the public releases API.
            Err(e) if name == ENGINE_BIN => {
                debug!(component = "resolver", "manifest route failed for {name}: {e}");
                releases::download_latest_engine(&self.client, &self.cfg.cache_dir, self.triple)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    async fn resolve_from_manifest(&self, name: &str) -> Result<ResolvedBinary, ResolveError> {
        let manifest = remote::fetch_manifest(&self.client, &self.cfg.manifest_url).await?;
        let (entry, target) =
            manifest.target(name, self.triple).ok_or_else(|| ResolveError::ManifestMissing {
                url: self.cfg.manifest_url.clone(),
                name: name.to_string(),
                triple: self.triple.to_string(),
            })?;

        let url = remote::asset_url(&self.cfg.base_url, name, target).ok_or_else(|| {
            ResolveError::Download {
                name: name.to_string(),
                reason: "manifest target has neither url nor asset".to_string(),
            }
        })?;
        let asset_name = url.rsplit('/').next().unwrap_or(name).to_string();
        let dest = self
            .cfg
            .cache_dir
            .join(&entry.version)
            .join(self.triple.to_string())
            .join(&asset_name);

        if remote::cached(&dest, target.sha256.as_deref())? {
            debug!(component = "resolver", "reusing cached {name} at {}", dest.display());
        } else {
            remote::download(&self.client, &url, &dest, target.sha256.as_deref(), name).await?;
            info!(component = "resolver", version = entry.version.as_str(),
                "downloaded {name} to {}", dest.display());
        }

        Ok(ResolvedBinary {
            path: dest,
            source: BinaryProvenance::Downloaded,
            expected_version: Some(entry.version.clone()),
            actual_version: None,
        })
    }

    fn resolve_external(&self, name: &str) -> Result<ResolvedBinary, ResolveError> {
        let path = match &self.cfg.override_path {
            Some(path) => {
                if !self.cfg.allow_external {
                    return Err(ResolveError::ExternalNotAllowed {
                        name: name.to_string(),
                        path: path.display().to_string(),
                    });
                }
                if !path.exists() {
                    return Err(ResolveError::BinaryMissing {
                        name: name.to_string(),
                        source_kind: "external",
                        hint: format!("override path {} does not exist", path.display()),
                    });
                }
                path.clone()
            }
            None => {
                if !self.cfg.allow_external {
                    return Err(ResolveError::ExternalNotAllowed {
                        name: name.to_string(),
                        path: format!("{name} from PATH"),
                    });
                }
                local::path_lookup(name).ok_or_else(|| ResolveError::BinaryMissing {
                    name: name.to_string(),
                    source_kind: "external",
                    hint: format!("{name} not found on PATH"),
                })?
            }
        };

        // The local version manifest still states what this installation
        // expects; an external binary is compared against it (warn-only).
        let expected_version = orchestrator_dir()
            .ok()
            .and_then(|dir| local::load_local_manifest(&dir))
            .and_then(|m| m.entry(name).map(|e| e.version.clone()));

        Ok(ResolvedBinary {
            path,
            source: BinaryProvenance::External,
            expected_version,
            actual_version: None,
        })
    }

    /// Probe `--version` and compare against the expectation.
    ///
    /// External binaries downgrade a mismatch to a warning: the user chose
    /// the binary, the orchestrator only annotates the risk.
    async fn verify_version(
        &self,
        name: &str,
        resolved: &mut ResolvedBinary,
    ) -> Result<(), ResolveError> {
        let actual = version::probe_version(&resolved.path, name).await?;
        if let Some(expected) = resolved.expected_version.clone() {
            let external = resolved.source == BinaryProvenance::External;
            version::check_version(name, &expected, &actual, external)?;
        }
        resolved.actual_version = Some(actual);
        Ok(())
    }
}

/// Directory containing the orchestrator executable.
fn orchestrator_dir() -> Result<PathBuf, ResolveError> {
    let exe = std::env::current_exe()?;
    Ok(exe.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")))
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
