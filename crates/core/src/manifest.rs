// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sidecar manifests and target triples.
//!
//! Two manifest shapes exist: the remote sidecar manifest served over HTTP
//! (versions + per-triple assets) and the local version manifest shipped
//! next to the orchestrator executable (expected version + SHA-256 per
//! binary, byte-stable only on reproducible-build platforms).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Operating system half of a target triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Darwin,
    Windows,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        };
        write!(f, "{s}")
    }
}

/// CPU architecture half of a target triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X64,
    Arm64,
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
        };
        write!(f, "{s}")
    }
}

/// A `{platform}-{arch}` pair keying manifest targets, e.g. `linux-arm64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetTriple {
    pub platform: Platform,
    pub arch: Arch,
}

impl TargetTriple {
    /// Triple of the running host.
    pub fn host() -> Self {
        let platform = if cfg!(target_os = "macos") {
            Platform::Darwin
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        };
        let arch = if cfg!(target_arch = "aarch64") { Arch::Arm64 } else { Arch::X64 };
        Self { platform, arch }
    }

    /// Triple for binaries that will run inside the sandbox container:
    /// always Linux, matching the host architecture.
    pub fn sandbox_host() -> Self {
        Self { platform: Platform::Linux, arch: Self::host().arch }
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.platform, self.arch)
    }
}

/// One downloadable asset for a `(binary, triple)` pair.
///
/// Either `url` (absolute) or `asset` (joined onto the manifest base URL)
/// locates the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TargetAsset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Manifest entry for one binary name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub version: String,
    #[serde(default)]
    pub targets: BTreeMap<String, TargetAsset>,
}

/// The remote sidecar manifest document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarManifest {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub entries: BTreeMap<String, ManifestEntry>,
}

impl SidecarManifest {
    /// The asset for `name` on `triple`, if the manifest carries one.
    pub fn target(&self, name: &str, triple: TargetTriple) -> Option<(&ManifestEntry, &TargetAsset)> {
        let entry = self.entries.get(name)?;
        let asset = entry.targets.get(&triple.to_string())?;
        Some((entry, asset))
    }
}

/// Expected version + digest for one bundled binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalManifestEntry {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// The local version manifest: `{ <binary-name>: { version, sha256 } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct LocalManifest(pub BTreeMap<String, LocalManifestEntry>);

impl LocalManifest {
    pub fn entry(&self, name: &str) -> Option<&LocalManifestEntry> {
        self.0.get(name)
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
