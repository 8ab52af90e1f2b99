// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persisted state document.
//!
//! A single JSON file (`state.json`) shared between the foreground CLI and
//! the router daemon. The daemon is the single writer while it is alive; the
//! CLI only writes under the no-live-daemon branch. Every field tolerates
//! absence so documents written by older builds still load.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workspace::Workspace;

/// Current state document schema version.
pub const STATE_VERSION: u32 = 1;

/// A live service endpoint record (daemon or engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub pid: u32,
    pub port: u16,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
}

/// How a sidecar binary was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryProvenance {
    Bundled,
    Downloaded,
    External,
}

/// Diagnostics entry for one resolved sidecar binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryRecord {
    pub path: String,
    pub source: BinaryProvenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_version: Option<String>,
}

/// Where sidecars were sourced from for this installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SidecarRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Run diagnostics surfaced through `/health` and `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    #[serde(default)]
    pub binaries: BTreeMap<String, BinaryRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidecar: Option<SidecarRecord>,
}

/// The state document persisted at `<data-dir>/state.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon: Option<ServiceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<ServiceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidecar: Option<SidecarRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binaries: Option<BTreeMap<String, BinaryRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_id: Option<String>,
    #[serde(default)]
    pub workspaces: Vec<Workspace>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            daemon: None,
            engine: None,
            cli_version: None,
            sidecar: None,
            binaries: None,
            active_id: None,
            workspaces: Vec::new(),
        }
    }
}

impl PersistedState {
    /// Insert or merge a workspace by id.
    ///
    /// An existing entry keeps its `created_at` and takes the newer name and
    /// `last_used_at`; a fresh entry is appended. Returns the stored id.
    pub fn upsert_workspace(&mut self, ws: Workspace) -> String {
        let id = ws.id.clone();
        match self.workspaces.iter_mut().find(|w| w.id == ws.id) {
            Some(existing) => {
                existing.name = ws.name;
                existing.last_used_at = ws.last_used_at;
            }
            None => self.workspaces.push(ws),
        }
        if self.active_id.is_none() {
            self.active_id = Some(id.clone());
        }
        id
    }

    pub fn workspace(&self, id: &str) -> Option<&Workspace> {
        self.workspaces.iter().find(|w| w.id == id)
    }

    pub fn workspace_mut(&mut self, id: &str) -> Option<&mut Workspace> {
        self.workspaces.iter_mut().find(|w| w.id == id)
    }

    pub fn active_workspace(&self) -> Option<&Workspace> {
        self.active_id.as_deref().and_then(|id| self.workspace(id))
    }

    /// Make `id` the active workspace and touch its `last_used_at`.
    ///
    /// Returns false when the id is unknown.
    pub fn activate(&mut self, id: &str) -> bool {
        let Some(ws) = self.workspace_mut(id) else {
            return false;
        };
        ws.last_used_at = Utc::now();
        self.active_id = Some(id.to_string());
        true
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
