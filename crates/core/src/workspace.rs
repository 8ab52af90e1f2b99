// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace records.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{local_workspace_id, remote_workspace_id};

/// Whether a workspace targets a local directory or a remote server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceType {
    Local,
    Remote,
}

/// A named target the engine acts over.
///
/// The id never mutates after creation; it is derived from the workspace's
/// identity (see [`crate::id`]), so upserts by id are the natural merge
/// operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    pub workspace_type: WorkspaceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl Workspace {
    /// Build a local workspace record for `path`.
    pub fn local(path: &Path, name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: local_workspace_id(path),
            name: name.unwrap_or_else(|| display_name(path)),
            path: path.to_path_buf(),
            workspace_type: WorkspaceType::Local,
            base_url: None,
            directory: None,
            created_at: now,
            last_used_at: now,
        }
    }

    /// Build a remote workspace record for `base_url` (+ optional directory).
    pub fn remote(base_url: &str, directory: Option<String>, name: Option<String>) -> Self {
        let now = Utc::now();
        let name = name.unwrap_or_else(|| match &directory {
            Some(dir) if !dir.is_empty() => format!("{} ({})", base_url, dir),
            _ => base_url.to_string(),
        });
        Self {
            id: remote_workspace_id(base_url, directory.as_deref()),
            name,
            path: PathBuf::new(),
            workspace_type: WorkspaceType::Remote,
            base_url: Some(base_url.to_string()),
            directory,
            created_at: now,
            last_used_at: now,
        }
    }

    pub fn is_local(&self) -> bool {
        self.workspace_type == WorkspaceType::Local
    }
}

/// Human name for a local workspace: the final path component.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
