// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic workspace identifiers.
//!
//! A workspace id is a pure function of what the workspace points at, so
//! re-adding the same directory (or the same remote) always yields the same
//! id and never a second entry. Ids are `ws-` followed by the first 16 hex
//! characters of a SHA-256 over a type-tagged input.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Type prefix for workspace ids.
pub const WORKSPACE_ID_PREFIX: &str = "ws-";

/// Number of hex characters kept from the digest.
const ID_HEX_LEN: usize = 16;

/// Returns a string slice truncated to at most `n` characters.
pub fn short(s: &str, n: usize) -> &str {
    if s.len() <= n {
        s
    } else {
        &s[..n]
    }
}

/// Id for a local workspace rooted at `path`.
///
/// The path is used as given (callers normalize before hashing); the
/// `local:` tag keeps local and remote ids in disjoint spaces even for
/// identical strings.
pub fn local_workspace_id(path: &Path) -> String {
    digest_id(&format!("local:{}", path.display()))
}

/// Id for a remote workspace at `base_url`, optionally scoped to `directory`.
///
/// The hash input is `baseUrl + "::" + directory`. The `"::"` separator is
/// load-bearing: it keeps `("http://a/b", "c")` and `("http://a", "b/c")`
/// from colliding.
pub fn remote_workspace_id(base_url: &str, directory: Option<&str>) -> String {
    digest_id(&format!("remote:{}::{}", base_url, directory.unwrap_or("")))
}

fn digest_id(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(WORKSPACE_ID_PREFIX.len() + ID_HEX_LEN);
    hex.push_str(WORKSPACE_ID_PREFIX);
    for byte in digest.iter().take(ID_HEX_LEN / 2) {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
