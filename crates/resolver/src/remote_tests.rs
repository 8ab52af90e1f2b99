// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::{Read, Write};
use std::net::TcpListener;

use super::*;

fn serve_bytes(body: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let header = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(header.as_bytes());
            let _ = stream.write_all(body);
        }
    });
    format!("http://{addr}/assets/opencode-linux-x64")
}

fn target(asset: Option<&str>, url: Option<&str>, sha: Option<&str>) -> TargetAsset {
    TargetAsset {
        asset: asset.map(String::from),
        url: url.map(String::from),
        sha256: sha.map(String::from),
        size: None,
    }
}

#[test]
fn absolute_url_wins_over_asset() {
    let t = target(Some("opencode-linux-x64"), Some("https://cdn.example/x"), None);
    assert_eq!(asset_url("https://base.example", "opencode", &t).unwrap(), "https://cdn.example/x");
}

#[test]
fn relative_asset_joins_base_url() {
    let t = target(Some("opencode-linux-x64"), None, None);
    assert_eq!(
        asset_url("https://base.example/", "opencode", &t).unwrap(),
        "https://base.example/opencode-linux-x64"
    );
}

#[test]
fn neither_url_nor_asset_is_none() {
    assert!(asset_url("https://base.example", "opencode", &target(None, None, None)).is_none());
}

#[test]
fn cache_check_requires_matching_digest() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("asset");
    assert!(!cached(&dest, None).unwrap());

    std::fs::write(&dest, b"abc").unwrap();
    assert!(cached(&dest, None).unwrap());
    assert!(cached(
        &dest,
        Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
    )
    .unwrap());
    assert!(!cached(&dest, Some("deadbeef")).unwrap());
}

#[tokio::test]
async fn download_verifies_digest_and_renames_into_place() {
    let url = serve_bytes(b"abc");
    let client = http_client();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("1.2.3/linux-x64/opencode-linux-x64");

    download(
        &client,
        &url,
        &dest,
        Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"),
        "opencode",
    )
    .await
    .unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), b"abc");
    // No temp droppings left behind.
    let entries: Vec<_> = std::fs::read_dir(dest.parent().unwrap()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn download_rejects_digest_mismatch() {
    let url = serve_bytes(b"tampered");
    let client = http_client();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("asset");

    let err = download(&client, &url, &dest, Some("00ff"), "opencode").await.unwrap_err();
    assert!(matches!(err, ResolveError::HashMismatch { .. }));
    assert!(!dest.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn downloaded_files_are_executable() {
    use std::os::unix::fs::PermissionsExt;

    let url = serve_bytes(b"#!/bin/sh\n");
    let client = http_client();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("bin");

    download(&client, &url, &dest, None, "opencode").await.unwrap();
    let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
    assert_eq!(mode & 0o111, 0o111);
}
