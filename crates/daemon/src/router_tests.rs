// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use openwork_core::Workspace;
use openwork_resolver::{ResolverConfig, SourcePreference};
use serde_json::{json, Value};

use super::*;
use crate::engine::EngineLauncher;
use crate::DaemonError;

struct NeverLauncher;

#[async_trait]
impl EngineLauncher for NeverLauncher {
    async fn spawn(&self, _workspace: &Workspace, _port: u16) -> Result<u32, DaemonError> {
        Err(DaemonError::EngineSpawn("not available in router tests".to_string()))
    }
}

fn test_ctx(dir: &std::path::Path) -> Arc<DaemonCtx> {
    let cfg = DaemonConfig {
        data_dir: dir.to_path_buf(),
        host: "127.0.0.1".to_string(),
        port: 0,
        engine_host: "127.0.0.1".to_string(),
        engine_port: 0,
        engine_cors: vec![],
        engine_auth: None,
        resolver: ResolverConfig {
            source: SourcePreference::Auto,
            allow_external: false,
            cache_dir: dir.join("sidecars"),
            base_url: "https://releases.invalid".to_string(),
            manifest_url: "https://releases.invalid/manifest.json".to_string(),
            sandbox: false,
            override_path: None,
        },
        run_id: "run-router".to_string(),
    };
    let store = StateStore::new(dir);
    let state = Mutex::new(store.load());
    Arc::new(DaemonCtx {
        cfg,
        store,
        state,
        engine: EngineManager::new(Arc::new(NeverLauncher), "127.0.0.1".to_string(), 0),
        client: reqwest::Client::new(),
        diagnostics: Arc::new(Mutex::new(Diagnostics::default())),
        start_time: Instant::now(),
        shutdown: Arc::new(Notify::new()),
    })
}

/// Serve the router on an ephemeral loopback port.
async fn serve(ctx: Arc<DaemonCtx>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(ctx);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn health_answers_with_counts() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(test_ctx(dir.path())).await;

    let body: Value =
        reqwest::get(format!("{base}/health")).await.unwrap().json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["workspaceCount"], 0);
    assert!(body["activeId"].is_null());
}

#[tokio::test]
async fn workspace_add_is_idempotent_and_sets_active() {
    let dir = tempfile::tempdir().unwrap();
    let ws_path = dir.path().join("proj");
    let base = serve(test_ctx(dir.path())).await;
    let client = reqwest::Client::new();

    let first: Value = client
        .post(format!("{base}/workspaces"))
        .json(&json!({ "path": ws_path }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let second: Value = client
        .post(format!("{base}/workspaces"))
        .json(&json!({ "path": ws_path, "name": "renamed" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(first["id"], second["id"], "same path must upsert, not duplicate");

    let list: Value =
        client.get(format!("{base}/workspaces")).send().await.unwrap().json().await.unwrap();
    assert_eq!(list["workspaces"].as_array().unwrap().len(), 1);
    assert_eq!(list["activeId"], first["id"]);
    assert!(ws_path.is_dir(), "add must ensure the directory exists");
}

#[tokio::test]
async fn remote_workspace_requires_http_scheme() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(test_ctx(dir.path())).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/workspaces/remote"))
        .json(&json!({ "baseUrl": "ftp://box" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{base}/workspaces/remote"))
        .json(&json!({ "baseUrl": "http://box:8100", "directory": "proj" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let ws: Value = resp.json().await.unwrap();
    assert_eq!(ws["workspaceType"], "remote");
}

#[tokio::test]
async fn unknown_workspace_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(test_ctx(dir.path())).await;
    let client = reqwest::Client::new();

    let resp =
        client.get(format!("{base}/workspaces/ws-ffffffffffffffff")).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .post(format!("{base}/workspaces/ws-ffffffffffffffff/activate"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn activate_switches_without_touching_engine() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path());
    let a = Workspace::local(&dir.path().join("a"), None);
    let b = Workspace::local(&dir.path().join("b"), None);
    let b_id = b.id.clone();
    {
        let mut state = ctx.state.lock();
        state.upsert_workspace(a);
        state.upsert_workspace(b);
    }
    let base = serve(ctx).await;
    let client = reqwest::Client::new();

    // NeverLauncher would fail any engine spawn; activation must not try.
    let resp =
        client.post(format!("{base}/workspaces/{b_id}/activate")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let health: Value =
        client.get(format!("{base}/health")).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["activeId"], b_id);
    assert!(health["engine"].is_null());
}

#[tokio::test]
async fn preflight_returns_204_with_cors_headers() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(test_ctx(dir.path())).await;
    let client = reqwest::Client::new();

    let resp = client
        .request(reqwest::Method::OPTIONS, format!("{base}/workspaces"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert!(resp.headers()["access-control-allow-methods"]
        .to_str()
        .unwrap()
        .contains("POST"));
}

#[tokio::test]
async fn shutdown_clears_daemon_record_and_notifies() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path());
    ctx.state.lock().daemon = Some(openwork_core::ServiceRecord {
        pid: std::process::id(),
        port: 7483,
        base_url: "http://127.0.0.1:7483".to_string(),
        started_at: chrono::Utc::now(),
    });
    let shutdown = Arc::clone(&ctx.shutdown);
    let store = ctx.store.clone();
    let base = serve(ctx).await;

    let notified = shutdown.notified();
    let resp = reqwest::Client::new()
        .post(format!("{base}/shutdown"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    notified.await;

    assert!(store.load().daemon.is_none(), "daemon record must be cleared");
}
