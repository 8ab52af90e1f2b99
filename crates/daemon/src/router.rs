// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane router and shared request context.

use std::sync::Arc;
use std::time::Instant;

use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use openwork_core::{Diagnostics, PersistedState};
use openwork_storage::StateStore;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tower_http::cors::{Any, CorsLayer};

use crate::engine::EngineManager;
use crate::{DaemonConfig, DaemonError};

/// Shared daemon context for all request handlers.
pub struct DaemonCtx {
    pub cfg: DaemonConfig,
    pub store: StateStore,
    pub state: Mutex<PersistedState>,
    pub engine: EngineManager,
    pub client: reqwest::Client,
    /// Shared with the engine launcher, which records resolved binaries.
    pub diagnostics: Arc<Mutex<Diagnostics>>,
    pub start_time: Instant,
    pub shutdown: Arc<Notify>,
}

/// Build the control-plane router.
///
/// CORS is permissive: any origin, GET/POST/OPTIONS. `CorsLayer` answers
/// preflights itself with 200; the outer middleware rewrites those to the
/// 204 the desktop shell expects.
pub fn router(ctx: Arc<DaemonCtx>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    Router::new()
        .route("/health", get(crate::routes::health))
        .route("/workspaces", get(crate::routes::list_workspaces).post(crate::routes::add_workspace))
        .route("/workspaces/remote", post(crate::routes::add_remote_workspace))
        .route("/workspaces/:id", get(crate::routes::get_workspace))
        .route("/workspaces/:id/activate", post(crate::routes::activate_workspace))
        .route("/workspaces/:id/path", get(crate::routes::workspace_path))
        .route("/instances/:id/dispose", post(crate::routes::dispose_instance))
        .route("/shutdown", post(crate::routes::shutdown))
        .layer(cors)
        .layer(middleware::from_fn(preflight_no_content))
        .with_state(ctx)
}

async fn preflight_no_content(request: axum::extract::Request, next: Next) -> Response {
    let preflight = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;
    if preflight && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

impl IntoResponse for DaemonError {
    fn into_response(self) -> Response {
        let status = match &self {
            DaemonError::WorkspaceNotFound(_) => StatusCode::NOT_FOUND,
            DaemonError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DaemonError::NoActiveWorkspace => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
