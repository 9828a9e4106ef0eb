// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! HTTP transport.
//!
//! GET /get?since=<ms> - long-poll for samples newer than `since` (default 0).
//! GET /api/health - liveness.
//! GET /api/stats - retained count, capacity, time bounds, parked polls.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

use airmon_timeline::PollResponse;

use crate::service::{ServiceHandle, Stats};
use crate::shutdown;

/// Application state shared across handlers.
pub struct AppState {
    pub service: ServiceHandle,
}

pub fn router(service: ServiceHandle) -> Router {
    let state = Arc::new(AppState { service });
    Router::new()
        .route("/get", get(get_handler))
        .route("/api/health", get(health_handler))
        .route("/api/stats", get(stats_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` flips to true, then stop accepting and let
/// in-flight requests finish.
pub async fn run_server(
    listener: TcpListener,
    service: ServiceHandle,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "HTTP server listening");
    }
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown::requested(shutdown_rx))
        .await?;
    tracing::debug!("HTTP server stopped");
    Ok(())
}

// --- Handlers ---

#[derive(Debug, Deserialize)]
struct GetQuery {
    #[serde(default)]
    since: i64,
}

/// GET /get - answered when data newer than `since` exists, on expiry with
/// `retry`, or on shutdown with `shutdown`.
async fn get_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GetQuery>,
) -> Json<PollResponse> {
    Json(state.service.poll(query.since).await)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Stats>, StatusCode> {
    state
        .service
        .stats()
        .await
        .map(Json)
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)
}
