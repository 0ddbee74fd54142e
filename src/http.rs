//! HTTP status/health endpoints.
//!
//! Runs on its own tokio task and never touches engine state: it reports
//! liveness, uptime and coarse process memory only.

use axum::{extract::State, routing::get, Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Read-only data backing the status endpoints.
pub struct HealthState {
    pub server_name: String,
    pub started: Instant,
}

/// Resident set size in kilobytes, read from procfs. None off Linux or if
/// the file is unreadable.
fn rss_kb() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    line.split_whitespace().nth(1)?.parse().ok()
}

async fn status_handler(State(state): State<Arc<HealthState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "online",
        "server": state.server_name,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn health_handler(State(state): State<Arc<HealthState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "uptimeSeconds": state.started.elapsed().as_secs(),
        "memoryKb": rss_kb(),
    }))
}

/// Run the HTTP server for the status and health endpoints.
///
/// Binds `0.0.0.0:port`; long-running, spawn it in the background.
pub async fn run_http_server(port: u16, state: Arc<HealthState>) {
    let app = Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/health", get(health_handler))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(addr = %addr, "health endpoint listening");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "failed to bind health endpoint");
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "health endpoint error");
    }
}
