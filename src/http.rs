//! HTTP server for Prometheus metrics endpoint.
//!
//! Runs on a separate tokio task and serves `/metrics` for Prometheus scraping.

use axum::{Router, extract::State, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::metrics::BridgeStats;

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler(State(stats): State<Arc<BridgeStats>>) -> String {
    stats.gather()
}

pub fn router(stats: Arc<BridgeStats>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(stats)
}

/// Run the HTTP server for Prometheus metrics.
///
/// Binds to `0.0.0.0:port` and serves until `shutdown` is cancelled.
pub async fn run_http_server(port: u16, stats: Arc<BridgeStats>, shutdown: CancellationToken) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Prometheus HTTP server listening");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind HTTP server");
            return;
        }
    };

    if let Err(e) = axum::serve(listener, router(stats))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
    {
        tracing::error!(error = %e, "HTTP server error");
    }
}
