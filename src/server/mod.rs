pub mod health;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::runner::BatchRunner;

/// Shared application state for the trigger server.
pub struct AppState {
    pub runner: Arc<BatchRunner>,
    pub start_time: Instant,
    /// Held by the batch task for the duration of a batch; one batch per
    /// process at a time.
    pub run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(runner: Arc<BatchRunner>) -> Self {
        Self {
            runner,
            start_time: Instant::now(),
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/reports", get(routes::list_reports))
        .route("/api/run", post(routes::run_batch))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve the trigger API until Ctrl+C or SIGTERM.
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> Result<()> {
    let router = create_router(state);
    let bind_addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Received Ctrl+C signal");
                    }
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM signal");
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received Ctrl+C signal");
    }
}
