//! HTTP API for the docking job core.
//!
//! Request/response boundary only; clients poll `GET /docking/jobs/{id}`
//! until they observe a terminal status, then fetch results. No push
//! channel is offered here.
//!
//! ## Endpoints
//!
//! - `POST /docking/jobs` — submit a job
//! - `GET /docking/jobs` — list jobs (newest first)
//! - `GET /docking/jobs/{id}` — status, progress, timestamps
//! - `PUT /docking/jobs/{id}/cancel` — request cancellation
//! - `DELETE /docking/jobs/{id}` — delete a terminal job
//! - `GET /docking/jobs/{id}/results` — pose results of a completed job
//! - `POST /docking/validate-parameters` — dry-run parameter check
//! - `GET /docking/stats` — aggregate counters
//! - `GET /health` — daemon status

mod handlers;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::net::SocketAddr;
use tokio::sync::broadcast;

use crate::context::AppContext;

/// Web server for the job API.
pub struct WebServer {
    bind_addr: SocketAddr,
    ctx: AppContext,
    shutdown_tx: broadcast::Sender<()>,
}

impl WebServer {
    pub fn new(ctx: AppContext, bind_addr: SocketAddr) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            bind_addr,
            ctx,
            shutdown_tx,
        }
    }

    /// Start the server. Runs until shutdown() is called.
    pub async fn start(&self) -> anyhow::Result<()> {
        let app = router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;
        tracing::info!(addr = %self.bind_addr, "Docking API listening");

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Signal the server to shut down gracefully.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Build the API router. Separated from [`WebServer`] so tests can drive
/// handlers without binding a socket.
pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route(
            "/docking/jobs",
            post(handlers::submit_job).get(handlers::list_jobs),
        )
        .route(
            "/docking/jobs/{id}",
            get(handlers::get_job).delete(handlers::delete_job),
        )
        .route("/docking/jobs/{id}/cancel", put(handlers::cancel_job))
        .route("/docking/jobs/{id}/results", get(handlers::get_results))
        .route(
            "/docking/validate-parameters",
            post(handlers::validate_parameters),
        )
        .route("/docking/stats", get(handlers::stats))
        .route("/health", get(handlers::health))
        .with_state(ctx)
}
