//! Health Check Server - Liveness and Readiness Endpoints
//!
//! Exposes /live and /ready endpoints via axum 0.7 for container
//! health checks. Readiness depends on registry and dashboard
//! reachability as observed by the last reconciliation pass, or by a
//! direct check of both sides when that pass was skipped or failed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Shared health state polled by the readiness endpoint.
#[derive(Debug)]
pub struct HealthState {
    /// Whether the registry answered the last query.
    pub registry_healthy: AtomicBool,
    /// Whether the dashboard answered the last query.
    pub dashboard_healthy: AtomicBool,
    /// Cleared once shutdown begins.
    pub running: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Create a new health state (all healthy by default).
    pub fn new() -> Self {
        Self {
            registry_healthy: AtomicBool::new(true),
            dashboard_healthy: AtomicBool::new(true),
            running: AtomicBool::new(true),
        }
    }

    /// Record registry reachability.
    pub fn set_registry(&self, healthy: bool) {
        self.registry_healthy.store(healthy, Ordering::Relaxed);
    }

    /// Record dashboard reachability.
    pub fn set_dashboard(&self, healthy: bool) {
        self.dashboard_healthy.store(healthy, Ordering::Relaxed);
    }

    /// Mark the bridge as shutting down.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Check if the bridge is ready to serve.
    pub fn is_ready(&self) -> bool {
        self.running.load(Ordering::Relaxed)
            && self.registry_healthy.load(Ordering::Relaxed)
            && self.dashboard_healthy.load(Ordering::Relaxed)
    }
}

/// Axum-based health check HTTP server.
pub struct HealthServer {
    /// Health state shared with all components.
    state: Arc<HealthState>,
    /// Bind port (default 8080 from config).
    port: u16,
}

impl HealthServer {
    /// Create a new health server.
    pub fn new(state: Arc<HealthState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Build the health router.
    pub fn router(state: Arc<HealthState>) -> Router {
        Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .with_state(state)
    }

    /// Serve until shutdown.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Self::router(Arc::clone(&self.state));

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness: returns 200 only if both sides are reachable.
    async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
        if state.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }
}
