//! Prometheus Metrics Registry - Mirroring Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards.
//! Covers event throughput, register/deregister outcomes, and
//! reconciliation timing.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Centralized Prometheus metrics for the bridge.
///
/// All metrics follow the naming convention `registry_admin_bridge_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Registry lifecycle events received, by kind.
    pub events: IntCounterVec,
    /// Dashboard registrations, by outcome (ok / failed).
    pub registrations: IntCounterVec,
    /// Dashboard deregistrations, by outcome (ok / failed).
    pub deregistrations: IntCounterVec,
    /// Reconciliation passes, by outcome (ok / skipped / failed).
    pub reconciliations: IntCounterVec,
    /// Reconciliation pass duration.
    pub reconciliation_duration: Histogram,
    /// Live instances mirrored by the last completed pass.
    pub mirrored_instances: IntGauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let events = IntCounterVec::new(
            Opts::new(
                "registry_admin_bridge_events_total",
                "Registry lifecycle events received",
            ),
            &["kind"],
        )?;

        let registrations = IntCounterVec::new(
            Opts::new(
                "registry_admin_bridge_registrations_total",
                "Dashboard registration attempts",
            ),
            &["outcome"],
        )?;

        let deregistrations = IntCounterVec::new(
            Opts::new(
                "registry_admin_bridge_deregistrations_total",
                "Dashboard deregistration attempts",
            ),
            &["outcome"],
        )?;

        let reconciliations = IntCounterVec::new(
            Opts::new(
                "registry_admin_bridge_reconciliations_total",
                "Reconciliation passes",
            ),
            &["outcome"],
        )?;

        let reconciliation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "registry_admin_bridge_reconciliation_duration_seconds",
                "Reconciliation pass duration in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0]),
        )?;

        let mirrored_instances = IntGauge::new(
            "registry_admin_bridge_mirrored_instances",
            "Live instances mirrored by the last reconciliation, including those kept through dashboard failures",
        )?;

        registry.register(Box::new(events.clone()))?;
        registry.register(Box::new(registrations.clone()))?;
        registry.register(Box::new(deregistrations.clone()))?;
        registry.register(Box::new(reconciliations.clone()))?;
        registry.register(Box::new(reconciliation_duration.clone()))?;
        registry.register(Box::new(mirrored_instances.clone()))?;

        Ok(Self {
            registry,
            events,
            registrations,
            deregistrations,
            reconciliations,
            reconciliation_duration,
            mirrored_instances,
        })
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics);
                async move {
                    match metrics.render() {
                        Ok(body) => (StatusCode::OK, body),
                        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
