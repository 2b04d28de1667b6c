//! Registry Admin Bridge — Entry Point
//!
//! Initializes configuration, logging, the registry and dashboard
//! adapters, and the mirroring tasks. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Parse CLI, load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Build filter, converter and id generator from config
//! 4. Create registry adapter (Eureka HTTP + poller, or static)
//! 5. Create dashboard adapter (admin server HTTP, or in-memory)
//! 6. Spawn health server and Prometheus metrics server
//! 7. Spawn registration listener and reconciler loop
//! 8. Wait for SIGINT → broadcast shutdown → await tasks

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use registry_admin_bridge::adapters::admin::AdminClient;
use registry_admin_bridge::adapters::eureka::{EurekaClient, EurekaEventPoller};
use registry_admin_bridge::adapters::http::{HttpClient, HttpClientConfig};
use registry_admin_bridge::adapters::memory::{InMemoryDashboard, StaticServiceRegistry};
use registry_admin_bridge::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use registry_admin_bridge::config::{self, AppConfig};
use registry_admin_bridge::domain::id::InstanceIdGenerator;
use registry_admin_bridge::domain::instance::RegistryEvent;
use registry_admin_bridge::ports::dashboard::InstanceRegistry;
use registry_admin_bridge::ports::registry::{RegistryEvents, ServiceRegistry};
use registry_admin_bridge::usecases::{InstanceRegistrar, Reconciler, RegistrationListener};

/// Mirror service-registry instances into an admin dashboard.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "BRIDGE_CONFIG", default_value = "config.toml")]
    config: String,
}

/// Handles shared by every mirroring task.
struct Runtime {
    config: AppConfig,
    health: Arc<HealthState>,
    metrics: Option<Arc<MetricsRegistry>>,
    shutdown_tx: broadcast::Sender<()>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1. Load configuration ───────────────────────────────
    let config = config::loader::load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.bridge.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.bridge.name,
        version = env!("CARGO_PKG_VERSION"),
        source = %config.bridge.source,
        "Starting registry admin bridge"
    );

    // ── 3. Shutdown signal and shared state ─────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let health = Arc::new(HealthState::new());
    let metrics = if config.metrics.enabled {
        Some(Arc::new(MetricsRegistry::new().context("Failed to create metrics registry")?))
    } else {
        None
    };

    let mut handles = Vec::new();

    // ── 4. Health and metrics servers ───────────────────────
    if config.metrics.enabled {
        let server = HealthServer::new(Arc::clone(&health), config.metrics.health_port);
        let rx = shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            if let Err(e) = server.run(rx).await {
                error!(error = %e, "Health server failed");
            }
        }));
    }
    if let Some(metrics) = &metrics {
        let metrics = Arc::clone(metrics);
        let bind_address = config.metrics.bind_address.clone();
        let rx = shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            if let Err(e) = metrics.serve(bind_address, rx).await {
                error!(error = %e, "Metrics server failed");
            }
        }));
    }

    let runtime = Runtime {
        config,
        health: Arc::clone(&health),
        metrics,
        shutdown_tx: shutdown_tx.clone(),
    };

    // ── 5. Registry adapter ─────────────────────────────────
    if let Some(url) = runtime.config.registry.url.clone() {
        let registry = &runtime.config.registry;
        let http = HttpClient::new(
            HttpClientConfig::new(url.as_str(), registry.timeout())
                .with_basic_auth(registry.username.clone(), registry.password.clone()),
        )
        .context("Failed to create Eureka HTTP client")?;
        let client = Arc::new(EurekaClient::new(Arc::new(http)));
        let poller = Arc::new(EurekaEventPoller::new(Arc::clone(&client), registry.poll_interval()));
        let events = poller.subscribe();

        let rx = shutdown_tx.subscribe();
        let task = Arc::clone(&poller);
        handles.push(tokio::spawn(async move {
            if let Err(e) = task.run(rx).await {
                error!(error = %e, "Eureka poller failed");
            }
        }));

        info!(url = %url, "Using Eureka registry");
        handles.extend(with_dashboard(&runtime, client, events)?);
    } else {
        let registry = Arc::new(StaticServiceRegistry::seeded(
            runtime
                .config
                .registry
                .static_instances
                .iter()
                .map(config::StaticInstanceConfig::to_descriptor),
        ));
        let events = registry.subscribe();

        info!(
            instances = runtime.config.registry.static_instances.len(),
            "Using static registry"
        );
        handles.extend(with_dashboard(&runtime, registry, events)?);
    }

    info!("All tasks spawned, bridge is running");

    // ── 8. Wait for SIGINT ──────────────────────────────────
    signal::ctrl_c().await.context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");

    health.stop();
    let _ = shutdown_tx.send(());

    for handle in handles {
        if tokio::time::timeout(Duration::from_secs(10), handle).await.is_err() {
            warn!("Task did not stop within timeout");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Pick the dashboard adapter and spawn the mirroring tasks.
fn with_dashboard<R: ServiceRegistry>(
    runtime: &Runtime,
    registry: Arc<R>,
    events: broadcast::Receiver<RegistryEvent>,
) -> Result<Vec<JoinHandle<()>>> {
    let dashboard = &runtime.config.dashboard;
    match &dashboard.url {
        Some(url) => {
            let http = HttpClient::new(
                HttpClientConfig::new(url.as_str(), dashboard.timeout())
                    .with_basic_auth(dashboard.username.clone(), dashboard.password.clone()),
            )
            .context("Failed to create admin server HTTP client")?;
            info!(url = %url, "Using admin server dashboard");
            Ok(spawn_mirror(runtime, registry, events, Arc::new(AdminClient::new(Arc::new(http)))))
        }
        None => {
            warn!("No dashboard URL configured, mirroring into memory only");
            let dashboard = Arc::new(InMemoryDashboard::new(InstanceIdGenerator::new()));
            Ok(spawn_mirror(runtime, registry, events, dashboard))
        }
    }
}

/// Spawn the registration listener and the reconciler loop.
fn spawn_mirror<R: ServiceRegistry, D: InstanceRegistry>(
    runtime: &Runtime,
    registry: Arc<R>,
    events: broadcast::Receiver<RegistryEvent>,
    dashboard: Arc<D>,
) -> Vec<JoinHandle<()>> {
    let config = &runtime.config;

    let mut registrar = InstanceRegistrar::new(
        dashboard,
        config.service_filter(),
        config.instance_converter(),
        InstanceIdGenerator::new(),
    );
    if let Some(metrics) = &runtime.metrics {
        registrar = registrar.with_metrics(Arc::clone(metrics));
    }
    let registrar = Arc::new(registrar);

    let reconciler = Arc::new(
        Reconciler::new(registry, Arc::clone(&registrar)).with_health(Arc::clone(&runtime.health)),
    );
    let listener = Arc::new(RegistrationListener::new(registrar, reconciler.trigger()));

    let listener_rx = runtime.shutdown_tx.subscribe();
    let listener_handle = tokio::spawn(async move {
        if let Err(e) = listener.run(events, listener_rx).await {
            error!(error = %e, "Registration listener failed");
        }
    });

    let interval = config.discovery.reconcile_interval();
    let reconciler_rx = runtime.shutdown_tx.subscribe();
    let reconciler_handle = tokio::spawn(async move {
        if let Err(e) = reconciler.run(interval, reconciler_rx).await {
            error!(error = %e, "Reconciler failed");
        }
    });

    vec![listener_handle, reconciler_handle]
}
