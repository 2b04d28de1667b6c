//! Reconciler Use Case - Full Registry → Dashboard Resynchronization
//!
//! Corrects drift between the registry's live set and the dashboard's
//! mirrored set. A pass:
//! 1. Lists every application in the registry
//! 2. Filters by the include/exclude rule and flattens to instances
//! 3. Registers each instance, collecting the live id set
//! 4. Deregisters every source-tagged, registered dashboard record
//!    whose id is not live
//!
//! Runs on a fixed interval and whenever the listener pulls the
//! trigger (cancellations, lagged event streams).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::metrics::HealthState;
use crate::domain::instance::InstanceId;
use crate::ports::dashboard::InstanceRegistry;
use crate::ports::registry::{RegistryError, ServiceRegistry};

use super::registrar::InstanceRegistrar;

/// Aggregated result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
  /// Registry was unavailable; nothing was done.
  pub skipped: bool,
  /// Instances the dashboard accepted.
  pub registered: usize,
  /// Instances that failed conversion or registration.
  pub failed: usize,
  /// Instances counted as mirrored: accepted, or kept after a
  /// dashboard failure.
  pub live: usize,
  /// Stale records deregistered.
  pub deregistered: usize,
  /// Stale records whose deregistration failed.
  pub deregister_failed: usize,
  /// When the pass finished.
  pub timestamp: DateTime<Utc>,
}

impl ReconciliationReport {
  fn skipped() -> Self {
    Self {
      skipped: true,
      registered: 0,
      failed: 0,
      live: 0,
      deregistered: 0,
      deregister_failed: 0,
      timestamp: Utc::now(),
    }
  }
}

/// Periodic and on-demand reconciliation of registry and dashboard.
pub struct Reconciler<R: ServiceRegistry, D: InstanceRegistry> {
  /// Registry query port.
  registry: Arc<R>,
  /// Shared convert/register step.
  registrar: Arc<InstanceRegistrar<D>>,
  /// On-demand trigger; permits coalesce.
  trigger: Arc<Notify>,
  /// Optional readiness state updated after each pass.
  health: Option<Arc<HealthState>>,
}

impl<R: ServiceRegistry, D: InstanceRegistry> Reconciler<R, D> {
  /// Create a new reconciler.
  pub fn new(registry: Arc<R>, registrar: Arc<InstanceRegistrar<D>>) -> Self {
    Self {
      registry,
      registrar,
      trigger: Arc::new(Notify::new()),
      health: None,
    }
  }

  /// Attach readiness state.
  #[must_use]
  pub fn with_health(mut self, health: Arc<HealthState>) -> Self {
    self.health = Some(health);
    self
  }

  /// Handle used to request a pass.
  ///
  /// Any number of `notify_one` calls before the loop wakes up result
  /// in a single pass.
  pub fn trigger(&self) -> Arc<Notify> {
    Arc::clone(&self.trigger)
  }

  /// Run one reconciliation pass.
  ///
  /// # Errors
  /// Returns an error when the registry query fails for a reason other
  /// than unavailability, or when the dashboard's instance list cannot
  /// be read. Individual register/deregister failures are counted in
  /// the report instead.
  #[instrument(skip(self), name = "reconcile")]
  pub async fn reconcile(&self) -> Result<ReconciliationReport> {
    let started = Instant::now();
    let result = self.reconcile_inner().await;
    self.observe(&result, started.elapsed());
    if !matches!(&result, Ok(report) if !report.skipped) {
      self.refresh_health().await;
    }
    result
  }

  /// Ask both sides directly whether they are reachable.
  ///
  /// A skipped or failed pass leaves at least one side unobserved, so
  /// readiness is refreshed from the ports instead.
  pub async fn refresh_health(&self) {
    let Some(health) = &self.health else {
      return;
    };
    let (registry, dashboard) = tokio::join!(
      self.registry.is_healthy(),
      self.registrar.dashboard().is_healthy()
    );
    health.set_registry(registry);
    health.set_dashboard(dashboard);
  }

  async fn reconcile_inner(&self) -> Result<ReconciliationReport> {
    let applications = match self.registry.applications().await {
      Ok(apps) => {
        self.set_registry_health(true);
        apps
      }
      Err(RegistryError::Unavailable) => {
        self.set_registry_health(false);
        debug!("Registry unavailable, skipping reconciliation");
        return Ok(ReconciliationReport::skipped());
      }
      Err(RegistryError::Other(e)) => {
        self.set_registry_health(false);
        return Err(e.context("Failed to list registry applications"));
      }
    };

    // Phase 1: register every live, included instance
    let descriptors: Vec<_> = applications
      .iter()
      .filter(|app| self.registrar.should_register(&app.name))
      .flat_map(|app| app.instances.iter())
      .collect();

    let outcomes = join_all(descriptors.iter().map(|d| self.registrar.register(d))).await;

    let registered = outcomes.iter().filter(|o| o.is_registered()).count();
    let failed = outcomes.len() - registered;
    let live: HashSet<InstanceId> = outcomes
      .iter()
      .filter_map(|o| o.live_id().cloned())
      .collect();

    // Phase 2: deregister stale records owned by this bridge
    let dashboard = self.registrar.dashboard();
    let instances = match dashboard.instances().await {
      Ok(instances) => {
        self.set_dashboard_health(true);
        instances
      }
      Err(e) => {
        self.set_dashboard_health(false);
        return Err(e).context("Failed to list dashboard instances");
      }
    };

    let source = self.registrar.source();
    let stale: Vec<InstanceId> = instances
      .into_iter()
      .filter(|i| i.is_registered_from(source))
      .map(|i| i.id)
      .filter(|id| !live.contains(id))
      .collect();

    let results = join_all(stale.iter().map(|id| async move {
      info!(id = %id, "Instance missing in registry, deregistering");
      match dashboard.deregister(id).await {
        Ok(()) => true,
        Err(e) => {
          warn!(id = %id, error = %e, "Failed to deregister stale instance");
          false
        }
      }
    }))
    .await;

    let deregistered = results.iter().filter(|ok| **ok).count();
    if let Some(metrics) = self.registrar.metrics() {
      metrics
        .deregistrations
        .with_label_values(&["ok"])
        .inc_by(deregistered as u64);
      metrics
        .deregistrations
        .with_label_values(&["failed"])
        .inc_by((results.len() - deregistered) as u64);
    }

    Ok(ReconciliationReport {
      skipped: false,
      registered,
      failed,
      live: live.len(),
      deregistered,
      deregister_failed: results.len() - deregistered,
      timestamp: Utc::now(),
    })
  }

  /// Run passes on `interval` and on trigger until shutdown.
  ///
  /// The first pass runs immediately. Passes never overlap.
  #[instrument(skip(self, shutdown_rx))]
  pub async fn run(
    self: Arc<Self>,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
  ) -> Result<()> {
    info!(interval_secs = interval.as_secs(), "Reconciler started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Reconciler shutting down");
          return Ok(());
        }
        () = self.trigger.notified() => {
          debug!("Reconciliation triggered");
        }
        _ = ticker.tick() => {}
      }

      if let Err(e) = self.reconcile().await {
        error!(error = %e, "Reconciliation failed");
      }
    }
  }

  fn observe(&self, result: &Result<ReconciliationReport>, elapsed: Duration) {
    match result {
      Ok(report) if report.skipped => {}
      Ok(report) => info!(
        registered = report.registered,
        failed = report.failed,
        deregistered = report.deregistered,
        deregister_failed = report.deregister_failed,
        elapsed_ms = elapsed.as_millis() as u64,
        "Reconciliation complete"
      ),
      Err(_) => {}
    }

    let Some(metrics) = self.registrar.metrics() else {
      return;
    };
    let outcome = match result {
      Ok(report) if report.skipped => "skipped",
      Ok(report) => {
        metrics.mirrored_instances.set(report.live as i64);
        "ok"
      }
      Err(_) => "failed",
    };
    metrics.reconciliations.with_label_values(&[outcome]).inc();
    metrics.reconciliation_duration.observe(elapsed.as_secs_f64());
  }

  fn set_registry_health(&self, healthy: bool) {
    if let Some(health) = &self.health {
      health.set_registry(healthy);
    }
  }

  fn set_dashboard_health(&self, healthy: bool) {
    if let Some(health) = &self.health {
      health.set_dashboard(healthy);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use async_trait::async_trait;

  use super::*;
  use crate::adapters::memory::{InMemoryDashboard, StaticServiceRegistry};
  use crate::domain::converter::ServiceInstanceConverter;
  use crate::domain::id::InstanceIdGenerator;
  use crate::domain::instance::{
    Application, Registration, RegistryEvent, ServiceDescriptor, DEFAULT_SOURCE,
  };
  use crate::domain::pattern::ServiceFilter;
  use crate::usecases::listener::RegistrationListener;

  fn registrar(
    dashboard: Arc<InMemoryDashboard>,
    filter: ServiceFilter,
  ) -> Arc<InstanceRegistrar<InMemoryDashboard>> {
    Arc::new(InstanceRegistrar::new(
      dashboard,
      filter,
      ServiceInstanceConverter::new("/actuator", "health", DEFAULT_SOURCE),
      InstanceIdGenerator::new(),
    ))
  }

  fn reconciler(
    registry: Arc<StaticServiceRegistry>,
    dashboard: Arc<InMemoryDashboard>,
    filter: ServiceFilter,
  ) -> Reconciler<StaticServiceRegistry, InMemoryDashboard> {
    Reconciler::new(registry, registrar(dashboard, filter))
  }

  /// Static registry that counts queries, one per pass.
  #[derive(Default)]
  struct CountingRegistry {
    inner: StaticServiceRegistry,
    passes: AtomicUsize,
  }

  impl CountingRegistry {
    fn passes(&self) -> usize {
      self.passes.load(Ordering::SeqCst)
    }
  }

  #[async_trait]
  impl ServiceRegistry for CountingRegistry {
    async fn applications(&self) -> Result<Vec<Application>, RegistryError> {
      self.passes.fetch_add(1, Ordering::SeqCst);
      self.inner.applications().await
    }

    async fn is_healthy(&self) -> bool {
      self.inner.is_healthy().await
    }
  }

  fn instance(service: &str, id: &str) -> ServiceDescriptor {
    ServiceDescriptor::new(service, id, "10.0.0.1", 8080).with_metadata("instance-id", id)
  }

  #[tokio::test]
  async fn test_excluded_services_are_not_mirrored() {
    let registry = Arc::new(StaticServiceRegistry::new());
    registry.register(instance("orders", "o-1")).await;
    registry.register(instance("payments-internal", "p-1")).await;
    let dashboard = Arc::new(InMemoryDashboard::new(InstanceIdGenerator::new()));

    let filter = ServiceFilter::new(vec!["*".to_string()], vec!["*-internal".to_string()]);
    let report = reconciler(registry, Arc::clone(&dashboard), filter)
      .reconcile()
      .await
      .unwrap();

    assert_eq!(report.registered, 1);
    let ids = dashboard.registered_ids(DEFAULT_SOURCE).await;
    assert_eq!(ids, vec![InstanceId::of("o-1")]);
  }

  #[tokio::test]
  async fn test_stale_records_deregistered_and_foreign_kept() {
    let registry = Arc::new(StaticServiceRegistry::new());
    registry.register(instance("orders", "o-1")).await;
    let dashboard = Arc::new(InMemoryDashboard::new(InstanceIdGenerator::new()));

    // Previously mirrored instance that is gone from the registry.
    let gone = ServiceDescriptor::new("orders", "o-0", "10.0.0.9", 8080)
      .with_metadata("instance-id", "o-0");
    let converter = ServiceInstanceConverter::new("/actuator", "health", DEFAULT_SOURCE);
    dashboard.register(converter.convert(&gone).unwrap()).await.unwrap();

    // Registered through another path; must survive.
    let foreign = Registration {
      source: Some("http-api".to_string()),
      ..converter.convert(&instance("billing", "b-1")).unwrap()
    };
    dashboard.register(foreign).await.unwrap();

    let report = reconciler(registry, Arc::clone(&dashboard), ServiceFilter::default())
      .reconcile()
      .await
      .unwrap();

    assert_eq!(report.deregistered, 1);
    assert_eq!(
      dashboard.registered_ids(DEFAULT_SOURCE).await,
      vec![InstanceId::of("o-1")]
    );
    assert_eq!(
      dashboard.registered_ids("http-api").await,
      vec![InstanceId::of("b-1")]
    );
  }

  #[tokio::test]
  async fn test_unavailable_registry_is_noop() {
    let registry = Arc::new(StaticServiceRegistry::new());
    registry.set_available(false);
    let dashboard = Arc::new(InMemoryDashboard::new(InstanceIdGenerator::new()));
    let converter = ServiceInstanceConverter::new("/actuator", "health", DEFAULT_SOURCE);
    dashboard
      .register(converter.convert(&instance("orders", "o-1")).unwrap())
      .await
      .unwrap();

    let health = Arc::new(HealthState::new());
    let report = reconciler(registry, Arc::clone(&dashboard), ServiceFilter::default())
      .with_health(Arc::clone(&health))
      .reconcile()
      .await
      .unwrap();

    assert!(report.skipped);
    assert!(!health.is_ready());
    assert_eq!(dashboard.registered_ids(DEFAULT_SOURCE).await.len(), 1);
  }

  #[tokio::test]
  async fn test_run_loop_reacts_to_trigger_and_shutdown() {
    let registry = Arc::new(StaticServiceRegistry::new());
    let dashboard = Arc::new(InMemoryDashboard::new(InstanceIdGenerator::new()));
    let reconciler = Arc::new(reconciler(
      Arc::clone(&registry),
      Arc::clone(&dashboard),
      ServiceFilter::default(),
    ));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let handle = tokio::spawn(Arc::clone(&reconciler).run(Duration::from_secs(3600), shutdown_rx));

    // Let the immediate first pass complete, then add an instance and trigger.
    tokio::time::sleep(Duration::from_millis(50)).await;
    registry.register(instance("orders", "o-1")).await;
    reconciler.trigger().notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
      dashboard.registered_ids(DEFAULT_SOURCE).await,
      vec![InstanceId::of("o-1")]
    );

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
  }

  #[tokio::test]
  async fn test_skipped_pass_refreshes_dashboard_health() {
    let registry = Arc::new(StaticServiceRegistry::new());
    registry.set_available(false);
    let dashboard = Arc::new(InMemoryDashboard::new(InstanceIdGenerator::new()));

    // Stale from an earlier failed pass.
    let health = Arc::new(HealthState::new());
    health.set_dashboard(false);

    let reconciler = reconciler(Arc::clone(&registry), dashboard, ServiceFilter::default())
      .with_health(Arc::clone(&health));
    assert!(reconciler.reconcile().await.unwrap().skipped);

    assert!(!health.registry_healthy.load(Ordering::Relaxed));
    assert!(health.dashboard_healthy.load(Ordering::Relaxed));

    registry.set_available(true);
    assert!(!reconciler.reconcile().await.unwrap().skipped);
    assert!(health.is_ready());
  }

  #[tokio::test(start_paused = true)]
  async fn test_interval_tick_runs_another_pass() {
    let registry = Arc::new(StaticServiceRegistry::new());
    let dashboard = Arc::new(InMemoryDashboard::new(InstanceIdGenerator::new()));
    let reconciler = Arc::new(reconciler(
      Arc::clone(&registry),
      Arc::clone(&dashboard),
      ServiceFilter::default(),
    ));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let handle = tokio::spawn(Arc::clone(&reconciler).run(Duration::from_secs(60), shutdown_rx));

    tokio::time::sleep(Duration::from_secs(1)).await;
    registry.register(instance("orders", "o-1")).await;
    assert!(dashboard.registered_ids(DEFAULT_SOURCE).await.is_empty());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(
      dashboard.registered_ids(DEFAULT_SOURCE).await,
      vec![InstanceId::of("o-1")]
    );

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
  }

  #[tokio::test(start_paused = true)]
  async fn test_cancellation_burst_coalesces_into_one_pass() {
    let registry = Arc::new(CountingRegistry::default());
    let dashboard = Arc::new(InMemoryDashboard::new(InstanceIdGenerator::new()));
    let registrar = registrar(dashboard, ServiceFilter::default());
    let reconciler = Arc::new(Reconciler::new(Arc::clone(&registry), Arc::clone(&registrar)));
    let listener = RegistrationListener::new(registrar, reconciler.trigger());

    for n in 0..5 {
      let d = ServiceDescriptor::new("orders", format!("o-{n}"), "h", 8080);
      listener.on_event(&RegistryEvent::Canceled(d)).await;
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(Arc::clone(&reconciler).run(Duration::from_secs(3600), shutdown_rx));

    // Immediate first tick plus one pass for the whole burst.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(registry.passes(), 2);

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(registry.passes(), 3);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
  }
}
