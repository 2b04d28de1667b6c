//! Instance Registrar - Convert, Tag and Upsert
//!
//! The single step shared by the event listener and the reconciler:
//! decide whether a service is mirrored, convert its descriptor into a
//! source-tagged registration, and upsert it into the dashboard.
//! Failures are logged and reported, never propagated.

use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::converter::ServiceInstanceConverter;
use crate::domain::id::InstanceIdGenerator;
use crate::domain::instance::{InstanceId, ServiceDescriptor};
use crate::domain::pattern::ServiceFilter;
use crate::ports::dashboard::InstanceRegistry;

/// Result of a single registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
  /// The dashboard accepted the upsert.
  Registered(InstanceId),
  /// Conversion succeeded but the dashboard call failed.
  ///
  /// Carries the locally computed id the record would have.
  DashboardFailed(InstanceId),
  /// The descriptor could not be converted.
  ConversionFailed,
}

impl RegisterOutcome {
  /// Id that should count as live for reconciliation purposes.
  pub fn live_id(&self) -> Option<&InstanceId> {
    match self {
      Self::Registered(id) | Self::DashboardFailed(id) => Some(id),
      Self::ConversionFailed => None,
    }
  }

  /// Whether the dashboard accepted the upsert.
  pub fn is_registered(&self) -> bool {
    matches!(self, Self::Registered(_))
  }
}

/// Shared filter + converter + dashboard handle.
pub struct InstanceRegistrar<D: InstanceRegistry> {
  /// Dashboard port.
  dashboard: Arc<D>,
  /// Include/exclude rule.
  filter: ServiceFilter,
  /// Descriptor converter (stamps the source tag).
  converter: ServiceInstanceConverter,
  /// Upsert key derivation.
  id_generator: InstanceIdGenerator,
  /// Optional metrics sink.
  metrics: Option<Arc<MetricsRegistry>>,
}

impl<D: InstanceRegistry> InstanceRegistrar<D> {
  /// Create a new registrar.
  pub fn new(
    dashboard: Arc<D>,
    filter: ServiceFilter,
    converter: ServiceInstanceConverter,
    id_generator: InstanceIdGenerator,
  ) -> Self {
    Self {
      dashboard,
      filter,
      converter,
      id_generator,
      metrics: None,
    }
  }

  /// Attach a metrics registry.
  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// Dashboard handle.
  pub fn dashboard(&self) -> &Arc<D> {
    &self.dashboard
  }

  /// Metrics handle, if attached.
  pub fn metrics(&self) -> Option<&Arc<MetricsRegistry>> {
    self.metrics.as_ref()
  }

  /// Source tag stamped on registrations.
  pub fn source(&self) -> &str {
    self.converter.source()
  }

  /// Whether a service name passes the include/exclude rule.
  pub fn should_register(&self, service_id: &str) -> bool {
    self.filter.should_register(service_id)
  }

  /// Convert and upsert one instance. Never fails; see [`RegisterOutcome`].
  pub async fn register(&self, descriptor: &ServiceDescriptor) -> RegisterOutcome {
    let registration = match self.converter.convert(descriptor) {
      Ok(registration) => registration,
      Err(e) => {
        error!(
          service = %descriptor.service_id,
          instance = %descriptor.instance_id,
          error = %e,
          "Couldn't register instance for service"
        );
        self.count("failed");
        return RegisterOutcome::ConversionFailed;
      }
    };

    let expected = self.id_generator.generate(&registration);
    trace!(id = %expected, ?registration, "Registering discovered instance");

    match self.dashboard.register(registration).await {
      Ok(id) => {
        if id != expected {
          debug!(expected = %expected, assigned = %id, "Dashboard assigned a different id");
        }
        self.count("ok");
        RegisterOutcome::Registered(id)
      }
      Err(e) => {
        warn!(
          service = %descriptor.service_id,
          id = %expected,
          error = %e,
          "Dashboard registration failed"
        );
        self.count("failed");
        RegisterOutcome::DashboardFailed(expected)
      }
    }
  }

  fn count(&self, outcome: &str) {
    if let Some(metrics) = &self.metrics {
      metrics.registrations.with_label_values(&[outcome]).inc();
    }
  }
}
