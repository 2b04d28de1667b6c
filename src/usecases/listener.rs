//! Registration Listener - Registry Lifecycle Event Handling
//!
//! Reacts to lease lifecycle events from the registry:
//! - Registered / Renewed: filter, convert, upsert into the dashboard
//! - Canceled: request a full reconciliation, since one cancellation
//!   does not reliably identify the dashboard record(s) behind it
//!
//! Each event is handled on its own task so the dispatch loop never
//! waits on dashboard I/O.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Notify};
use tracing::{info, instrument, trace, warn};

use crate::domain::instance::RegistryEvent;
use crate::ports::dashboard::InstanceRegistry;

use super::registrar::{InstanceRegistrar, RegisterOutcome};

/// Event-driven mirror of registry registrations into the dashboard.
pub struct RegistrationListener<D: InstanceRegistry> {
  /// Shared convert/register step.
  registrar: Arc<InstanceRegistrar<D>>,
  /// Reconciliation trigger.
  reconcile: Arc<Notify>,
}

impl<D: InstanceRegistry> RegistrationListener<D> {
  /// Create a listener that pulls `reconcile` on cancellations.
  pub fn new(registrar: Arc<InstanceRegistrar<D>>, reconcile: Arc<Notify>) -> Self {
    Self {
      registrar,
      reconcile,
    }
  }

  /// Handle a single event to completion.
  ///
  /// Returns the registration outcome for register/renew events that
  /// passed the filter, `None` otherwise.
  pub async fn on_event(&self, event: &RegistryEvent) -> Option<RegisterOutcome> {
    if let Some(metrics) = self.registrar.metrics() {
      metrics.events.with_label_values(&[event.kind()]).inc();
    }

    match event {
      RegistryEvent::Registered(descriptor) | RegistryEvent::Renewed(descriptor) => {
        trace!(
          kind = event.kind(),
          service = %descriptor.service_id,
          instance = %descriptor.instance_id,
          "Registry instance event"
        );
        if !self.registrar.should_register(&descriptor.service_id) {
          return None;
        }
        Some(self.registrar.register(descriptor).await)
      }
      RegistryEvent::Canceled(descriptor) => {
        trace!(
          service = %descriptor.service_id,
          instance = %descriptor.instance_id,
          "Registry instance canceled"
        );
        self.reconcile.notify_one();
        None
      }
    }
  }

  /// Consume events until shutdown or until the channel closes.
  ///
  /// A lagging receiver has lost events, possibly cancellations, so
  /// lag also triggers reconciliation.
  #[instrument(skip_all, name = "registration_listener")]
  pub async fn run(
    self: Arc<Self>,
    mut events: broadcast::Receiver<RegistryEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
  ) -> Result<()> {
    info!("Registration listener started");

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Registration listener shutting down");
          return Ok(());
        }
        received = events.recv() => {
          match received {
            Ok(event) => {
              let listener = Arc::clone(&self);
              tokio::spawn(async move {
                listener.on_event(&event).await;
              });
            }
            Err(RecvError::Lagged(missed)) => {
              warn!(missed, "Registry event stream lagged, requesting reconciliation");
              self.reconcile.notify_one();
            }
            Err(RecvError::Closed) => {
              info!("Registry event stream closed");
              return Ok(());
            }
          }
        }
      }
    }
  }
}
