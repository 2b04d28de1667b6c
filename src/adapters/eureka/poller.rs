//! Eureka Event Poller - Lifecycle Events from Successive Snapshots
//!
//! A remote Eureka server does not push lease events, so this adapter
//! polls `/apps` and diffs each snapshot against the previous one:
//! - new lease key → `Registered`
//! - known key with a new renewal timestamp or changed descriptor → `Renewed`
//! - known key missing from the snapshot → `Canceled`
//!
//! A failed poll emits nothing; leases are never canceled because the
//! registry was unreachable.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, instrument, warn};

use super::client::EurekaClient;
use super::types::AppsResponse;
use crate::domain::instance::{RegistryEvent, ServiceDescriptor};
use crate::ports::registry::{RegistryError, RegistryEvents};

/// Capacity of the lifecycle event channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Last observed state of one lease.
#[derive(Debug, Clone)]
struct KnownLease {
  descriptor: ServiceDescriptor,
  last_renewal: Option<i64>,
}

/// Lease table keyed by (service id, lease key).
type LeaseTable = HashMap<(String, String), KnownLease>;

/// Polls Eureka and republishes lease changes as [`RegistryEvent`]s.
pub struct EurekaEventPoller {
  /// Registry client.
  client: Arc<EurekaClient>,
  /// Poll period.
  interval: Duration,
  /// Lifecycle event publisher.
  events_tx: broadcast::Sender<RegistryEvent>,
  /// Leases seen in the last successful poll.
  known: Mutex<LeaseTable>,
}

impl EurekaEventPoller {
  /// Create a poller over `client`.
  pub fn new(client: Arc<EurekaClient>, interval: Duration) -> Self {
    let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    Self {
      client,
      interval,
      events_tx,
      known: Mutex::new(HashMap::new()),
    }
  }

  /// Poll once and publish the resulting events.
  ///
  /// Returns the number of events published.
  pub async fn poll_once(&self) -> Result<usize, RegistryError> {
    let apps = self.client.fetch_apps().await?;
    let events = {
      let mut known = self.known.lock().await;
      diff_snapshot(&mut known, &apps)
    };

    let count = events.len();
    for event in events {
      if self.events_tx.send(event).is_err() {
        debug!("No registry event subscribers");
      }
    }
    Ok(count)
  }

  /// Poll on the configured interval until shutdown.
  #[instrument(skip(self, shutdown_rx))]
  pub async fn run(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    info!(interval_secs = self.interval.as_secs(), "Eureka poller started");

    let mut ticker = tokio::time::interval(self.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Eureka poller shutting down");
          return Ok(());
        }
        _ = ticker.tick() => {
          match self.poll_once().await {
            Ok(0) => {}
            Ok(n) => debug!(events = n, "Published registry events"),
            Err(RegistryError::Unavailable) => debug!("Eureka unavailable, poll skipped"),
            Err(e) => warn!(error = %e, "Eureka poll failed"),
          }
        }
      }
    }
  }
}

impl RegistryEvents for EurekaEventPoller {
  fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
    self.events_tx.subscribe()
  }
}

/// Diff a snapshot against `known`, updating it in place.
fn diff_snapshot(known: &mut LeaseTable, apps: &AppsResponse) -> Vec<RegistryEvent> {
  let mut events = Vec::new();
  let mut current = LeaseTable::with_capacity(known.len());

  for info in EurekaClient::instances(apps) {
    let descriptor = info.to_descriptor();
    let key = (descriptor.service_id.clone(), descriptor.instance_id.clone());
    let last_renewal = info.last_renewal();

    match known.remove(&key) {
      None => events.push(RegistryEvent::Registered(descriptor.clone())),
      Some(previous) => {
        if last_renewal.is_none()
          || previous.last_renewal != last_renewal
          || previous.descriptor != descriptor
        {
          events.push(RegistryEvent::Renewed(descriptor.clone()));
        }
      }
    }

    current.insert(key, KnownLease { descriptor, last_renewal });
  }

  // Whatever is left was not in this snapshot.
  let mut gone: Vec<_> = known.drain().map(|(_, lease)| lease.descriptor).collect();
  gone.sort_by(|a, b| (&a.service_id, &a.instance_id).cmp(&(&b.service_id, &b.instance_id)));
  events.extend(gone.into_iter().map(RegistryEvent::Canceled));

  *known = current;
  events
}
