//! Static Service Registry - Config-seeded Lease Table
//!
//! Holds leases in memory and publishes a lifecycle event for every
//! register / renew / cancel. No expiry: leases live until canceled.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::domain::instance::{Application, RegistryEvent, ServiceDescriptor};
use crate::ports::registry::{RegistryError, RegistryEvents, ServiceRegistry};

/// Capacity of the lifecycle event channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// In-memory registry: service id → instance id → descriptor.
pub struct StaticServiceRegistry {
    /// Current leases.
    leases: RwLock<BTreeMap<String, BTreeMap<String, ServiceDescriptor>>>,
    /// Lifecycle event publisher.
    events_tx: broadcast::Sender<RegistryEvent>,
    /// Whether queries are answered (simulates an uninitialized server).
    available: AtomicBool,
}

impl Default for StaticServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticServiceRegistry {
    /// Create an empty, available registry.
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            leases: RwLock::new(BTreeMap::new()),
            events_tx,
            available: AtomicBool::new(true),
        }
    }

    /// Create a registry pre-populated with `descriptors`, without events.
    pub fn seeded(descriptors: impl IntoIterator<Item = ServiceDescriptor>) -> Self {
        let mut leases: BTreeMap<String, BTreeMap<String, ServiceDescriptor>> = BTreeMap::new();
        for d in descriptors {
            leases
                .entry(d.service_id.clone())
                .or_default()
                .insert(d.instance_id.clone(), d);
        }
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            leases: RwLock::new(leases),
            events_tx,
            available: AtomicBool::new(true),
        }
    }

    /// Toggle query availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    /// Create or replace a lease and publish `Registered`.
    pub async fn register(&self, descriptor: ServiceDescriptor) {
        self.leases
            .write()
            .await
            .entry(descriptor.service_id.clone())
            .or_default()
            .insert(descriptor.instance_id.clone(), descriptor.clone());
        self.publish(RegistryEvent::Registered(descriptor));
    }

    /// Renew an existing lease and publish `Renewed`.
    ///
    /// Returns `false` when no such lease exists.
    pub async fn renew(&self, service_id: &str, instance_id: &str) -> bool {
        let descriptor = self
            .leases
            .read()
            .await
            .get(service_id)
            .and_then(|instances| instances.get(instance_id))
            .cloned();
        match descriptor {
            Some(d) => {
                self.publish(RegistryEvent::Renewed(d));
                true
            }
            None => false,
        }
    }

    /// Drop a lease and publish `Canceled`.
    ///
    /// Returns `false` when no such lease exists.
    pub async fn cancel(&self, service_id: &str, instance_id: &str) -> bool {
        let removed = {
            let mut leases = self.leases.write().await;
            let removed = leases
                .get_mut(service_id)
                .and_then(|instances| instances.remove(instance_id));
            if leases.get(service_id).is_some_and(BTreeMap::is_empty) {
                leases.remove(service_id);
            }
            removed
        };
        match removed {
            Some(d) => {
                self.publish(RegistryEvent::Canceled(d));
                true
            }
            None => false,
        }
    }

    fn publish(&self, event: RegistryEvent) {
        if self.events_tx.send(event).is_err() {
            debug!("No registry event subscribers");
        }
    }
}

#[async_trait]
impl ServiceRegistry for StaticServiceRegistry {
    async fn applications(&self) -> Result<Vec<Application>, RegistryError> {
        if !self.available.load(Ordering::Relaxed) {
            return Err(RegistryError::Unavailable);
        }
        Ok(self
            .leases
            .read()
            .await
            .iter()
            .map(|(name, instances)| {
                Application::new(name.clone(), instances.values().cloned().collect())
            })
            .collect())
    }

    async fn is_healthy(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }
}

impl RegistryEvents for StaticServiceRegistry {
    fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events_tx.subscribe()
    }
}
