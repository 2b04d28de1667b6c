//! In-Memory Dashboard - Local Instance Repository
//!
//! Keeps dashboard instance records keyed by the bridge's own
//! [`InstanceIdGenerator`]. Registration upserts; deregistration keeps
//! the record but clears its `registered` flag, like the admin server.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::id::InstanceIdGenerator;
use crate::domain::instance::{DashboardInstance, InstanceId, Registration};
use crate::ports::dashboard::InstanceRegistry;

/// Process-local dashboard instance registry.
pub struct InMemoryDashboard {
    /// Upsert key derivation.
    id_generator: InstanceIdGenerator,
    /// Records by id.
    instances: RwLock<BTreeMap<InstanceId, DashboardInstance>>,
}

impl InMemoryDashboard {
    /// Create an empty dashboard.
    pub fn new(id_generator: InstanceIdGenerator) -> Self {
        Self {
            id_generator,
            instances: RwLock::new(BTreeMap::new()),
        }
    }

    /// Sorted ids of registered records carrying `source`.
    pub async fn registered_ids(&self, source: &str) -> Vec<InstanceId> {
        self.instances
            .read()
            .await
            .values()
            .filter(|i| i.is_registered_from(source))
            .map(|i| i.id.clone())
            .collect()
    }
}

#[async_trait]
impl InstanceRegistry for InMemoryDashboard {
    async fn register(&self, registration: Registration) -> anyhow::Result<InstanceId> {
        let id = self.id_generator.generate(&registration);
        let mut instances = self.instances.write().await;
        let previous = instances.insert(
            id.clone(),
            DashboardInstance {
                id: id.clone(),
                registered: true,
                registration,
            },
        );
        debug!(id = %id, updated = previous.is_some(), "Instance registered");
        Ok(id)
    }

    async fn deregister(&self, id: &InstanceId) -> anyhow::Result<()> {
        if let Some(instance) = self.instances.write().await.get_mut(id) {
            instance.registered = false;
            debug!(id = %id, "Instance deregistered");
        }
        Ok(())
    }

    async fn instances(&self) -> anyhow::Result<Vec<DashboardInstance>> {
        Ok(self.instances.read().await.values().cloned().collect())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(instance_id: &str) -> Registration {
        Registration {
            name: "orders".to_string(),
            management_url: None,
            health_url: "http://h:1/actuator/health".to_string(),
            service_url: None,
            source: Some("discovery".to_string()),
            metadata: [("instance-id".to_string(), instance_id.to_string())].into(),
        }
    }

    #[tokio::test]
    async fn test_register_is_upsert() {
        let dashboard = InMemoryDashboard::new(InstanceIdGenerator::new());
        let first = dashboard.register(registration("abc")).await.unwrap();
        let second = dashboard.register(registration("abc")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(dashboard.instances().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deregister_clears_flag_and_reregister_restores_it() {
        let dashboard = InMemoryDashboard::new(InstanceIdGenerator::new());
        let id = dashboard.register(registration("abc")).await.unwrap();

        dashboard.deregister(&id).await.unwrap();
        assert!(dashboard.registered_ids("discovery").await.is_empty());
        assert!(!dashboard.instances().await.unwrap()[0].registered);

        dashboard.register(registration("abc")).await.unwrap();
        assert_eq!(dashboard.registered_ids("discovery").await, vec![id]);
    }

    #[tokio::test]
    async fn test_deregister_unknown_id_is_ok() {
        let dashboard = InMemoryDashboard::new(InstanceIdGenerator::new());
        assert!(dashboard.deregister(&InstanceId::of("missing")).await.is_ok());
    }
}
