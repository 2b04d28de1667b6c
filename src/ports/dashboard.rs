//! Dashboard Port - Admin Instance Registry Interface
//!
//! Defines the register / deregister / list surface of the admin
//! dashboard's instance registry. Registration is an idempotent upsert
//! keyed by [`InstanceId`].

use async_trait::async_trait;

use crate::domain::instance::{DashboardInstance, InstanceId, Registration};

/// Trait for dashboard instance registries.
#[async_trait]
pub trait InstanceRegistry: Send + Sync + 'static {
    /// Upsert a registration, returning the id of the affected record.
    async fn register(&self, registration: Registration) -> anyhow::Result<InstanceId>;

    /// Mark a record as no longer registered.
    async fn deregister(&self, id: &InstanceId) -> anyhow::Result<()>;

    /// All records currently held by the dashboard, regardless of source.
    async fn instances(&self) -> anyhow::Result<Vec<DashboardInstance>>;

    /// Check if the dashboard connection is healthy.
    async fn is_healthy(&self) -> bool;
}
