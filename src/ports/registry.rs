//! Service Registry Port - Lease Registry Interface
//!
//! Defines what the bridge needs from the service registry: a query
//! for every application currently holding a lease, and a stream of
//! lease lifecycle events.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::domain::instance::{Application, RegistryEvent};

/// Failure querying the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry is not (yet) initialized or reachable.
    ///
    /// Reconciliation treats this as "nothing to do" rather than a failure.
    #[error("service registry is unavailable")]
    Unavailable,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Query side of the registry.
#[async_trait]
pub trait ServiceRegistry: Send + Sync + 'static {
    /// All applications and their instances, sorted by name.
    ///
    /// # Errors
    /// [`RegistryError::Unavailable`] when the registry cannot be reached
    /// at all, [`RegistryError::Other`] for any other failure.
    async fn applications(&self) -> Result<Vec<Application>, RegistryError>;

    /// Check if the registry connection is healthy.
    async fn is_healthy(&self) -> bool;
}

/// Event side of the registry.
///
/// Each subscriber gets its own receiver; slow subscribers observe
/// `RecvError::Lagged` instead of blocking the publisher.
pub trait RegistryEvents: Send + Sync + 'static {
    /// Subscribe to lease lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<RegistryEvent>;
}
