//! Domain layer - Core mirroring logic and models.
//!
//! Pure logic for turning registry descriptors into dashboard
//! registrations: name filtering, URL derivation and id generation.
//! No I/O here (hexagonal architecture inner ring).

pub mod converter;
pub mod id;
pub mod instance;
pub mod pattern;

// Re-export core types for convenience
pub use converter::{ConversionError, ServiceInstanceConverter};
pub use id::InstanceIdGenerator;
pub use instance::{
    Application, DashboardInstance, InstanceId, Registration, RegistryEvent, ServiceDescriptor,
    DEFAULT_SOURCE,
};
pub use pattern::ServiceFilter;
