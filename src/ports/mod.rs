//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `ServiceRegistry` / `RegistryEvents`: the lease registry being mirrored
//! - `InstanceRegistry`: the admin dashboard receiving the mirror

pub mod dashboard;
pub mod registry;
