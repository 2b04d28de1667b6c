//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the bridge's mirroring workflows.
//!
//! Use cases:
//! - `InstanceRegistrar`: Filter, convert and upsert one instance
//! - `RegistrationListener`: Event-driven mirroring of lease events
//! - `Reconciler`: Periodic and on-demand full resynchronization

pub mod listener;
pub mod reconciler;
pub mod registrar;

pub use listener::RegistrationListener;
pub use reconciler::{ReconciliationReport, Reconciler};
pub use registrar::{InstanceRegistrar, RegisterOutcome};
