//! In-Memory Adapters - Static Registry and Local Dashboard
//!
//! Process-local implementations of the ports. The static registry is
//! seeded from configuration when no registry URL is set; the local
//! dashboard backs dry runs when no admin server URL is set. Both are
//! also the in-process doubles used by tests.

pub mod dashboard;
pub mod registry;

pub use dashboard::InMemoryDashboard;
pub use registry::StaticServiceRegistry;
