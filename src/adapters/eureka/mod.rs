//! Eureka Adapters - Remote Service Registry
//!
//! Implements the registry ports against a Eureka server's REST API:
//! `EurekaClient` answers application queries, `EurekaEventPoller`
//! turns successive snapshots into lifecycle events.

pub mod client;
pub mod poller;
pub mod types;

pub use client::EurekaClient;
pub use poller::EurekaEventPoller;
