//! Admin Server Adapter
//!
//! Implements the dashboard port against a Spring-Boot-Admin-compatible
//! REST API.
//!
//! Sub-modules:
//! - `client`: `/instances` register, deregister and list calls
//! - `types`: API request/response type definitions

pub mod client;
pub mod types;

pub use client::AdminClient;
