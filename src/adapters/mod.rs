//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies. Each sub-module groups adapters by
//! infrastructure concern.
//!
//! Adapter categories:
//! - `admin`: Spring-Boot-Admin-compatible dashboard REST client
//! - `eureka`: Eureka registry REST client and lease event poller
//! - `http`: Shared retrying HTTP client
//! - `memory`: In-process registry and dashboard
//! - `metrics`: Prometheus metrics export and health checks

pub mod admin;
pub mod eureka;
pub mod http;
pub mod memory;
pub mod metrics;
