//! Configuration Module - TOML-based Bridge Configuration
//!
//! Loads and validates configuration from `config.toml`.
//! Registry and dashboard endpoints, mirroring patterns and the
//! source tag are externalized here - nothing is hardcoded in the
//! domain layer.

pub mod loader;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::converter::ServiceInstanceConverter;
use crate::domain::instance::{ServiceDescriptor, DEFAULT_SOURCE};
use crate::domain::pattern::ServiceFilter;

/// Top-level bridge configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the bridge begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Bridge identity and metadata.
  pub bridge: BridgeConfig,
  /// Which services get mirrored, and how often to reconcile.
  #[serde(default)]
  pub discovery: DiscoveryConfig,
  /// URL derivation defaults.
  #[serde(default)]
  pub converter: ConverterConfig,
  /// Service registry endpoint or static instances.
  #[serde(default)]
  pub registry: RegistryConfig,
  /// Admin dashboard endpoint.
  #[serde(default)]
  pub dashboard: DashboardConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

impl AppConfig {
  /// Include/exclude rule built from `[discovery]`.
  pub fn service_filter(&self) -> ServiceFilter {
    ServiceFilter::new(
      self.discovery.services.clone(),
      self.discovery.ignored_services.clone(),
    )
  }

  /// Converter built from `[converter]` and the bridge source tag.
  pub fn instance_converter(&self) -> ServiceInstanceConverter {
    ServiceInstanceConverter::new(
      self.converter.management_context_path.clone(),
      self.converter.health_endpoint_path.clone(),
      self.bridge.source.clone(),
    )
  }
}

/// Bridge identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
  /// Human-readable bridge name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Tag stamped on every registration; scopes deregistration.
  #[serde(default = "default_source")]
  pub source: String,
}

/// Service selection and reconciliation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
  /// Include patterns (`*` wildcard).
  #[serde(default = "default_services")]
  pub services: Vec<String>,
  /// Exclude patterns; override includes.
  #[serde(default)]
  pub ignored_services: Vec<String>,
  /// Periodic reconciliation interval (seconds).
  #[serde(default = "default_reconcile_interval")]
  pub reconcile_interval_seconds: u64,
}

impl Default for DiscoveryConfig {
  fn default() -> Self {
    Self {
      services: default_services(),
      ignored_services: Vec::new(),
      reconcile_interval_seconds: default_reconcile_interval(),
    }
  }
}

impl DiscoveryConfig {
  /// Reconciliation interval as a duration.
  pub fn reconcile_interval(&self) -> Duration {
    Duration::from_secs(self.reconcile_interval_seconds)
  }
}

/// Management / health URL derivation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConverterConfig {
  /// Management context path appended to the service URL.
  #[serde(default = "default_management_context_path")]
  pub management_context_path: String,
  /// Health endpoint appended to the management URL.
  #[serde(default = "default_health_endpoint_path")]
  pub health_endpoint_path: String,
}

impl Default for ConverterConfig {
  fn default() -> Self {
    Self {
      management_context_path: default_management_context_path(),
      health_endpoint_path: default_health_endpoint_path(),
    }
  }
}

/// Service registry configuration.
///
/// With `url` set the bridge polls a Eureka server; without it the
/// `static_instances` are served from memory.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
  /// Eureka base URL, e.g. `http://localhost:8761/eureka`.
  pub url: Option<String>,
  /// Eureka poll interval (seconds).
  #[serde(default = "default_poll_interval")]
  pub poll_interval_seconds: u64,
  /// Request timeout in milliseconds.
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Basic auth user.
  pub username: Option<String>,
  /// Basic auth password.
  pub password: Option<String>,
  /// Fixed instances for the in-memory registry.
  #[serde(default)]
  pub static_instances: Vec<StaticInstanceConfig>,
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      url: None,
      poll_interval_seconds: default_poll_interval(),
      timeout_ms: default_timeout_ms(),
      username: None,
      password: None,
      static_instances: Vec::new(),
    }
  }
}

impl RegistryConfig {
  /// Poll interval as a duration.
  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_seconds)
  }

  /// Request timeout as a duration.
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

/// One statically configured service instance.
#[derive(Debug, Clone, Deserialize)]
pub struct StaticInstanceConfig {
  /// Service name.
  pub service_id: String,
  /// Instance id; defaults to `host:port`.
  pub instance_id: Option<String>,
  /// Host name or address.
  pub host: String,
  /// Service port.
  pub port: u16,
  /// Serve over TLS.
  #[serde(default)]
  pub secure: bool,
  /// Instance metadata.
  #[serde(default)]
  pub metadata: BTreeMap<String, String>,
  /// Explicit health-check URL.
  pub health_check_url: Option<String>,
}

impl StaticInstanceConfig {
  /// Registry descriptor for this entry.
  pub fn to_descriptor(&self) -> ServiceDescriptor {
    let instance_id = self
      .instance_id
      .clone()
      .unwrap_or_else(|| format!("{}:{}", self.host, self.port));
    ServiceDescriptor {
      service_id: self.service_id.clone(),
      instance_id,
      host: self.host.clone(),
      port: self.port,
      secure: self.secure,
      metadata: self.metadata.clone(),
      health_check_url: self.health_check_url.clone(),
    }
  }
}

/// Admin dashboard configuration.
///
/// Without `url` an in-memory dashboard is used.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
  /// Admin server base URL.
  pub url: Option<String>,
  /// Request timeout in milliseconds.
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Basic auth user.
  pub username: Option<String>,
  /// Basic auth password.
  pub password: Option<String>,
}

impl Default for DashboardConfig {
  fn default() -> Self {
    Self {
      url: None,
      timeout_ms: default_timeout_ms(),
      username: None,
      password: None,
    }
  }
}

impl DashboardConfig {
  /// Request timeout as a duration.
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_source() -> String {
  DEFAULT_SOURCE.to_string()
}

fn default_true() -> bool {
  true
}

fn default_services() -> Vec<String> {
  vec!["*".to_string()]
}

fn default_reconcile_interval() -> u64 {
  60
}

fn default_management_context_path() -> String {
  "/actuator".to_string()
}

fn default_health_endpoint_path() -> String {
  "health".to_string()
}

fn default_poll_interval() -> u64 {
  30
}

fn default_timeout_ms() -> u64 {
  5000
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}
