//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    services = ?config.discovery.services,
    ignored = ?config.discovery.ignored_services,
    source = %config.bridge.source,
    registry = config.registry.url.as_deref().unwrap_or("static"),
    dashboard = config.dashboard.url.as_deref().unwrap_or("in-memory"),
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).context("Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Positive intervals and timeouts
/// - Non-empty patterns and source tag
/// - Well-formed endpoint URLs
/// - Complete static instance definitions
fn validate_config(config: &AppConfig) -> Result<()> {
  // Bridge validation
  anyhow::ensure!(
    !config.bridge.source.trim().is_empty(),
    "Bridge source tag must not be empty"
  );

  // Discovery validation
  anyhow::ensure!(
    config.discovery.reconcile_interval_seconds > 0,
    "reconcile_interval_seconds must be positive"
  );
  for pattern in config
    .discovery
    .services
    .iter()
    .chain(&config.discovery.ignored_services)
  {
    anyhow::ensure!(
      !pattern.trim().is_empty(),
      "Service patterns must not be empty"
    );
  }

  // Registry validation
  anyhow::ensure!(
    config.registry.poll_interval_seconds > 0,
    "Registry poll_interval_seconds must be positive"
  );
  anyhow::ensure!(
    config.registry.timeout_ms > 0,
    "Registry timeout_ms must be positive"
  );
  if let Some(url) = &config.registry.url {
    validate_url("Registry", url)?;
  }
  for (i, instance) in config.registry.static_instances.iter().enumerate() {
    anyhow::ensure!(
      !instance.service_id.trim().is_empty(),
      "Static instance {} has empty service_id",
      i
    );
    anyhow::ensure!(
      !instance.host.trim().is_empty(),
      "Static instance {} ({}) has empty host",
      i,
      instance.service_id
    );
    anyhow::ensure!(
      instance.port > 0,
      "Static instance {} ({}) has port 0",
      i,
      instance.service_id
    );
  }

  // Dashboard validation
  anyhow::ensure!(
    config.dashboard.timeout_ms > 0,
    "Dashboard timeout_ms must be positive"
  );
  if let Some(url) = &config.dashboard.url {
    validate_url("Dashboard", url)?;
  }

  Ok(())
}

fn validate_url(label: &str, url: &str) -> Result<()> {
  anyhow::ensure!(
    url.starts_with("http://") || url.starts_with("https://"),
    "{} URL must start with http:// or https://, got {}",
    label,
    url
  );
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const MINIMAL: &str = r#"
    [bridge]
    name = "bridge"
  "#;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = parse_config(MINIMAL).unwrap();
    assert_eq!(config.bridge.log_level, "info");
    assert_eq!(config.bridge.source, "discovery");
    assert_eq!(config.discovery.services, vec!["*".to_string()]);
    assert!(config.discovery.ignored_services.is_empty());
    assert_eq!(config.discovery.reconcile_interval_seconds, 60);
    assert_eq!(config.converter.management_context_path, "/actuator");
    assert_eq!(config.converter.health_endpoint_path, "health");
    assert!(config.registry.url.is_none());
    assert_eq!(config.registry.poll_interval_seconds, 30);
    assert_eq!(config.dashboard.timeout_ms, 5000);
    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.bind_address, "0.0.0.0:9090");
    assert_eq!(config.metrics.health_port, 8080);
  }

  #[test]
  fn test_full_config_parses() {
    let config = parse_config(
      r#"
      [bridge]
      name = "bridge"
      source = "eureka"

      [discovery]
      services = ["*"]
      ignored_services = ["*-internal"]

      [registry]
      poll_interval_seconds = 10

      [[registry.static_instances]]
      service_id = "orders"
      host = "orders-1"
      port = 8080
      metadata = { "instance-id" = "abc123" }

      [dashboard]
      url = "http://localhost:8081"
      username = "admin"
      password = "secret"
      "#,
    )
    .unwrap();

    assert!(!config.service_filter().should_register("payments-internal"));
    assert!(config.service_filter().should_register("orders"));
    assert_eq!(config.instance_converter().source(), "eureka");

    let descriptor = config.registry.static_instances[0].to_descriptor();
    assert_eq!(descriptor.instance_id, "orders-1:8080");
    assert_eq!(descriptor.metadata["instance-id"], "abc123");
    assert_eq!(config.dashboard.username.as_deref(), Some("admin"));
  }

  #[test]
  fn test_rejects_bad_values() {
    let cases = [
      "[bridge]\nname = \"b\"\nsource = \" \"",
      "[bridge]\nname = \"b\"\n[discovery]\nreconcile_interval_seconds = 0",
      "[bridge]\nname = \"b\"\n[discovery]\nignored_services = [\"\"]",
      "[bridge]\nname = \"b\"\n[registry]\nurl = \"localhost:8761\"",
      "[bridge]\nname = \"b\"\n[dashboard]\ntimeout_ms = 0",
      "[bridge]\nname = \"b\"\n[[registry.static_instances]]\nservice_id = \"a\"\nhost = \"\"\nport = 1",
      "[bridge]\nname = \"b\"\n[[registry.static_instances]]\nservice_id = \"a\"\nhost = \"h\"\nport = 0",
    ];
    for case in cases {
      assert!(parse_config(case).is_err(), "accepted: {case}");
    }
  }
}
