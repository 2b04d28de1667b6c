//! Eureka REST Response Types
//!
//! Serialization types for `GET /apps` with `Accept: application/json`.
//! Only the fields the bridge reads are modelled; the rest is ignored.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::instance::ServiceDescriptor;

/// Top-level `/apps` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct AppsResponse {
  pub applications: Applications,
}

/// Application list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Applications {
  #[serde(default)]
  pub application: Vec<EurekaApplication>,
}

/// One registered application.
#[derive(Debug, Clone, Deserialize)]
pub struct EurekaApplication {
  /// Upper-cased application name.
  pub name: String,
  #[serde(default)]
  pub instance: Vec<InstanceInfo>,
}

/// Port entry: `{"$": 8080, "@enabled": "true"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PortInfo {
  #[serde(rename = "$")]
  pub port: u16,
  #[serde(rename = "@enabled", default)]
  pub enabled: String,
}

impl PortInfo {
  /// Eureka encodes the flag as a string.
  pub fn is_enabled(&self) -> bool {
    self.enabled.eq_ignore_ascii_case("true")
  }
}

/// Lease timestamps.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseInfo {
  #[serde(default)]
  pub last_renewal_timestamp: Option<i64>,
}

/// One instance of an application.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceInfo {
  pub instance_id: Option<String>,
  pub host_name: String,
  pub app: String,
  #[serde(default)]
  pub ip_addr: Option<String>,
  #[serde(default)]
  pub status: Option<String>,
  pub port: Option<PortInfo>,
  pub secure_port: Option<PortInfo>,
  #[serde(default)]
  pub health_check_url: Option<String>,
  #[serde(default)]
  pub secure_health_check_url: Option<String>,
  #[serde(default)]
  pub metadata: BTreeMap<String, String>,
  #[serde(default)]
  pub lease_info: Option<LeaseInfo>,
}

impl InstanceInfo {
  /// Registry-side lease key; falls back to `host:app:port`.
  pub fn lease_key(&self) -> String {
    match &self.instance_id {
      Some(id) if !id.is_empty() => id.clone(),
      _ => format!(
        "{}:{}:{}",
        self.host_name,
        self.app.to_lowercase(),
        self.port.as_ref().map_or(0, |p| p.port)
      ),
    }
  }

  /// Last heartbeat timestamp, if reported.
  pub fn last_renewal(&self) -> Option<i64> {
    self.lease_info.as_ref().and_then(|l| l.last_renewal_timestamp)
  }

  /// Convert into the bridge's descriptor.
  ///
  /// Service ids are lower-cased; `@`-prefixed metadata keys (Jackson
  /// type hints) are dropped.
  pub fn to_descriptor(&self) -> ServiceDescriptor {
    let secure = self.secure_port.as_ref().is_some_and(PortInfo::is_enabled);
    let port = if secure {
      self.secure_port.as_ref().map_or(0, |p| p.port)
    } else {
      self.port.as_ref().map_or(0, |p| p.port)
    };
    let health_check_url = if secure {
      self.secure_health_check_url.clone().or_else(|| self.health_check_url.clone())
    } else {
      self.health_check_url.clone()
    };

    ServiceDescriptor {
      service_id: self.app.to_lowercase(),
      instance_id: self.lease_key(),
      host: self.host_name.clone(),
      port,
      secure,
      metadata: self
        .metadata
        .iter()
        .filter(|(k, _)| !k.starts_with('@'))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect(),
      health_check_url: health_check_url.filter(|u| !u.is_empty()),
    }
  }
}
