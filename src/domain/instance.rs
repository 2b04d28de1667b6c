//! Core mirroring domain types.
//!
//! Defines what the registry hands us (descriptors, applications,
//! lifecycle events) and what the dashboard stores (registrations,
//! instance ids, dashboard instances).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Source tag stamped on every registration this bridge creates.
pub const DEFAULT_SOURCE: &str = "discovery";

/// Metadata key carrying an explicit service name.
pub const METADATA_NAME: &str = "name";

/// Metadata key carrying an explicit instance id.
pub const METADATA_INSTANCE_ID: &str = "instance-id";

// ────────────────────────────────────────────
// Registry side
// ────────────────────────────────────────────

/// A single service instance as reported by the registry.
///
/// Produced by a registry adapter and consumed transiently by the
/// converter; never stored by the bridge itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Application (service) name the instance registered under.
    pub service_id: String,
    /// Registry-assigned instance identifier (lease key).
    pub instance_id: String,
    /// Host name or address the instance is reachable on.
    pub host: String,
    /// Service port.
    pub port: u16,
    /// Whether the instance serves over TLS.
    #[serde(default)]
    pub secure: bool,
    /// Free-form instance metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Explicit health-check URL, if the instance advertised one.
    #[serde(default)]
    pub health_check_url: Option<String>,
}

impl ServiceDescriptor {
    /// Create a descriptor with empty metadata and no health URL.
    pub fn new(
        service_id: impl Into<String>,
        instance_id: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            instance_id: instance_id.into(),
            host: host.into(),
            port,
            secure: false,
            metadata: BTreeMap::new(),
            health_check_url: None,
        }
    }

    /// Builder-style metadata insertion.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Builder-style health-check URL.
    #[must_use]
    pub fn with_health_check_url(mut self, url: impl Into<String>) -> Self {
        self.health_check_url = Some(url.into());
        self
    }

    /// URI scheme implied by the secure flag.
    pub fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }

    /// Base URI of the instance: `scheme://host:port`.
    pub fn uri(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host, self.port)
    }
}

/// A registry application: one service name and its instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    /// Service name.
    pub name: String,
    /// Instances currently holding a lease.
    pub instances: Vec<ServiceDescriptor>,
}

impl Application {
    /// Create an application from a name and its instances.
    pub fn new(name: impl Into<String>, instances: Vec<ServiceDescriptor>) -> Self {
        Self {
            name: name.into(),
            instances,
        }
    }
}

/// Lease lifecycle event emitted by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A new lease was created.
    Registered(ServiceDescriptor),
    /// An existing lease was renewed (heartbeat).
    Renewed(ServiceDescriptor),
    /// A lease was canceled.
    Canceled(ServiceDescriptor),
}

impl RegistryEvent {
    /// The descriptor carried by the event.
    pub fn descriptor(&self) -> &ServiceDescriptor {
        match self {
            Self::Registered(d) | Self::Renewed(d) | Self::Canceled(d) => d,
        }
    }

    /// Short label used for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Registered(_) => "registered",
            Self::Renewed(_) => "renewed",
            Self::Canceled(_) => "canceled",
        }
    }
}

// ────────────────────────────────────────────
// Dashboard side
// ────────────────────────────────────────────

/// Dashboard-side instance identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Wrap a raw id string.
    pub fn of(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Upsert payload handed to the dashboard.
///
/// Field names follow the admin server's JSON contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Service name shown in the dashboard.
    pub name: String,
    /// Base URL of the management (actuator) endpoints.
    #[serde(default)]
    pub management_url: Option<String>,
    /// Health endpoint polled by the dashboard.
    pub health_url: String,
    /// Public service URL.
    #[serde(default)]
    pub service_url: Option<String>,
    /// Origin of the registration.
    #[serde(default)]
    pub source: Option<String>,
    /// Instance metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Registration {
    /// Metadata value, treating blank strings as absent.
    pub fn metadata_text(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Whether this registration carries the given source tag.
    pub fn is_from(&self, source: &str) -> bool {
        self.source.as_deref() == Some(source)
    }
}

/// Instance record as held by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardInstance {
    /// Record key.
    pub id: InstanceId,
    /// `false` once the instance has been deregistered.
    pub registered: bool,
    /// Registration the record was created or last updated from.
    pub registration: Registration,
}

impl DashboardInstance {
    /// Whether this record is live and owned by the given source.
    pub fn is_registered_from(&self, source: &str) -> bool {
        self.registered && self.registration.is_from(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_uri_follows_secure_flag() {
        let mut d = ServiceDescriptor::new("orders", "orders-1", "10.0.0.5", 8443);
        assert_eq!(d.uri(), "http://10.0.0.5:8443");
        d.secure = true;
        assert_eq!(d.uri(), "https://10.0.0.5:8443");
    }

    #[test]
    fn test_event_accessors() {
        let d = ServiceDescriptor::new("orders", "orders-1", "host", 80);
        let event = RegistryEvent::Canceled(d.clone());
        assert_eq!(event.kind(), "canceled");
        assert_eq!(event.descriptor(), &d);
    }

    #[test]
    fn test_registration_json_is_camel_case() {
        let registration = Registration {
            name: "orders".to_string(),
            management_url: Some("http://h:1/actuator".to_string()),
            health_url: "http://h:1/actuator/health".to_string(),
            service_url: Some("http://h:1/".to_string()),
            source: Some(DEFAULT_SOURCE.to_string()),
            metadata: BTreeMap::new(),
        };
        let json = serde_json::to_value(&registration).unwrap();
        assert_eq!(json["healthUrl"], "http://h:1/actuator/health");
        assert_eq!(json["managementUrl"], "http://h:1/actuator");
        assert_eq!(json["source"], "discovery");
    }

    #[test]
    fn test_metadata_text_ignores_blank_values() {
        let mut registration = Registration {
            name: "orders".to_string(),
            management_url: None,
            health_url: "http://h:1/health".to_string(),
            service_url: None,
            source: None,
            metadata: BTreeMap::new(),
        };
        registration
            .metadata
            .insert(METADATA_INSTANCE_ID.to_string(), "  ".to_string());
        assert_eq!(registration.metadata_text(METADATA_INSTANCE_ID), None);
        assert!(!registration.is_from(DEFAULT_SOURCE));
    }
}
