//! Admin Server API Request/Response Types
//!
//! Serialization types for the Spring-Boot-Admin-compatible
//! `/instances` endpoints. Unknown response fields are ignored.

use serde::Deserialize;

use crate::domain::instance::{DashboardInstance, InstanceId, Registration};

/// Response from `POST /instances`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
  /// Id assigned to the upserted record.
  pub id: InstanceId,
}

/// One element of `GET /instances`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceResponse {
  /// Record key.
  pub id: InstanceId,
  /// Missing flag means the server only lists live records.
  #[serde(default = "default_registered")]
  pub registered: bool,
  /// Current registration.
  pub registration: Registration,
}

fn default_registered() -> bool {
  true
}

impl From<InstanceResponse> for DashboardInstance {
  fn from(response: InstanceResponse) -> Self {
    Self {
      id: response.id,
      registered: response.registered,
      registration: response.registration,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_instance_list_ignores_unknown_fields() {
    let json = r#"[{
      "id": "abc123",
      "version": 4,
      "registered": false,
      "statusInfo": {"status": "DOWN"},
      "registration": {
        "name": "orders",
        "managementUrl": "http://h:8080/actuator",
        "healthUrl": "http://h:8080/actuator/health",
        "serviceUrl": "http://h:8080/",
        "source": "discovery",
        "metadata": {"zone": "a"}
      }
    }]"#;

    let parsed: Vec<InstanceResponse> = serde_json::from_str(json).unwrap();
    let instance = DashboardInstance::from(parsed[0].clone());
    assert_eq!(instance.id, InstanceId::of("abc123"));
    assert!(!instance.registered);
    assert!(instance.registration.is_from("discovery"));
    assert_eq!(instance.registration.metadata_text("zone"), Some("a"));
  }

  #[test]
  fn test_registered_defaults_to_true() {
    let json = r#"{"id": "x", "registration": {"name": "a", "healthUrl": "http://h/health"}}"#;
    let parsed: InstanceResponse = serde_json::from_str(json).unwrap();
    assert!(parsed.registered);
    assert_eq!(parsed.registration.source, None);
  }
}
