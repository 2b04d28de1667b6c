//! Eureka Registry Client - Adapter for the ServiceRegistry Port
//!
//! Queries a Eureka server's REST API for the full application list.
//! An unreachable server maps to `RegistryError::Unavailable` so that
//! reconciliation degrades to a no-op instead of evicting everything.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, instrument};

use super::types::{AppsResponse, InstanceInfo};
use crate::adapters::http::{HttpClient, HttpError};
use crate::domain::instance::Application;
use crate::ports::registry::{RegistryError, ServiceRegistry};

/// Eureka REST client backed by the shared HTTP client.
pub struct EurekaClient {
  /// Shared HTTP client (base URL = `.../eureka`).
  client: Arc<HttpClient>,
}

impl EurekaClient {
  /// Create a new Eureka client.
  pub fn new(client: Arc<HttpClient>) -> Self {
    Self { client }
  }

  /// Fetch the raw `/apps` payload.
  ///
  /// # Errors
  /// Unreachable server → `Unavailable`; anything else → `Other`.
  #[instrument(skip(self))]
  pub async fn fetch_apps(&self) -> Result<AppsResponse, RegistryError> {
    let response = self.client.get(&["apps"]).await.map_err(map_http_error)?;
    let apps: AppsResponse = response
      .json()
      .await
      .context("Failed to parse Eureka /apps response")?;
    debug!(
      applications = apps.applications.application.len(),
      "Fetched Eureka applications"
    );
    Ok(apps)
  }

  /// Every instance in a raw payload, across applications.
  pub fn instances(apps: &AppsResponse) -> impl Iterator<Item = &InstanceInfo> {
    apps
      .applications
      .application
      .iter()
      .flat_map(|app| app.instance.iter())
  }
}

/// Group a raw payload into sorted domain applications.
pub fn to_applications(apps: &AppsResponse) -> Vec<Application> {
  let mut applications: Vec<Application> = apps
    .applications
    .application
    .iter()
    .map(|app| {
      Application::new(
        app.name.to_lowercase(),
        app.instance.iter().map(InstanceInfo::to_descriptor).collect(),
      )
    })
    .collect();
  applications.sort_by(|a, b| a.name.cmp(&b.name));
  applications
}

fn map_http_error(error: HttpError) -> RegistryError {
  if error.is_connect() {
    RegistryError::Unavailable
  } else if error.status() == Some(reqwest::StatusCode::SERVICE_UNAVAILABLE) {
    // Eureka answers 503 while it is still starting up.
    RegistryError::Unavailable
  } else {
    RegistryError::Other(anyhow::Error::new(error))
  }
}

#[async_trait]
impl ServiceRegistry for EurekaClient {
  async fn applications(&self) -> Result<Vec<Application>, RegistryError> {
    let apps = self.fetch_apps().await?;
    Ok(to_applications(&apps))
  }

  async fn is_healthy(&self) -> bool {
    self.fetch_apps().await.is_ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_to_applications_lowercases_and_sorts() {
    let json = r#"{"applications": {"application": [
      {"name": "PAYMENTS", "instance": [{"hostName": "h", "app": "PAYMENTS", "port": {"$": 1, "@enabled": "true"}}]},
      {"name": "ORDERS", "instance": []}
    ]}}"#;
    let apps: AppsResponse = serde_json::from_str(json).unwrap();
    let applications = to_applications(&apps);

    let names: Vec<_> = applications.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["orders", "payments"]);
    assert_eq!(applications[1].instances[0].service_id, "payments");
    assert_eq!(EurekaClient::instances(&apps).count(), 1);
  }
}
