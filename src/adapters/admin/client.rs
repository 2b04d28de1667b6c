//! Admin Server Client - Adapter for the InstanceRegistry Port
//!
//! Talks to a Spring-Boot-Admin-compatible server:
//! - `POST /instances` upserts a registration and returns its id
//! - `DELETE /instances/{id}` deregisters (404 counts as done)
//! - `GET /instances` lists every record with its registration
//!
//! Ids are free-form, so they always travel as a single encoded path
//! segment.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use super::types::{InstanceResponse, RegisterResponse};
use crate::adapters::http::{HttpClient, HttpError};
use crate::domain::instance::{DashboardInstance, InstanceId, Registration};
use crate::ports::dashboard::InstanceRegistry;

const INSTANCES: &str = "instances";

/// Admin server REST client backed by the shared HTTP client.
pub struct AdminClient {
    /// Shared HTTP client (base URL = admin server root).
    client: Arc<HttpClient>,
}

impl AdminClient {
    /// Create a new admin client.
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InstanceRegistry for AdminClient {
    #[instrument(skip(self, registration), fields(name = %registration.name))]
    async fn register(&self, registration: Registration) -> Result<InstanceId> {
        let response = self
            .client
            .post_json(&[INSTANCES], &registration)
            .await
            .context("Failed to register instance with admin server")?;
        let body: RegisterResponse = response
            .json()
            .await
            .context("Failed to parse admin server registration response")?;
        debug!(id = %body.id, "Registered instance with admin server");
        Ok(body.id)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn deregister(&self, id: &InstanceId) -> Result<()> {
        match self.client.delete(&[INSTANCES, id.as_str()]).await {
            Ok(_) => Ok(()),
            Err(HttpError::Status {
                status: StatusCode::NOT_FOUND,
                ..
            }) => {
                debug!("Instance already unknown to admin server");
                Ok(())
            }
            Err(e) => Err(e).context("Failed to deregister instance from admin server"),
        }
    }

    async fn instances(&self) -> Result<Vec<DashboardInstance>> {
        let response = self
            .client
            .get(&[INSTANCES])
            .await
            .context("Failed to list admin server instances")?;
        let instances: Vec<InstanceResponse> = response
            .json()
            .await
            .context("Failed to parse admin server instance list")?;
        Ok(instances.into_iter().map(DashboardInstance::from).collect())
    }

    async fn is_healthy(&self) -> bool {
        self.client.get(&[INSTANCES]).await.is_ok()
    }
}
