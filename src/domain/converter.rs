//! Descriptor → Registration conversion.
//!
//! Derives the service, management and health URLs the dashboard needs
//! from a registry descriptor, honouring the usual metadata overrides
//! (`management.port`, `management.context-path`, `health.path`, ...).

use std::collections::BTreeMap;

use thiserror::Error;

use super::instance::{Registration, ServiceDescriptor};

const KEY_SERVICE_PATH: &str = "service-path";
const KEY_MANAGEMENT_SCHEME: &str = "management.scheme";
const KEY_MANAGEMENT_ADDRESS: &str = "management.address";
const KEY_MANAGEMENT_PORT: &str = "management.port";
const KEY_MANAGEMENT_PATH: &str = "management.context-path";
const KEY_HEALTH_PATH: &str = "health.path";

/// Why a descriptor could not be turned into a registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("descriptor has no service id")]
    MissingServiceId,

    #[error("instance {0} has no host")]
    MissingHost(String),

    #[error("instance {0} has port 0")]
    InvalidPort(String),

    #[error("instance {instance} has unparsable management.port {value:?}")]
    InvalidManagementPort { instance: String, value: String },
}

/// Converts registry descriptors into tagged dashboard registrations.
#[derive(Debug, Clone)]
pub struct ServiceInstanceConverter {
    /// Default management context path (`/actuator`).
    management_context_path: String,
    /// Default health endpoint path relative to management (`health`).
    health_endpoint_path: String,
    /// Source tag stamped on every registration.
    source: String,
}

impl ServiceInstanceConverter {
    /// Create a converter with explicit defaults.
    pub fn new(
        management_context_path: impl Into<String>,
        health_endpoint_path: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            management_context_path: management_context_path.into(),
            health_endpoint_path: health_endpoint_path.into(),
            source: source.into(),
        }
    }

    /// Source tag this converter stamps.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Build a registration for `descriptor`.
    ///
    /// # Errors
    /// Returns [`ConversionError`] when the descriptor lacks the fields
    /// needed to address the instance.
    pub fn convert(&self, descriptor: &ServiceDescriptor) -> Result<Registration, ConversionError> {
        if descriptor.service_id.trim().is_empty() {
            return Err(ConversionError::MissingServiceId);
        }
        if descriptor.host.trim().is_empty() {
            return Err(ConversionError::MissingHost(descriptor.instance_id.clone()));
        }
        if descriptor.port == 0 {
            return Err(ConversionError::InvalidPort(descriptor.instance_id.clone()));
        }

        let management_url = self.management_url(descriptor)?;
        let health_url = match descriptor
            .health_check_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
        {
            Some(url) => url.to_string(),
            None => join_url(&management_url, &[self.health_path(descriptor)]),
        };

        Ok(Registration {
            name: descriptor.service_id.clone(),
            management_url: Some(management_url),
            health_url,
            service_url: Some(self.service_url(descriptor)),
            source: Some(self.source.clone()),
            metadata: descriptor
                .metadata
                .iter()
                .filter(|(k, _)| !k.trim().is_empty())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        })
    }

    fn service_url(&self, descriptor: &ServiceDescriptor) -> String {
        let path = text(&descriptor.metadata, KEY_SERVICE_PATH).unwrap_or("/");
        let mut url = join_url(&descriptor.uri(), &[path]);
        if !url.ends_with('/') {
            url.push('/');
        }
        url
    }

    fn management_url(&self, descriptor: &ServiceDescriptor) -> Result<String, ConversionError> {
        let meta = &descriptor.metadata;
        let scheme = text(meta, KEY_MANAGEMENT_SCHEME).unwrap_or_else(|| descriptor.scheme());
        let host = text(meta, KEY_MANAGEMENT_ADDRESS).unwrap_or(&descriptor.host);
        let port = match text(meta, KEY_MANAGEMENT_PORT) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                ConversionError::InvalidManagementPort {
                    instance: descriptor.instance_id.clone(),
                    value: raw.to_string(),
                }
            })?,
            None => descriptor.port,
        };
        let service_path = text(meta, KEY_SERVICE_PATH).unwrap_or("/");
        let management_path =
            text(meta, KEY_MANAGEMENT_PATH).unwrap_or(&self.management_context_path);

        Ok(join_url(
            &format!("{scheme}://{host}:{port}"),
            &[service_path, management_path],
        ))
    }

    fn health_path<'a>(&'a self, descriptor: &'a ServiceDescriptor) -> &'a str {
        text(&descriptor.metadata, KEY_HEALTH_PATH).unwrap_or(&self.health_endpoint_path)
    }
}

/// Non-blank metadata lookup.
fn text<'a>(metadata: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

/// Append path segments to a base URL, collapsing duplicate slashes.
fn join_url(base: &str, segments: &[&str]) -> String {
    let mut path = String::new();
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }

    let mut collapsed = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(c);
    }

    let trimmed = collapsed.trim_end_matches('/');
    if trimmed.is_empty() {
        base.to_string()
    } else {
        format!("{}{trimmed}", base.trim_end_matches('/'))
    }
}
