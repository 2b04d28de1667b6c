//! Instance id generation.
//!
//! The id is the dashboard's upsert key, so it must be stable across
//! renewals of one physical instance and distinct across instances.

use super::instance::{InstanceId, Registration, METADATA_INSTANCE_ID, METADATA_NAME};

/// Number of hex characters kept from the health URL digest.
const HASH_ID_LEN: usize = 12;

/// Derives [`InstanceId`]s from registrations.
///
/// Resolution order:
/// 1. `name:instance-id` when both metadata values are non-blank
/// 2. `instance-id` alone
/// 3. truncated SHA-256 of the health URL
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceIdGenerator;

impl InstanceIdGenerator {
    /// Create a generator.
    pub fn new() -> Self {
        Self
    }

    /// Compute the id for a registration.
    pub fn generate(&self, registration: &Registration) -> InstanceId {
        if let Some(instance_id) = registration.metadata_text(METADATA_INSTANCE_ID) {
            return match registration.metadata_text(METADATA_NAME) {
                Some(name) => InstanceId::of(format!("{name}:{instance_id}")),
                None => InstanceId::of(instance_id),
            };
        }
        hash_url(&registration.health_url)
    }
}

/// Hash-based fallback id: first 12 hex chars of SHA-256(url).
pub fn hash_url(url: &str) -> InstanceId {
    let digest = hmac_sha256::Hash::hash(url.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(HASH_ID_LEN);
    InstanceId::of(encoded)
}
