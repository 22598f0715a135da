//! Collaborator ports.
//!
//! The synchronizers talk to the outside world only through these traits:
//! the hub registry, the local registry, the bus origin check, and the
//! cluster lock. Adapter crates provide the transport-backed
//! implementations; tests substitute in-memory ones.

use crate::flatten::FlatAttributeMap;
use crate::model::{HubDevice, OriginTag, SymmetricKey};
use crate::tenant::TenantHubConfig;
use crate::HubAddress;
use serde_json::{Map, Value};

/// Error taxonomy shared by both registry boundaries.
///
/// Not-found is its own variant so callers can treat deletes of missing
/// devices as benign and map exists-checks without string matching.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// The addressed device does not exist
    #[error("device not found")]
    NotFound,
    /// The connection credential is malformed or unusable
    #[error("credential error: {0}")]
    Credential(String),
    /// Transport failed (timeout, connection, serialization)
    #[error("transport error: {0}")]
    Transport(String),
    /// The registry answered with an error status
    #[error("registry error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the registry
        message: String,
    },
}

/// Decides whether a bus event was raised by another process instance.
pub trait OriginSource {
    /// True when the tagged event originated elsewhere.
    ///
    /// A missing tag means the bus-identity collaborator was unavailable at
    /// emit time; such events are treated as own-origin so forwarding still
    /// happens. The receiving side must absorb the occasional duplicate.
    fn is_foreign(&self, tag: Option<&OriginTag>) -> bool;
}

/// Device registry operations against one tenant's hub.
pub trait HubRegistry {
    /// Register a device in the hub.
    async fn create_device(
        &self,
        device_id: &str,
        enabled: bool,
        key: &SymmetricKey,
    ) -> Result<(), RegistryError>;

    /// Fetch a device, including its primary key.
    async fn device(&self, device_id: &str) -> Result<HubDevice, RegistryError>;

    /// Delete a device. `NotFound` means it was already gone.
    async fn delete_device(&self, device_id: &str) -> Result<(), RegistryError>;

    /// Fetch the device twin's reported properties.
    ///
    /// An absent or empty twin yields an empty map.
    async fn reported_properties(
        &self,
        device_id: &str,
    ) -> Result<Map<String, Value>, RegistryError>;
}

/// Builds a per-tenant hub client from the tenant's connection credential.
pub trait HubConnector {
    /// The hub registry handle this connector produces.
    type Registry: HubRegistry;

    /// Connect to the tenant's hub.
    ///
    /// # Errors
    ///
    /// Returns `Credential` for malformed connection credentials.
    fn connect(&self, config: &TenantHubConfig) -> Result<Self::Registry, RegistryError>;
}

/// Gateway onto the local fleet registry.
///
/// Every call names the tenant explicitly; the synchronization process acts
/// under its own system identity rather than an ambient security context.
pub trait LocalRegistry {
    /// Whether a device exists for the tenant.
    async fn exists(&self, tenant: &str, controller_id: &str) -> Result<bool, RegistryError>;

    /// Create a device owned by hub synchronization.
    async fn create(
        &self,
        tenant: &str,
        controller_id: &str,
        address: &HubAddress,
        security_token: &str,
    ) -> Result<(), RegistryError>;

    /// Delete a device.
    async fn delete(&self, tenant: &str, controller_id: &str) -> Result<(), RegistryError>;

    /// Merge attributes into the device's attribute set.
    ///
    /// Existing keys absent from `attributes` are retained.
    async fn merge_attributes(
        &self,
        tenant: &str,
        controller_id: &str,
        attributes: &FlatAttributeMap,
    ) -> Result<(), RegistryError>;

    /// One page of controller ids whose attributes are flagged for refresh.
    async fn devices_with_attributes_requested(
        &self,
        tenant: &str,
        page_size: usize,
    ) -> Result<Vec<String>, RegistryError>;
}

/// Cluster-wide named lock with non-blocking acquisition.
pub trait SyncLock {
    /// Guard holding the lock; dropping it releases.
    type Guard;

    /// Try to take the named lock without blocking.
    ///
    /// `Ok(None)` means another instance holds it — an expected outcome,
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns error only when the lock backend itself fails.
    fn try_acquire(&self, name: &str) -> Result<Option<Self::Guard>, LockError>;
}

/// Errors from the lock backend.
#[derive(Debug, Clone, thiserror::Error)]
#[error("lock backend error: {0}")]
pub struct LockError(pub String);
