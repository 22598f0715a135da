//! Forward synchronization: local registry changes pushed to the hub.
//!
//! Reacts to the three local notification kinds. Only the instance that
//! originated a change propagates it; devices whose address already marks
//! them as hub-owned are never pushed back, which keeps the two feeds from
//! looping. All hub failures are logged with device context and swallowed;
//! the next scheduled poll or change event is the recovery path.

use crate::twin::sync_reported_attributes;
use regsync_core::{
    DeviceIdentity, HubAddress, HubConnector, HubRegistry, LocalRegistry, OriginSource, OriginTag,
    RegistryError, SymmetricKey, TenantHubConfig, TenantHubDirectory,
};
use regsync_proto::LocalNotification;
use std::sync::Arc;

/// Pushes local registry changes out to the owning tenant's hub.
pub struct ForwardSynchronizer<C, L, O> {
    directory: Arc<TenantHubDirectory>,
    connector: C,
    local: L,
    origin: O,
}

impl<C, L, O> ForwardSynchronizer<C, L, O>
where
    C: HubConnector,
    L: LocalRegistry,
    O: OriginSource,
{
    /// Create a forward synchronizer.
    pub fn new(directory: Arc<TenantHubDirectory>, connector: C, local: L, origin: O) -> Self {
        Self {
            directory,
            connector,
            local,
            origin,
        }
    }

    /// Handle one local registry notification.
    pub async fn handle(&self, notification: &LocalNotification) {
        match notification {
            LocalNotification::DeviceCreated {
                tenant,
                device,
                origin,
            } => self.on_created(tenant, device, origin.as_ref()).await,
            LocalNotification::AttributesRequested {
                tenant,
                controller_id,
                address,
                origin,
            } => {
                self.on_attributes_requested(tenant, controller_id, address.as_deref(), origin.as_ref())
                    .await;
            }
            LocalNotification::DeviceDeleted {
                tenant,
                controller_id,
                address,
                origin,
            } => {
                self.on_deleted(tenant, controller_id, address.as_deref(), origin.as_ref())
                    .await;
            }
        }
    }

    async fn on_created(&self, tenant: &str, device: &DeviceIdentity, origin: Option<&OriginTag>) {
        if self.origin.is_foreign(origin) {
            return;
        }
        // A hub-addressed device came from the hub in the first place.
        if device.address.as_deref().is_some_and(HubAddress::is_hub_uri) {
            return;
        }
        let Some(config) = self.directory.config_for(tenant) else {
            return;
        };
        if !config.sync.local_to_hub {
            return;
        }

        let hub = match self.connector.connect(config) {
            Ok(hub) => hub,
            Err(err) => {
                tracing::error!(tenant, error = %err, "Failed to connect to hub");
                return;
            }
        };

        let key = SymmetricKey::from_single(&device.security_token);
        if let Err(err) = hub.create_device(&device.controller_id, true, &key).await {
            tracing::error!(
                tenant,
                controller_id = %device.controller_id,
                error = %err,
                "Failed to add device to hub"
            );
        }
    }

    async fn on_attributes_requested(
        &self,
        tenant: &str,
        controller_id: &str,
        address: Option<&str>,
        origin: Option<&OriginTag>,
    ) {
        if self.origin.is_foreign(origin) {
            return;
        }
        let Some((_, config)) = self.resolve_hub_owned(tenant, controller_id, address) else {
            return;
        };
        if !config.sync.hub_to_local {
            return;
        }

        let hub = match self.connector.connect(config) {
            Ok(hub) => hub,
            Err(err) => {
                tracing::error!(tenant, error = %err, "Failed to connect to hub");
                return;
            }
        };

        sync_reported_attributes(&hub, &self.local, tenant, controller_id).await;
    }

    async fn on_deleted(
        &self,
        tenant: &str,
        controller_id: &str,
        address: Option<&str>,
        origin: Option<&OriginTag>,
    ) {
        if self.origin.is_foreign(origin) {
            return;
        }
        let Some((_, config)) = self.resolve_hub_owned(tenant, controller_id, address) else {
            return;
        };
        if !config.sync.local_to_hub {
            return;
        }

        let hub = match self.connector.connect(config) {
            Ok(hub) => hub,
            Err(err) => {
                tracing::error!(tenant, error = %err, "Failed to connect to hub");
                return;
            }
        };

        match hub.delete_device(controller_id).await {
            Ok(()) | Err(RegistryError::NotFound) => {
                tracing::debug!(tenant, controller_id, "Device deleted from hub");
            }
            Err(err) => {
                tracing::error!(
                    tenant,
                    controller_id,
                    error = %err,
                    "Failed to remove device from hub"
                );
            }
        }
    }

    /// Resolve a hub-owned device address against the tenant's configured
    /// hub. A mismatch is a security-relevant skip and is logged for audit.
    fn resolve_hub_owned(
        &self,
        tenant: &str,
        controller_id: &str,
        address: Option<&str>,
    ) -> Option<(HubAddress, &TenantHubConfig)> {
        let address = HubAddress::parse(address?).ok()?;
        let config = self.directory.config_for(tenant)?;

        if !config.hub_name.eq_ignore_ascii_case(address.hub_name()) {
            tracing::warn!(
                tenant,
                controller_id,
                hub = address.hub_name(),
                configured_hub = %config.hub_name,
                "Dropping event addressed to a hub outside the tenant"
            );
            return None;
        }

        Some((address, config))
    }
}
