//! Shared device-twin attribute sync.
//!
//! Both directions funnel attribute refreshes through this routine: fetch
//! the device's reported properties from the hub, flatten them, and merge
//! them into the local attribute set. Used event-triggered by the
//! synchronizers and time-triggered by the attribute poller.

use regsync_core::{flatten, HubRegistry, LocalRegistry};

/// Pull a device's reported properties and merge them locally.
///
/// No-ops when the twin carries no reported properties or the device is not
/// known to the local registry; an attribute pull never creates a device.
/// Failures are logged with device context and never escape, so callers can
/// keep iterating a batch or page.
pub async fn sync_reported_attributes<H, L>(hub: &H, local: &L, tenant: &str, controller_id: &str)
where
    H: HubRegistry,
    L: LocalRegistry,
{
    let properties = match hub.reported_properties(controller_id).await {
        Ok(properties) => properties,
        Err(err) => {
            tracing::error!(
                tenant,
                controller_id,
                error = %err,
                "Failed to retrieve device twin from hub"
            );
            return;
        }
    };

    if properties.is_empty() {
        tracing::debug!(tenant, controller_id, "Device twin has no reported properties");
        return;
    }

    match local.exists(tenant, controller_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(tenant, controller_id, "Device unknown locally, skipping merge");
            return;
        }
        Err(err) => {
            tracing::error!(tenant, controller_id, error = %err, "Failed to check device existence");
            return;
        }
    }

    let attributes = flatten(&properties);
    if let Err(err) = local.merge_attributes(tenant, controller_id, &attributes).await {
        tracing::error!(
            tenant,
            controller_id,
            error = %err,
            "Failed to merge reported attributes"
        );
    }
}
