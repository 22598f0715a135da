//! Reverse synchronization: hub change-feed batches applied locally.
//!
//! Events arrive batched and are grouped by hub name; each group resolves
//! to exactly one tenant through the directory, and the whole group is
//! dropped when no tenant owns the hub or the tenant has the direction
//! disabled. Within a group events stay in delivery order and every call
//! names the tenant explicitly; the process acts under its own system
//! identity throughout.

use crate::twin::sync_reported_attributes;
use regsync_core::{
    HubAddress, HubConnector, HubRegistry, LocalRegistry, TenantHubConfig, TenantHubDirectory,
};
use regsync_proto::{ChangeEvent, ChangeEventBatch, ChangeKind};
use std::sync::Arc;

/// Applies hub registry changes to the local registry.
pub struct ReverseSynchronizer<C, L> {
    directory: Arc<TenantHubDirectory>,
    connector: C,
    local: L,
}

impl<C, L> ReverseSynchronizer<C, L>
where
    C: HubConnector,
    L: LocalRegistry,
{
    /// Create a reverse synchronizer.
    pub fn new(directory: Arc<TenantHubDirectory>, connector: C, local: L) -> Self {
        Self {
            directory,
            connector,
            local,
        }
    }

    /// Process one change-event batch.
    ///
    /// A single device's failure never aborts its group or the batch.
    pub async fn process_batch(&self, batch: &ChangeEventBatch) {
        for (hub_name, events) in group_by_hub(&batch.events) {
            let Some(tenant) = self.directory.tenant_for(hub_name) else {
                tracing::warn!(hub = hub_name, "Dropping events from hub bound to no tenant");
                continue;
            };
            let Some(config) = self.directory.config_for(tenant) else {
                continue;
            };
            if !config.sync.hub_to_local {
                tracing::debug!(tenant, hub = hub_name, "Hub-to-local sync disabled");
                continue;
            }

            let hub = match self.connector.connect(config) {
                Ok(hub) => hub,
                Err(err) => {
                    tracing::error!(tenant, hub = hub_name, error = %err, "Failed to connect to hub");
                    continue;
                }
            };

            for event in events {
                self.process_event(&hub, config, event).await;
            }
        }
    }

    async fn process_event(&self, hub: &C::Registry, config: &TenantHubConfig, event: &ChangeEvent) {
        let tenant = config.tenant_id.as_str();
        tracing::debug!(
            tenant,
            kind = %event.kind,
            hub = %event.hub_name,
            device_id = %event.device_id,
            "Processing hub change event"
        );

        match &event.kind {
            // A created device is always also treated as connected; both
            // mean "make sure the local record exists and is hub-addressed".
            ChangeKind::DeviceCreated | ChangeKind::DeviceConnected => {
                if self.ensure_local_device(hub, tenant, event).await {
                    sync_reported_attributes(hub, &self.local, tenant, &event.device_id).await;
                }
            }
            ChangeKind::DeviceDeleted => self.on_deleted(tenant, &event.device_id).await,
            ChangeKind::Other(raw) => {
                tracing::debug!(tenant, kind = raw, "Ignoring unknown change event kind");
            }
        }
    }

    /// Idempotent upsert of the local record for a hub device.
    ///
    /// The primary key is always fetched from the hub before creating so
    /// the local record carries a usable security token.
    async fn ensure_local_device(&self, hub: &C::Registry, tenant: &str, event: &ChangeEvent) -> bool {
        match self.local.exists(tenant, &event.device_id).await {
            Ok(true) => true,
            Ok(false) => {
                let device = match hub.device(&event.device_id).await {
                    Ok(device) => device,
                    Err(err) => {
                        tracing::error!(
                            tenant,
                            device_id = %event.device_id,
                            error = %err,
                            "Failed to retrieve device from hub"
                        );
                        return false;
                    }
                };

                let address = HubAddress::new(&event.hub_name);
                match self
                    .local
                    .create(tenant, &event.device_id, &address, &device.primary_key)
                    .await
                {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::error!(
                            tenant,
                            device_id = %event.device_id,
                            error = %err,
                            "Failed to register hub device locally"
                        );
                        false
                    }
                }
            }
            Err(err) => {
                tracing::error!(
                    tenant,
                    device_id = %event.device_id,
                    error = %err,
                    "Failed to check device existence"
                );
                false
            }
        }
    }

    async fn on_deleted(&self, tenant: &str, device_id: &str) {
        match self.local.exists(tenant, device_id).await {
            Ok(true) => {
                if let Err(err) = self.local.delete(tenant, device_id).await {
                    tracing::error!(tenant, device_id, error = %err, "Failed to delete device locally");
                }
            }
            Ok(false) => {
                // Already absent locally; nothing to delete.
            }
            Err(err) => {
                tracing::error!(tenant, device_id, error = %err, "Failed to check device existence");
            }
        }
    }
}

/// Group events by hub name, preserving delivery order within each group.
fn group_by_hub(events: &[ChangeEvent]) -> Vec<(&str, Vec<&ChangeEvent>)> {
    let mut groups: Vec<(&str, Vec<&ChangeEvent>)> = Vec::new();
    for event in events {
        match groups.iter_mut().find(|(hub, _)| *hub == event.hub_name) {
            Some((_, group)) => group.push(event),
            None => groups.push((event.hub_name.as_str(), vec![event])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::{directory, tenant_config, HubState, LocalState, MockConnector, MockLocal};
    use regsync_core::SyncDirections;

    type Synchronizer = ReverseSynchronizer<MockConnector, MockLocal>;

    struct Fixture {
        hub: Arc<HubState>,
        local: Arc<LocalState>,
        synchronizer: Synchronizer,
    }

    fn fixture(configs: Vec<TenantHubConfig>) -> Fixture {
        let hub = Arc::new(HubState::default());
        let local = Arc::new(LocalState::default());
        let synchronizer = ReverseSynchronizer::new(
            directory(configs),
            MockConnector::new(Arc::clone(&hub)),
            MockLocal::new(Arc::clone(&local)),
        );
        Fixture {
            hub,
            local,
            synchronizer,
        }
    }

    fn event(kind: ChangeKind, device_id: &str, hub_name: &str) -> ChangeEvent {
        ChangeEvent {
            kind,
            device_id: device_id.to_string(),
            hub_name: hub_name.to_string(),
        }
    }

    fn batch(events: Vec<ChangeEvent>) -> ChangeEventBatch {
        ChangeEventBatch { events }
    }

    #[test]
    fn grouping_preserves_order_per_hub() {
        let events = vec![
            event(ChangeKind::DeviceCreated, "a1", "hub-a"),
            event(ChangeKind::DeviceCreated, "b1", "hub-b"),
            event(ChangeKind::DeviceDeleted, "a2", "hub-a"),
        ];

        let groups = group_by_hub(&events);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "hub-a");
        assert_eq!(groups[0].1.iter().map(|e| e.device_id.as_str()).collect::<Vec<_>>(), ["a1", "a2"]);
        assert_eq!(groups[1].0, "hub-b");
    }

    #[tokio::test]
    async fn connected_event_registers_unknown_device_with_fetched_key() {
        let f = fixture(vec![tenant_config("alpha", "hub-a")]);
        f.hub.insert_device("device-1", "hub-primary-key");

        f.synchronizer
            .process_batch(&batch(vec![event(
                ChangeKind::DeviceConnected,
                "device-1",
                "hub-a",
            )]))
            .await;

        let creates = f.local.creates();
        assert_eq!(creates.len(), 1);
        let (tenant, controller_id, address, token) = &creates[0];
        assert_eq!(tenant, "alpha");
        assert_eq!(controller_id, "device-1");
        assert_eq!(address, "registryB://hub-a");
        assert_eq!(token, "hub-primary-key");
    }

    #[tokio::test]
    async fn created_event_is_idempotent_for_known_device() {
        let f = fixture(vec![tenant_config("alpha", "hub-a")]);
        f.hub.insert_device("device-1", "hub-primary-key");
        f.local.insert_device("device-1", "registryB://hub-a", "tok3n");

        f.synchronizer
            .process_batch(&batch(vec![event(
                ChangeKind::DeviceCreated,
                "device-1",
                "hub-a",
            )]))
            .await;

        assert!(f.local.creates().is_empty());
        assert_eq!(f.local.device_token("device-1").unwrap(), "tok3n");
    }

    #[tokio::test]
    async fn created_event_pulls_reported_attributes() {
        let f = fixture(vec![tenant_config("alpha", "hub-a")]);
        f.hub.insert_device("device-1", "hub-primary-key");
        f.hub
            .set_twin("device-1", serde_json::json!({ "Root1": "stringValue" }));

        f.synchronizer
            .process_batch(&batch(vec![event(
                ChangeKind::DeviceCreated,
                "device-1",
                "hub-a",
            )]))
            .await;

        assert_eq!(f.hub.twin_fetches(), vec!["device-1"]);
        let merges = f.local.merges();
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0].1["azureiot#Root1"], "stringValue");
    }

    #[tokio::test]
    async fn deletion_of_unknown_device_is_a_no_op() {
        let f = fixture(vec![tenant_config("alpha", "hub-a")]);

        f.synchronizer
            .process_batch(&batch(vec![event(
                ChangeKind::DeviceDeleted,
                "ghost",
                "hub-a",
            )]))
            .await;

        assert!(f.local.deletes().is_empty());
    }

    #[tokio::test]
    async fn deletion_removes_known_device() {
        let f = fixture(vec![tenant_config("alpha", "hub-a")]);
        f.local.insert_device("device-1", "registryB://hub-a", "tok3n");

        f.synchronizer
            .process_batch(&batch(vec![event(
                ChangeKind::DeviceDeleted,
                "device-1",
                "hub-a",
            )]))
            .await;

        assert_eq!(f.local.deletes(), vec!["device-1"]);
        assert!(!f.local.has_device("device-1"));
    }

    #[tokio::test]
    async fn events_from_unbound_hub_are_dropped() {
        let f = fixture(vec![tenant_config("alpha", "hub-a")]);
        f.hub.insert_device("device-1", "hub-primary-key");

        f.synchronizer
            .process_batch(&batch(vec![event(
                ChangeKind::DeviceConnected,
                "device-1",
                "hub-nobody-owns",
            )]))
            .await;

        assert!(f.local.creates().is_empty());
        assert_eq!(f.hub.connects(), 0);
    }

    #[tokio::test]
    async fn disabled_direction_drops_the_group() {
        let mut config = tenant_config("alpha", "hub-a");
        config.sync = SyncDirections {
            local_to_hub: true,
            hub_to_local: false,
        };
        let f = fixture(vec![config]);
        f.hub.insert_device("device-1", "hub-primary-key");

        f.synchronizer
            .process_batch(&batch(vec![event(
                ChangeKind::DeviceConnected,
                "device-1",
                "hub-a",
            )]))
            .await;

        assert!(f.local.creates().is_empty());
    }

    #[tokio::test]
    async fn one_failing_device_does_not_abort_the_group() {
        let f = fixture(vec![tenant_config("alpha", "hub-a")]);
        // "missing" is unknown in the hub, so its key fetch fails;
        // "device-2" must still be processed afterwards.
        f.hub.insert_device("device-2", "key-2");

        f.synchronizer
            .process_batch(&batch(vec![
                event(ChangeKind::DeviceConnected, "missing", "hub-a"),
                event(ChangeKind::DeviceConnected, "device-2", "hub-a"),
            ]))
            .await;

        let creates = f.local.creates();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].1, "device-2");
    }

    #[tokio::test]
    async fn unknown_event_kind_is_ignored() {
        let f = fixture(vec![tenant_config("alpha", "hub-a")]);
        f.hub.insert_device("device-1", "key-1");

        f.synchronizer
            .process_batch(&batch(vec![event(
                ChangeKind::Other("Microsoft.Devices.DeviceTelemetry".to_string()),
                "device-1",
                "hub-a",
            )]))
            .await;

        assert!(f.local.creates().is_empty());
        assert!(f.local.deletes().is_empty());
    }

    #[tokio::test]
    async fn mixed_hub_batch_routes_to_each_tenant() {
        let f = fixture(vec![
            tenant_config("alpha", "hub-a"),
            tenant_config("beta", "hub-b"),
        ]);
        f.hub.insert_device("a1", "key-a");
        f.hub.insert_device("b1", "key-b");

        f.synchronizer
            .process_batch(&batch(vec![
                event(ChangeKind::DeviceConnected, "a1", "hub-a"),
                event(ChangeKind::DeviceConnected, "b1", "hub-b"),
            ]))
            .await;

        let creates = f.local.creates();
        assert_eq!(creates.len(), 2);
        assert_eq!(creates[0].0, "alpha");
        assert_eq!(creates[1].0, "beta");
    }
}
