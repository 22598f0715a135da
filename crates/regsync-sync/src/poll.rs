//! Periodic attribute refresh.
//!
//! On every tick the poller tries a named cluster-wide lock without
//! blocking. Losing the race is the normal scale-out outcome: the instance
//! skips the tick entirely and defers to the next one, it never queues.
//! With the lock held it walks all configured tenants and refreshes the
//! devices flagged "attributes requested", one page per tenant per run.

use crate::twin::sync_reported_attributes;
use regsync_core::{
    HubConnector, LocalRegistry, SyncLock, TenantHubConfig, TenantHubDirectory,
};
use std::sync::Arc;
use std::time::Duration;

/// Default poll period in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 2000;

/// Default number of devices refreshed per tenant per run.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Name of the cluster-wide lock serializing poll runs.
pub const LOCK_NAME: &str = "deviceAttributeSync";

/// Poller configuration.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Tick period
    pub interval: Duration,
    /// Page size for the attribute-requested query
    pub page_size: usize,
    /// Lock name shared by all instances
    pub lock_name: String,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            page_size: DEFAULT_PAGE_SIZE,
            lock_name: LOCK_NAME.to_string(),
        }
    }
}

/// Cluster-exclusive periodic attribute reconciler.
pub struct AttributePoller<C, L, K> {
    directory: Arc<TenantHubDirectory>,
    connector: C,
    local: L,
    lock: K,
    config: PollConfig,
}

impl<C, L, K> AttributePoller<C, L, K>
where
    C: HubConnector,
    L: LocalRegistry,
    K: SyncLock,
{
    /// Create a poller.
    pub fn new(
        directory: Arc<TenantHubDirectory>,
        connector: C,
        local: L,
        lock: K,
        config: PollConfig,
    ) -> Self {
        Self {
            directory,
            connector,
            local,
            lock,
            config,
        }
    }

    /// The configured tick period.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Run one poll attempt.
    ///
    /// Returns without touching any device when another instance holds the
    /// lock. The lock guard is dropped, and thereby released, on every exit
    /// path.
    pub async fn tick(&self) {
        let guard = match self.lock.try_acquire(&self.config.lock_name) {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                tracing::trace!("Attribute poll already running on another instance");
                return;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Skipping attribute poll, lock backend failed");
                return;
            }
        };

        for config in self.directory.tenants() {
            // One tenant failing must not starve the others.
            self.refresh_tenant(config).await;
        }

        drop(guard);
    }

    async fn refresh_tenant(&self, config: &TenantHubConfig) {
        let tenant = config.tenant_id.as_str();

        let hub = match self.connector.connect(config) {
            Ok(hub) => hub,
            Err(err) => {
                tracing::error!(tenant, error = %err, "Failed to connect to hub");
                return;
            }
        };

        let page = match self
            .local
            .devices_with_attributes_requested(tenant, self.config.page_size)
            .await
        {
            Ok(page) => page,
            Err(err) => {
                tracing::error!(tenant, error = %err, "Failed to query attribute-requested devices");
                return;
            }
        };

        tracing::debug!(tenant, devices = page.len(), "Refreshing reported attributes");

        for controller_id in &page {
            sync_reported_attributes(&hub, &self.local, tenant, controller_id).await;
        }
    }
}
