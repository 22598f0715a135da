//! Tenant ↔ hub directory.
//!
//! Each tenant owns exactly one hub endpoint. The directory is built once
//! from configuration, validated at load time, and never mutated afterwards;
//! config reloads build a fresh directory instead.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-direction synchronization toggles, both enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncDirections {
    /// Propagate local registry changes to the hub
    #[serde(rename = "localToHubEnabled", default = "enabled")]
    pub local_to_hub: bool,
    /// Propagate hub changes (and reported attributes) to the local registry
    #[serde(rename = "hubToLocalEnabled", default = "enabled")]
    pub hub_to_local: bool,
}

fn enabled() -> bool {
    true
}

impl Default for SyncDirections {
    fn default() -> Self {
        Self {
            local_to_hub: true,
            hub_to_local: true,
        }
    }
}

/// Hub binding and credentials for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantHubConfig {
    /// Tenant identifier, unique across the directory
    pub tenant_id: String,
    /// Name of the hub owned by this tenant, unique across the directory
    pub hub_name: String,
    /// Connection credential for the hub endpoint
    pub connection_credential: String,
    /// Direction toggles
    #[serde(default)]
    pub sync: SyncDirections,
}

/// Read-only lookup from tenant to hub config and from hub name to tenant.
#[derive(Debug)]
pub struct TenantHubDirectory {
    by_tenant: BTreeMap<String, TenantHubConfig>,
    tenant_by_hub: BTreeMap<String, String>,
}

impl TenantHubDirectory {
    /// Build a directory, validating uniqueness of tenants and hub names.
    ///
    /// # Errors
    ///
    /// Returns error on duplicate tenant ids or on two tenants claiming the
    /// same hub name (case-insensitive) — an ambiguous hub mapping must be
    /// rejected at load, not discovered at lookup time.
    pub fn new(configs: Vec<TenantHubConfig>) -> Result<Self, DirectoryError> {
        let mut by_tenant = BTreeMap::new();
        let mut tenant_by_hub = BTreeMap::new();

        for config in configs {
            if config.tenant_id.is_empty() || config.hub_name.is_empty() {
                return Err(DirectoryError::EmptyBinding);
            }

            let tenant_key = config.tenant_id.to_lowercase();
            let hub_key = config.hub_name.to_lowercase();

            if let Some(holder) = tenant_by_hub.insert(hub_key, config.tenant_id.clone()) {
                return Err(DirectoryError::AmbiguousHub {
                    hub_name: config.hub_name,
                    first: holder,
                    second: config.tenant_id,
                });
            }

            if let Some(previous) = by_tenant.insert(tenant_key, config) {
                return Err(DirectoryError::DuplicateTenant(previous.tenant_id));
            }
        }

        Ok(Self {
            by_tenant,
            tenant_by_hub,
        })
    }

    /// Look up the hub config for a tenant (case-insensitive).
    #[must_use]
    pub fn config_for(&self, tenant_id: &str) -> Option<&TenantHubConfig> {
        self.by_tenant.get(&tenant_id.to_lowercase())
    }

    /// Look up the tenant owning a hub (case-insensitive exact match).
    #[must_use]
    pub fn tenant_for(&self, hub_name: &str) -> Option<&str> {
        self.tenant_by_hub
            .get(&hub_name.to_lowercase())
            .map(String::as_str)
    }

    /// Iterate all configured tenants.
    pub fn tenants(&self) -> impl Iterator<Item = &TenantHubConfig> {
        self.by_tenant.values()
    }

    /// Number of configured tenants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_tenant.len()
    }

    /// Whether no tenants are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_tenant.is_empty()
    }
}

/// Errors rejected when building the directory.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    /// A config row is missing its tenant id or hub name
    #[error("tenant binding with empty tenant id or hub name")]
    EmptyBinding,
    /// Two configs share one tenant id
    #[error("duplicate tenant id: {0}")]
    DuplicateTenant(String),
    /// Two tenants claim the same hub name
    #[error("hub {hub_name} is claimed by tenants {first} and {second}")]
    AmbiguousHub {
        /// The contested hub name
        hub_name: String,
        /// The tenant that claimed the hub first
        first: String,
        /// The tenant that claimed it again
        second: String,
    },
}
