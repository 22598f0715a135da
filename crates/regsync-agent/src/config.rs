//! Agent configuration.

use anyhow::{Context, Result};
use regsync_core::TenantHubConfig;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Instance unique identifier; generated when absent
    pub instance_id: Option<Uuid>,

    /// MQTT broker URL for the internal bus
    pub mqtt_broker: String,

    /// Local registry gateway configuration
    pub registry: RegistryConfig,

    /// Path of the shared lock database
    pub lock_db_path: PathBuf,

    /// Attribute poll period
    pub poll_interval: Duration,

    /// Page size for attribute-requested queries
    pub page_size: usize,

    /// Tenant ↔ hub bindings
    pub tenants: Vec<TenantHubConfig>,
}

/// Local registry gateway configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Management API base URL
    pub base_url: String,

    /// Bearer token for the synchronization process
    pub bearer_token: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            instance_id: None,
            mqtt_broker: "tcp://localhost:1883".to_string(),
            registry: RegistryConfig {
                base_url: "http://localhost:8080".to_string(),
                bearer_token: None,
            },
            lock_db_path: PathBuf::from("./regsync-locks.db"),
            poll_interval: Duration::from_millis(2000),
            page_size: 1000,
            tenants: Vec::new(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `REGSYNC_INSTANCE_ID`: Instance UUID
    /// - `REGSYNC_MQTT_BROKER`: MQTT broker URL
    /// - `REGSYNC_REGISTRY_URL`: Local registry management API base URL
    /// - `REGSYNC_REGISTRY_TOKEN`: Bearer token for the registry
    /// - `REGSYNC_LOCK_DB_PATH`: Shared lock database path
    /// - `REGSYNC_POLL_INTERVAL_MS`: Attribute poll period in milliseconds
    /// - `REGSYNC_PAGE_SIZE`: Attribute-requested page size
    /// - `REGSYNC_TENANTS`: JSON array of tenant ↔ hub bindings
    ///
    /// # Errors
    ///
    /// Returns error if a variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(id) = std::env::var("REGSYNC_INSTANCE_ID") {
            config.instance_id = Some(Uuid::parse_str(&id).context("Invalid REGSYNC_INSTANCE_ID")?);
        }

        if let Ok(broker) = std::env::var("REGSYNC_MQTT_BROKER") {
            config.mqtt_broker = broker;
        }

        if let Ok(url) = std::env::var("REGSYNC_REGISTRY_URL") {
            config.registry.base_url = url;
        }

        if let Ok(token) = std::env::var("REGSYNC_REGISTRY_TOKEN") {
            config.registry.bearer_token = Some(token);
        }

        if let Ok(path) = std::env::var("REGSYNC_LOCK_DB_PATH") {
            config.lock_db_path = PathBuf::from(path);
        }

        if let Ok(interval) = std::env::var("REGSYNC_POLL_INTERVAL_MS") {
            let millis: u64 = interval
                .parse()
                .context("Invalid REGSYNC_POLL_INTERVAL_MS")?;
            config.poll_interval = Duration::from_millis(millis);
        }

        if let Ok(page_size) = std::env::var("REGSYNC_PAGE_SIZE") {
            config.page_size = page_size.parse().context("Invalid REGSYNC_PAGE_SIZE")?;
        }

        if let Ok(tenants_json) = std::env::var("REGSYNC_TENANTS") {
            config.tenants =
                serde_json::from_str(&tenants_json).context("Invalid REGSYNC_TENANTS JSON")?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AgentConfig::default();

        assert_eq!(config.mqtt_broker, "tcp://localhost:1883");
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.page_size, 1000);
        assert!(config.tenants.is_empty());
    }

    #[test]
    fn tenants_parse_from_json() {
        let tenants: Vec<TenantHubConfig> = serde_json::from_str(
            r#"[
                {
                    "tenantId": "alpha",
                    "hubName": "hub-a",
                    "connectionCredential": "HostName=hub-a.example.net;SharedAccessKeyName=o;SharedAccessKey=a2V5",
                    "sync": { "localToHubEnabled": true, "hubToLocalEnabled": false }
                },
                {
                    "tenantId": "beta",
                    "hubName": "hub-b",
                    "connectionCredential": "HostName=hub-b.example.net;SharedAccessKeyName=o;SharedAccessKey=a2V5"
                }
            ]"#,
        )
        .unwrap();

        assert_eq!(tenants.len(), 2);
        assert!(!tenants[0].sync.hub_to_local);
        assert!(tenants[1].sync.hub_to_local);
    }
}
