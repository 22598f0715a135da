//! HTTP client for the hub device registry.
//!
//! One `HubClient` is scoped to a single tenant's hub, built by the factory
//! from the tenant's connection credential. All calls carry a bounded
//! timeout so event handlers can never block indefinitely.

use crate::credential::ConnectionCredential;
use crate::encoding::encode_device_id;
use regsync_core::{HubConnector, HubDevice, HubRegistry, RegistryError, SymmetricKey, TenantHubConfig};
use reqwest::{Client, Response, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;

/// REST API version pinned for all hub calls.
const API_VERSION: &str = "2021-04-12";

/// Factory configuration.
#[derive(Debug, Clone)]
pub struct HubClientFactoryConfig {
    /// Request timeout applied to every hub call
    pub timeout: Duration,
}

impl Default for HubClientFactoryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// Builds per-tenant hub clients over one shared connection pool.
#[derive(Debug, Clone)]
pub struct HubClientFactory {
    http: Client,
}

impl HubClientFactory {
    /// Create a factory.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &HubClientFactoryConfig) -> Result<Self, RegistryError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        Ok(Self { http })
    }
}

impl HubConnector for HubClientFactory {
    type Registry = HubClient;

    fn connect(&self, config: &TenantHubConfig) -> Result<HubClient, RegistryError> {
        let credential = ConnectionCredential::parse(&config.connection_credential)
            .map_err(|e| RegistryError::Credential(e.to_string()))?;

        Ok(HubClient {
            http: self.http.clone(),
            credential,
        })
    }
}

/// Client for one tenant's hub registry.
#[derive(Debug, Clone)]
pub struct HubClient {
    http: Client,
    credential: ConnectionCredential,
}

impl HubClient {
    fn device_url(&self, device_id: &str) -> String {
        format!(
            "{}/devices/{}?api-version={API_VERSION}",
            self.credential.base_url(),
            encode_device_id(device_id)
        )
    }

    fn twin_url(&self, device_id: &str) -> String {
        format!(
            "{}/twins/{}?api-version={API_VERSION}",
            self.credential.base_url(),
            encode_device_id(device_id)
        )
    }

    fn auth_header(&self) -> String {
        format!(
            "SharedAccessKey {}:{}",
            self.credential.key_name, self.credential.key
        )
    }

    async fn check(response: Response) -> Result<Response, RegistryError> {
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound);
        }
        if !response.status().is_success() {
            return Err(RegistryError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response)
    }
}

impl HubRegistry for HubClient {
    async fn create_device(
        &self,
        device_id: &str,
        enabled: bool,
        key: &SymmetricKey,
    ) -> Result<(), RegistryError> {
        let url = self.device_url(device_id);
        tracing::debug!(device_id, url, "PUT hub device");

        let body = serde_json::json!({
            "deviceId": device_id,
            "status": if enabled { "enabled" } else { "disabled" },
            "authentication": {
                "type": "sas",
                "symmetricKey": {
                    "primaryKey": key.primary,
                    "secondaryKey": key.secondary,
                }
            }
        });

        let response = self
            .http
            .put(&url)
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        Self::check(response).await?;
        Ok(())
    }

    async fn device(&self, device_id: &str) -> Result<HubDevice, RegistryError> {
        let url = self.device_url(device_id);
        tracing::debug!(device_id, url, "GET hub device");

        let response = self
            .http
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        let body: Value = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        device_from_body(device_id, &body)
    }

    async fn delete_device(&self, device_id: &str) -> Result<(), RegistryError> {
        let url = self.device_url(device_id);
        tracing::debug!(device_id, url, "DELETE hub device");

        let response = self
            .http
            .delete(&url)
            .header("Authorization", self.auth_header())
            .header("If-Match", "*")
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        Self::check(response).await?;
        Ok(())
    }

    async fn reported_properties(
        &self,
        device_id: &str,
    ) -> Result<Map<String, Value>, RegistryError> {
        let url = self.twin_url(device_id);
        tracing::debug!(device_id, url, "GET device twin");

        let response = self
            .http
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        let body: Value = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        Ok(reported_from_twin(&body))
    }
}

/// Extract id and primary key from a device document.
fn device_from_body(device_id: &str, body: &Value) -> Result<HubDevice, RegistryError> {
    let primary_key = body
        .pointer("/authentication/symmetricKey/primaryKey")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            RegistryError::Transport("device document carries no primary key".to_string())
        })?;

    Ok(HubDevice {
        device_id: body
            .get("deviceId")
            .and_then(Value::as_str)
            .unwrap_or(device_id)
            .to_string(),
        primary_key: primary_key.to_string(),
    })
}

/// Extract reported properties from a twin document.
///
/// Bookkeeping entries (`$metadata`, `$version`) are not device state and
/// are filtered out.
fn reported_from_twin(twin: &Value) -> Map<String, Value> {
    twin.pointer("/properties/reported")
        .and_then(Value::as_object)
        .map(|reported| {
            reported
                .iter()
                .filter(|(key, _)| !key.starts_with('$'))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}
