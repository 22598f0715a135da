//! HTTP client for the local registry's management API.
//!
//! The synchronization process authenticates with its own system token and
//! names the acting tenant on every request via the `X-Tenant` header; no
//! ambient identity is involved.

use regsync_core::{FlatAttributeMap, HubAddress, LocalRegistry, RegistryError};
use regsync_hub::encode_device_id;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Local registry client configuration.
#[derive(Debug, Clone)]
pub struct LocalRegistryClientConfig {
    /// Base URL of the management API (e.g. <http://localhost:8080>)
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Bearer token the synchronization process authenticates with
    pub bearer_token: Option<String>,
}

impl Default for LocalRegistryClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(30),
            bearer_token: None,
        }
    }
}

/// Client for the local registry management API.
#[derive(Debug, Clone)]
pub struct LocalRegistryClient {
    http: Client,
    config: LocalRegistryClientConfig,
}

impl LocalRegistryClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: LocalRegistryClientConfig) -> Result<Self, RegistryError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        Ok(Self { http, config })
    }

    fn target_url(&self, controller_id: &str) -> String {
        format!(
            "{}/rest/v1/targets/{}",
            self.config.base_url,
            encode_device_id(controller_id)
        )
    }

    fn request(&self, builder: reqwest::RequestBuilder, tenant: &str) -> reqwest::RequestBuilder {
        let builder = builder.header("X-Tenant", tenant);
        match &self.config.bearer_token {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        }
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

impl LocalRegistry for LocalRegistryClient {
    async fn exists(&self, tenant: &str, controller_id: &str) -> Result<bool, RegistryError> {
        let url = self.target_url(controller_id);
        tracing::debug!(tenant, controller_id, url, "GET target");

        let response = self
            .request(self.http.get(&url), tenant)
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        match Self::check(response).await {
            Ok(_) => Ok(true),
            Err(RegistryError::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn create(
        &self,
        tenant: &str,
        controller_id: &str,
        address: &HubAddress,
        security_token: &str,
    ) -> Result<(), RegistryError> {
        let url = format!("{}/rest/v1/targets", self.config.base_url);
        tracing::debug!(tenant, controller_id, url, "POST target");

        // The management API takes a list of targets to provision.
        let body = serde_json::json!([{
            "controllerId": controller_id,
            "name": controller_id,
            "address": address.to_string(),
            "securityToken": security_token,
        }]);

        let response = self
            .request(self.http.post(&url), tenant)
            .json(&body)
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, tenant: &str, controller_id: &str) -> Result<(), RegistryError> {
        let url = self.target_url(controller_id);
        tracing::debug!(tenant, controller_id, url, "DELETE target");

        let response = self
            .request(self.http.delete(&url), tenant)
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        Self::check(response).await?;
        Ok(())
    }

    async fn merge_attributes(
        &self,
        tenant: &str,
        controller_id: &str,
        attributes: &FlatAttributeMap,
    ) -> Result<(), RegistryError> {
        let url = format!("{}/attributes", self.target_url(controller_id));
        tracing::debug!(
            tenant,
            controller_id,
            count = attributes.len(),
            "PUT target attributes (merge)"
        );

        let body = serde_json::json!({
            "mode": "merge",
            "attributes": attributes,
        });

        let response = self
            .request(self.http.put(&url), tenant)
            .json(&body)
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        Self::check(response).await?;
        Ok(())
    }

    async fn devices_with_attributes_requested(
        &self,
        tenant: &str,
        page_size: usize,
    ) -> Result<Vec<String>, RegistryError> {
        let url = format!(
            "{}/rest/v1/targets?q=attributesRequested%3D%3Dtrue&limit={page_size}",
            self.config.base_url
        );
        tracing::debug!(tenant, page_size, url, "GET attribute-requested targets");

        let response = self
            .request(self.http.get(&url), tenant)
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        let body: Value = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        Ok(page_controller_ids(&body))
    }
}

/// Pull controller ids out of a paged targets response.
fn page_controller_ids(body: &Value) -> Vec<String> {
    body.get("content")
        .and_then(Value::as_array)
        .map(|content| {
            content
                .iter()
                .filter_map(|entry| entry.get("controllerId").and_then(Value::as_str))
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}
