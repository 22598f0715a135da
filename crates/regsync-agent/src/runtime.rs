//! Agent runtime orchestration.

use crate::config::AgentConfig;
use crate::lock::SqliteLockRegistry;
use anyhow::{Context, Result};
use regsync_core::TenantHubDirectory;
use regsync_hub::{HubClientFactory, HubClientFactoryConfig};
use regsync_proto::{ChangeEventBatch, LocalNotification, MessageType, TopicScheme};
use regsync_registry::{LocalRegistryClient, LocalRegistryClientConfig};
use regsync_sync::{
    AttributePoller, ForwardSynchronizer, InstanceOrigin, PollConfig, ReverseSynchronizer,
};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;

/// The main agent runtime.
pub struct Agent {
    config: AgentConfig,
    origin: InstanceOrigin,
}

impl Agent {
    /// Create a new agent.
    #[must_use]
    pub fn new(config: AgentConfig, origin: InstanceOrigin) -> Self {
        Self { config, origin }
    }

    /// Run the agent's main loop.
    ///
    /// # Errors
    ///
    /// Returns error if any component fails to initialize.
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            tenants = self.config.tenants.len(),
            "Starting agent runtime"
        );

        let directory = Arc::new(
            TenantHubDirectory::new(self.config.tenants.clone())
                .context("Invalid tenant configuration")?,
        );

        let hub_factory = HubClientFactory::new(&HubClientFactoryConfig::default())
            .context("Failed to create hub client factory")?;

        let local = LocalRegistryClient::new(LocalRegistryClientConfig {
            base_url: self.config.registry.base_url.clone(),
            timeout: Duration::from_secs(30),
            bearer_token: self.config.registry.bearer_token.clone(),
        })
        .context("Failed to create local registry client")?;

        let lock = SqliteLockRegistry::open(&self.config.lock_db_path, self.origin.instance_id())
            .context("Failed to open lock database")?;

        let forward = ForwardSynchronizer::new(
            Arc::clone(&directory),
            hub_factory.clone(),
            local.clone(),
            self.origin,
        );
        let reverse =
            ReverseSynchronizer::new(Arc::clone(&directory), hub_factory.clone(), local.clone());
        let poller = AttributePoller::new(
            directory,
            hub_factory,
            local,
            lock,
            PollConfig {
                interval: self.config.poll_interval,
                page_size: self.config.page_size,
                ..PollConfig::default()
            },
        );

        // Connect to the bus and subscribe to both consumed streams.
        let topics = TopicScheme::default();
        let (host, port) = parse_mqtt_url(&self.config.mqtt_broker);
        let mut options = MqttOptions::new(
            format!("regsync-{}", self.origin.instance_id()),
            host,
            port,
        );
        options.set_keep_alive(Duration::from_secs(5));

        let (client, mut eventloop) = AsyncClient::new(options, 64);
        client
            .subscribe(topics.local_events(), QoS::AtLeastOnce)
            .await
            .context("Failed to subscribe to local events")?;
        client
            .subscribe(topics.hub_events(), QoS::AtLeastOnce)
            .await
            .context("Failed to subscribe to hub events")?;

        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + poller.interval(),
            poller.interval(),
        );

        tracing::info!("Agent running, press Ctrl+C to stop");

        loop {
            tokio::select! {
                event = eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            match topics.parse(&publish.topic) {
                                Some(MessageType::LocalNotification) => {
                                    match LocalNotification::from_cbor(&publish.payload) {
                                        Ok(notification) => forward.handle(&notification).await,
                                        Err(err) => {
                                            tracing::warn!(error = %err, "Failed to decode local notification");
                                        }
                                    }
                                }
                                Some(MessageType::HubBatch) => {
                                    match ChangeEventBatch::decode(&publish.payload) {
                                        Ok(batch) => reverse.process_batch(&batch).await,
                                        Err(err) => {
                                            tracing::warn!(error = %err, "Failed to decode change-event batch");
                                        }
                                    }
                                }
                                None => {}
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "MQTT error");
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                    }
                }

                _ = ticker.tick() => {
                    poller.tick().await;
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        tracing::info!("Agent stopped");
        Ok(())
    }
}

/// Split an MQTT broker URL into host and port.
fn parse_mqtt_url(url: &str) -> (String, u16) {
    let url = url
        .strip_prefix("tcp://")
        .or_else(|| url.strip_prefix("mqtt://"))
        .unwrap_or(url);

    let parts: Vec<&str> = url.split(':').collect();

    let host = parts.first().copied().unwrap_or("localhost").to_string();
    let port = parts.get(1).and_then(|p| p.parse().ok()).unwrap_or(1883);

    (host, port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mqtt_url_parsing() {
        assert_eq!(parse_mqtt_url("tcp://broker:1884"), ("broker".to_string(), 1884));
        assert_eq!(parse_mqtt_url("mqtt://broker"), ("broker".to_string(), 1883));
        assert_eq!(parse_mqtt_url("broker"), ("broker".to_string(), 1883));
    }
}
