//! # regsync Agent
//!
//! Bidirectional registry synchronization service.
//!
//! ## Architecture
//!
//! One runtime loop multiplexes three concerns:
//! 1. **Forward**: local registry notifications pushed out to the tenant's hub
//! 2. **Reverse**: hub change-feed batches applied to the local registry
//! 3. **Poll**: periodic, cluster-exclusive refresh of requested attributes

use anyhow::Result;
use regsync_sync::InstanceOrigin;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;
mod lock;
mod runtime;

pub use config::AgentConfig;
pub use runtime::Agent;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting regsync agent");

    // Load configuration
    let config = AgentConfig::from_env()?;

    let instance_id = config.instance_id.unwrap_or_else(Uuid::new_v4);
    let origin = InstanceOrigin::new(instance_id);

    tracing::info!(%instance_id, "Agent initialized");

    let agent = Agent::new(config, origin);

    // Run agent
    agent.run().await?;

    Ok(())
}
