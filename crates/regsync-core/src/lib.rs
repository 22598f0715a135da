//! # regsync Core
//!
//! Domain model and pure reconciliation logic for regsync.
//!
//! This crate provides:
//! - Tenant ↔ hub directory with per-direction sync toggles
//! - Reported-properties flattening into the flat attribute model
//! - Hub ownership addresses (`registryB://<hubName>`)
//! - Collaborator port traits implemented by the adapter crates

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(async_fn_in_trait)]

pub mod address;
pub mod flatten;
pub mod model;
pub mod ports;
pub mod tenant;

pub use address::HubAddress;
pub use flatten::{flatten, FlatAttributeMap, ATTRIBUTE_NAMESPACE};
pub use model::{DeviceIdentity, HubDevice, OriginTag, SymmetricKey};
pub use ports::{
    HubConnector, HubRegistry, LocalRegistry, LockError, OriginSource, RegistryError, SyncLock,
};
pub use tenant::{SyncDirections, TenantHubConfig, TenantHubDirectory};
