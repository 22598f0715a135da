//! # regsync Hub Adapter
//!
//! HTTP client onto a tenant's device-twin hub registry: device
//! create/get/delete and reported-properties retrieval. Implements the
//! `HubRegistry` and `HubConnector` ports from `regsync-core`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod credential;
pub mod encoding;

pub use client::{HubClient, HubClientFactory, HubClientFactoryConfig};
pub use credential::{ConnectionCredential, CredentialError};
pub use encoding::encode_device_id;
