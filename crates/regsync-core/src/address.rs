//! Hub ownership addresses.
//!
//! A local device whose address carries the `registryB` scheme is owned by
//! hub synchronization: reverse-direction events are only honored for such
//! devices, and the hub name embedded in the address is checked against the
//! tenant's configured hub on every outbound call.

use serde::{Deserialize, Serialize};
use url::Url;

/// URI scheme marking a local device as owned by hub synchronization.
pub const HUB_ADDRESS_SCHEME: &str = "registryB";

/// Address binding a local device to the hub it is mirrored in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HubAddress {
    hub_name: String,
}

impl HubAddress {
    /// Create an address for the given hub.
    #[must_use]
    pub fn new(hub_name: impl Into<String>) -> Self {
        Self {
            hub_name: hub_name.into(),
        }
    }

    /// The hub name this address points at.
    #[must_use]
    pub fn hub_name(&self) -> &str {
        &self.hub_name
    }

    /// Parse an address URI.
    ///
    /// The scheme comparison is case-insensitive; any other scheme means the
    /// device is not owned by hub synchronization.
    ///
    /// # Errors
    ///
    /// Returns error if the URI cannot be parsed, carries a different
    /// scheme, or names no hub.
    pub fn parse(uri: &str) -> Result<Self, AddressError> {
        let url = Url::parse(uri).map_err(|e| AddressError::Invalid(e.to_string()))?;

        if !url.scheme().eq_ignore_ascii_case(HUB_ADDRESS_SCHEME) {
            return Err(AddressError::ForeignScheme(url.scheme().to_string()));
        }

        let hub_name = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or(AddressError::MissingHubName)?;

        Ok(Self::new(hub_name))
    }

    /// Whether a URI marks a device as owned by hub synchronization.
    #[must_use]
    pub fn is_hub_uri(uri: &str) -> bool {
        Self::parse(uri).is_ok()
    }
}

impl std::fmt::Display for HubAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{HUB_ADDRESS_SCHEME}://{}", self.hub_name)
    }
}

/// Errors that can occur parsing a hub address.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AddressError {
    /// The URI is not parseable at all
    #[error("invalid address URI: {0}")]
    Invalid(String),
    /// The URI carries a scheme other than the hub scheme
    #[error("not a hub address (scheme {0})")]
    ForeignScheme(String),
    /// The URI has no host component naming the hub
    #[error("hub address names no hub")]
    MissingHubName,
}
