//! Device-facing value types shared across the synchronization paths.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A device record as known to the local registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Controller id, globally unique per tenant
    pub controller_id: String,
    /// Security token the device authenticates with
    pub security_token: String,
    /// Address URI; a `registryB://` address marks hub ownership
    pub address: Option<String>,
}

impl DeviceIdentity {
    /// Create a device record.
    #[must_use]
    pub fn new(
        controller_id: impl Into<String>,
        security_token: impl Into<String>,
        address: Option<String>,
    ) -> Self {
        Self {
            controller_id: controller_id.into(),
            security_token: security_token.into(),
            address,
        }
    }
}

/// Symmetric key pair for hub device registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymmetricKey {
    /// Primary key
    pub primary: String,
    /// Secondary key
    pub secondary: String,
}

impl SymmetricKey {
    /// Create a key pair from distinct keys.
    #[must_use]
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    /// Use one token as both primary and secondary key.
    ///
    /// The local registry tracks a single security token per device, so hub
    /// registration installs it on both slots.
    #[must_use]
    pub fn from_single(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            primary: token.clone(),
            secondary: token,
        }
    }
}

/// A device as reported by the hub registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubDevice {
    /// Device id (matches the local controller id)
    pub device_id: String,
    /// Primary symmetric key registered in the hub
    pub primary_key: String,
}

/// Marker identifying which process instance raised a bus event.
///
/// Every outbound mutation carries the emitting instance's tag; inbound
/// handlers compare it against their own instance id to decide whether the
/// change originated here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginTag(Uuid);

impl OriginTag {
    /// Tag for the given process instance.
    #[must_use]
    pub fn new(instance_id: Uuid) -> Self {
        Self(instance_id)
    }

    /// The instance id carried by this tag.
    #[must_use]
    pub fn instance_id(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for OriginTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_key_from_single_fills_both_slots() {
        let key = SymmetricKey::from_single("tok3n");
        assert_eq!(key.primary, "tok3n");
        assert_eq!(key.secondary, "tok3n");
    }

    #[test]
    fn origin_tag_compares_by_instance() {
        let id = Uuid::new_v4();
        assert_eq!(OriginTag::new(id), OriginTag::new(id));
        assert_ne!(OriginTag::new(id), OriginTag::new(Uuid::new_v4()));
    }
}
