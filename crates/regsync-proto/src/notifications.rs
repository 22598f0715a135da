//! Local registry change notifications.
//!
//! Every mutation of the local registry is announced on the internal bus so
//! that all service instances observe it. Each notification carries the
//! emitting instance's origin tag; the forward synchronizer uses it to make
//! sure only the originating instance propagates the change to the hub.

use regsync_core::{DeviceIdentity, OriginTag};
use serde::{Deserialize, Serialize};

/// A change notification from the local registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LocalNotification {
    /// A device was created locally.
    #[serde(rename_all = "camelCase")]
    DeviceCreated {
        /// Tenant the device belongs to
        tenant: String,
        /// The created device record
        device: DeviceIdentity,
        /// Emitting instance, if known
        origin: Option<OriginTag>,
    },
    /// A device was deleted locally.
    #[serde(rename_all = "camelCase")]
    DeviceDeleted {
        /// Tenant the device belonged to
        tenant: String,
        /// Controller id of the deleted device
        controller_id: String,
        /// Address the device carried, if any
        address: Option<String>,
        /// Emitting instance, if known
        origin: Option<OriginTag>,
    },
    /// A device's attributes were flagged for refresh.
    #[serde(rename_all = "camelCase")]
    AttributesRequested {
        /// Tenant the device belongs to
        tenant: String,
        /// Controller id of the device
        controller_id: String,
        /// Address the device carries, if any
        address: Option<String>,
        /// Emitting instance, if known
        origin: Option<OriginTag>,
    },
}

impl LocalNotification {
    /// Tenant the notification belongs to.
    #[must_use]
    pub fn tenant(&self) -> &str {
        match self {
            Self::DeviceCreated { tenant, .. }
            | Self::DeviceDeleted { tenant, .. }
            | Self::AttributesRequested { tenant, .. } => tenant,
        }
    }

    /// Origin tag carried by the notification.
    #[must_use]
    pub fn origin(&self) -> Option<&OriginTag> {
        match self {
            Self::DeviceCreated { origin, .. }
            | Self::DeviceDeleted { origin, .. }
            | Self::AttributesRequested { origin, .. } => origin.as_ref(),
        }
    }

    /// Serialize to CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_cbor(&self) -> Result<Vec<u8>, MessageError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| MessageError::Serialize(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize from CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, MessageError> {
        ciborium::from_reader(bytes).map_err(|e| MessageError::Deserialize(e.to_string()))
    }
}

/// Errors for notification serialization/deserialization.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MessageError {
    /// Serialization failed
    #[error("serialization failed: {0}")]
    Serialize(String),
    /// Deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialize(String),
}
