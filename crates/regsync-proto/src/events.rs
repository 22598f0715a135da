//! Hub change-feed events.
//!
//! The hub publishes registry changes as batches of JSON events. Field names
//! and event-type strings are fixed by the feed; unknown fields are ignored
//! and unknown event types are preserved for the consumer to log. A single
//! event missing a required field is rejected without failing its batch.

use serde::Deserialize;
use serde_json::Value;

/// Event type string for device creation.
pub const EVENT_DEVICE_CREATED: &str = "Microsoft.Devices.DeviceCreated";
/// Event type string for device connection.
pub const EVENT_DEVICE_CONNECTED: &str = "Microsoft.Devices.DeviceConnected";
/// Event type string for device deletion.
pub const EVENT_DEVICE_DELETED: &str = "Microsoft.Devices.DeviceDeleted";

/// Kind of change reported by the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// Device was created in the hub
    DeviceCreated,
    /// Device connected to the hub
    DeviceConnected,
    /// Device was deleted from the hub
    DeviceDeleted,
    /// An event type this version does not know
    Other(String),
}

impl ChangeKind {
    /// Map a feed event-type string onto a kind.
    #[must_use]
    pub fn from_event_type(event_type: &str) -> Self {
        match event_type {
            EVENT_DEVICE_CREATED => Self::DeviceCreated,
            EVENT_DEVICE_CONNECTED => Self::DeviceConnected,
            EVENT_DEVICE_DELETED => Self::DeviceDeleted,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeviceCreated => write!(f, "{EVENT_DEVICE_CREATED}"),
            Self::DeviceConnected => write!(f, "{EVENT_DEVICE_CONNECTED}"),
            Self::DeviceDeleted => write!(f, "{EVENT_DEVICE_DELETED}"),
            Self::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// One validated change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Kind of change
    pub kind: ChangeKind,
    /// Device the change concerns
    pub device_id: String,
    /// Hub that reported the change
    pub hub_name: String,
}

/// Raw event shape before validation. Unknown fields are dropped silently.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    event_type: Option<String>,
    data: Option<RawEventData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEventData {
    device_id: Option<String>,
    hub_name: Option<String>,
}

impl ChangeEvent {
    /// Decode and validate a single event.
    ///
    /// # Errors
    ///
    /// Returns error if the value is not an event object or a required
    /// field (`eventType`, `data.deviceId`, `data.hubName`) is missing or
    /// empty.
    pub fn decode(value: &Value) -> Result<Self, EventDecodeError> {
        let raw: RawEvent = serde_json::from_value(value.clone())
            .map_err(|e| EventDecodeError::Malformed(e.to_string()))?;

        let event_type = raw
            .event_type
            .filter(|t| !t.is_empty())
            .ok_or(EventDecodeError::MissingField("eventType"))?;
        let data = raw.data.ok_or(EventDecodeError::MissingField("data"))?;
        let device_id = data
            .device_id
            .filter(|d| !d.is_empty())
            .ok_or(EventDecodeError::MissingField("data.deviceId"))?;
        let hub_name = data
            .hub_name
            .filter(|h| !h.is_empty())
            .ok_or(EventDecodeError::MissingField("data.hubName"))?;

        Ok(Self {
            kind: ChangeKind::from_event_type(&event_type),
            device_id,
            hub_name,
        })
    }
}

/// An ordered batch of change events as delivered by the feed transport.
///
/// Order is preserved per hub; no ordering is assumed between events of
/// different hubs within one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeEventBatch {
    /// Events in delivery order
    pub events: Vec<ChangeEvent>,
}

impl ChangeEventBatch {
    /// Decode a JSON array payload into a batch.
    ///
    /// Individual invalid events are dropped with a warning; only a payload
    /// that is not an event array at all fails the batch.
    ///
    /// # Errors
    ///
    /// Returns error if the payload is not a JSON array.
    pub fn decode(payload: &[u8]) -> Result<Self, EventDecodeError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| EventDecodeError::Malformed(e.to_string()))?;

        let Value::Array(entries) = value else {
            return Err(EventDecodeError::NotABatch);
        };

        let mut events = Vec::with_capacity(entries.len());
        for entry in &entries {
            match ChangeEvent::decode(entry) {
                Ok(event) => events.push(event),
                Err(err) => {
                    tracing::warn!(error = %err, "Dropping invalid change event");
                }
            }
        }

        Ok(Self { events })
    }

    /// Whether the batch carries no valid events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Errors that can occur decoding change events.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventDecodeError {
    /// Payload is not valid JSON of the expected shape
    #[error("malformed event payload: {0}")]
    Malformed(String),
    /// Payload is valid JSON but not an event array
    #[error("change feed payload is not an event array")]
    NotABatch,
    /// A required field is absent or empty
    #[error("missing required field {0}")]
    MissingField(&'static str),
}
