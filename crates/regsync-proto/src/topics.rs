//! Bus topic scheme.
//!
//! Topic structure: `regsync/v1/{stream}` with two consumed streams:
//! - `registry/events`: local registry change notifications (CBOR)
//! - `hub/events`: hub change-feed batches (JSON)

use serde::{Deserialize, Serialize};

/// Protocol version for the topic scheme.
pub const PROTOCOL_VERSION: &str = "v1";

/// Which stream a topic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Local registry change notification
    LocalNotification,
    /// Hub change-feed batch
    HubBatch,
}

/// Topic scheme configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicScheme {
    /// Topic prefix (default: "regsync")
    pub prefix: String,
}

impl Default for TopicScheme {
    fn default() -> Self {
        Self {
            prefix: "regsync".to_string(),
        }
    }
}

impl TopicScheme {
    /// Create a scheme with a custom prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Topic carrying local registry notifications.
    #[must_use]
    pub fn local_events(&self) -> String {
        format!("{}/{PROTOCOL_VERSION}/registry/events", self.prefix)
    }

    /// Topic carrying hub change-feed batches.
    #[must_use]
    pub fn hub_events(&self) -> String {
        format!("{}/{PROTOCOL_VERSION}/hub/events", self.prefix)
    }

    /// Classify an incoming topic.
    #[must_use]
    pub fn parse(&self, topic: &str) -> Option<MessageType> {
        if topic == self.local_events() {
            Some(MessageType::LocalNotification)
        } else if topic == self.hub_events() {
            Some(MessageType::HubBatch)
        } else {
            None
        }
    }
}
