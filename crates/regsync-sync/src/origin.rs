//! Instance-origin filtering.
//!
//! Every service instance observes the full local-event stream. To keep a
//! change from being propagated once per instance, only the instance whose
//! tag an event carries acts on it; everyone else drops it.

use regsync_core::{OriginSource, OriginTag};
use uuid::Uuid;

/// Origin identity of this process instance.
#[derive(Debug, Clone, Copy)]
pub struct InstanceOrigin {
    instance_id: Uuid,
}

impl InstanceOrigin {
    /// Create an origin identity for this instance.
    #[must_use]
    pub fn new(instance_id: Uuid) -> Self {
        Self { instance_id }
    }

    /// This instance's id.
    #[must_use]
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Tag to stamp on outbound mutations raised by this instance.
    #[must_use]
    pub fn tag(&self) -> OriginTag {
        OriginTag::new(self.instance_id)
    }
}

impl OriginSource for InstanceOrigin {
    fn is_foreign(&self, tag: Option<&OriginTag>) -> bool {
        tag.is_some_and(|tag| tag.instance_id() != self.instance_id)
    }
}
