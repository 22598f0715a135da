//! # regsync Proto
//!
//! Wire formats for the two event streams regsync consumes, plus the bus
//! topic scheme:
//! - Local registry change notifications (CBOR on the internal bus)
//! - Hub change-feed event batches (JSON, field names fixed by the feed)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod events;
pub mod notifications;
pub mod topics;

pub use events::{ChangeEvent, ChangeEventBatch, ChangeKind, EventDecodeError};
pub use notifications::{LocalNotification, MessageError};
pub use topics::{MessageType, TopicScheme};
