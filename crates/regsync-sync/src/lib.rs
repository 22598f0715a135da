//! # regsync Sync
//!
//! The bidirectional reconciliation core:
//! - `ForwardSynchronizer`: local registry changes pushed to the hub
//! - `ReverseSynchronizer`: hub change-feed batches applied locally
//! - A shared device-twin attribute sync routine used by both directions
//! - `AttributePoller`: periodic, cluster-exclusive attribute refresh
//! - `InstanceOrigin`: keeps one instance from re-propagating bus events
//!   another instance already handled

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod forward;
pub mod origin;
pub mod poll;
pub mod reverse;
pub mod twin;

#[cfg(test)]
pub(crate) mod support;

pub use forward::ForwardSynchronizer;
pub use origin::InstanceOrigin;
pub use poll::{AttributePoller, PollConfig};
pub use reverse::ReverseSynchronizer;
pub use twin::sync_reported_attributes;
