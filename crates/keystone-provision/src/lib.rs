//! # keystone-provision
//!
//! The reconciliation engine. Given a [`Blueprint`](keystone_common::blueprint::Blueprint)
//! and a [`StructureDocument`](keystone_common::models::StructureDocument), it
//! converges one server's roles, categories, channels and permission
//! overwrites through a [`RemoteStore`].
//!
//! Runs are sequential and best effort: a failed mutation is logged and
//! counted in the [`RunReport`], never retried, and never aborts the run.

pub mod channels;
pub mod document;
pub mod orchestrator;
pub mod overwrites;
pub mod pacing;
pub mod report;
pub mod roles;
pub mod snapshot;
pub mod store;

#[cfg(test)]
pub(crate) mod memory;

pub use orchestrator::{Orchestrator, RunGuard, RunLock};
pub use pacing::Pacing;
pub use report::{Failure, RunReport, Tally};
pub use snapshot::{CaptureMode, RemoteSnapshot};
pub use store::{RemoteStore, ServerStore};
