//! Specflow snapshot engine
//!
//! A snapshot is an immutable, named, point-in-time copy of the whole
//! workspace: artifact store, generated outputs, protocols, templates,
//! configuration, and serialized state, plus a metadata document. The same
//! [`SnapshotManager`] serves two namespaces: permanent archives and
//! disposable parallel tracks.
//!
//! Durability comes from filesystem atomicity, not locking: creation
//! builds in an invisible `<name>.tmp` sibling and becomes visible via a
//! single rename; restore stages everything before mutating the live
//! workspace, then swaps component-by-component with `.old` backups and
//! reverse-order rollback on failure.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod compare;
mod error;
mod manager;
mod name;
mod restore;

pub use compare::SnapshotDiff;
pub use error::SnapshotError;
pub use manager::{SnapshotManager, SnapshotMetadata};
pub use name::validate_name;
