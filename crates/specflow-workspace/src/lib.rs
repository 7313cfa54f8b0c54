//! Specflow workspace foundation
//!
//! Everything that maps logical names onto the filesystem lives here:
//!
//! - [`WorkspaceLayout`]: the on-disk shape of a workspace (`.specflow/`)
//! - [`resolve_input`] / [`resolve_output_relative`]: safe artifact path
//!   resolution (the anti path-traversal boundary)
//! - [`Config`]: the workspace configuration document
//! - filesystem utilities shared by the snapshot and engine layers
//!
//! This crate is a leaf: it knows nothing about protocols, state, or
//! snapshots, only about where their files live.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod error;
mod fsutil;
mod layout;
mod resolve;

pub use config::Config;
pub use error::WorkspaceError;
pub use fsutil::{collect_file_hashes, copy_dir, copy_file, ensure_dir, hash_file};
pub use layout::{Component, WorkspaceLayout, MARKER_DIR};
pub use resolve::{
    artifact_abs_from_state, artifact_rel_from_state, resolve_input, resolve_output_relative,
};
