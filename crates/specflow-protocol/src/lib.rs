//! Specflow protocol model
//!
//! A protocol is the ordered stage graph governing one workflow, plus the
//! approval and lint declarations attached to it. Protocols can import
//! other protocols through an ordered `uses` list; this crate resolves
//! those imports depth-first, merges stages with deterministic override
//! precedence, rejects true import cycles while tolerating diamond-shaped
//! shared bases, and validates the merged result.
//!
//! Loading is pure with respect to workspace layout: [`Protocol::load`]
//! takes a concrete file path, and [`ProtocolSource`] is the tagged value
//! callers use to decide name-vs-path exactly once.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod loader;
mod model;
mod source;

pub use error::ProtocolError;
pub use model::{ApprovalDecl, LintRules, OutputContract, PromptOptions, Protocol, Stage};
pub use source::ProtocolSource;

/// Protocol used when the configuration names none
pub const DEFAULT_PROTOCOL_NAME: &str = "default";
