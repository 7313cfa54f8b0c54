//! Specflow workflow state
//!
//! The persistent record of progress for one workspace: which stages
//! completed (in order), what each produced, and who approved what. The
//! state value is mutated only through the methods here, and persisted
//! after every mutation via an atomic write-temp-then-rename.
//!
//! Invariant: a stage id appears in `completed_stages` exactly when it has
//! an entry in `stage_outputs`; [`WorkflowState::record_completion`] is the
//! single mutator maintaining it.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod journal;
mod model;
mod persist;

pub use journal::{Assumption, Decision, Journal, OpenQuestion, Risk};
pub use model::{ApprovalRecord, StageOutput, WorkflowState};
pub use persist::StateError;
