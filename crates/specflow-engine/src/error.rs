use crate::compile::RenderError;
use std::path::PathBuf;

/// Errors raised by orchestrator operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown stage: {0}")]
    UnknownStage(String),

    /// Dependency gating: the first unmet prerequisite found
    #[error("missing dependency: {dependency} (required by {stage})")]
    MissingDependency { stage: String, dependency: String },

    /// Approvals must be declared in the protocol before they can be recorded
    #[error("approval not declared in protocol: stage={stage} role={role}")]
    ApprovalNotDeclared { stage: String, role: String },

    /// A bulk health check surfaced warnings and the caller opted into failing
    #[error("check failed with {count} warnings")]
    CheckFailed { count: usize },

    #[error("unknown journal entry: {0}")]
    UnknownJournalEntry(String),

    #[error(transparent)]
    Workspace(#[from] specflow_workspace::WorkspaceError),

    #[error(transparent)]
    Protocol(#[from] specflow_protocol::ProtocolError),

    #[error(transparent)]
    State(#[from] specflow_state::StateError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
