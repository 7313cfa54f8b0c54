use std::path::PathBuf;

/// Errors raised by snapshot operations
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("invalid snapshot name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("snapshot not found: {0}")]
    NotFound(String),

    #[error("snapshot already exists: {0}")]
    AlreadyExists(String),

    #[error("snapshot target is not a directory: {0}")]
    NotADirectory(String),

    /// A snapshot must be reproducible-complete: every artifact the state
    /// references has to exist on disk at creation time
    #[error("missing artifact for stage {stage}: {path} (snapshot aborted)")]
    MissingArtifact { stage: String, path: String },

    /// Structural integrity failure detected before any live mutation
    #[error("snapshot {name} is incomplete or corrupt: {detail}")]
    Incomplete { name: String, detail: String },

    #[error("snapshot metadata protocol mismatch: metadata={metadata} protocol={actual}")]
    ProtocolMismatch { metadata: String, actual: String },

    /// The live workspace has data; restoring over it needs `force`
    #[error("workspace has data; pass force to overwrite it")]
    RequiresForce,

    #[error("cannot parse snapshot metadata {path}: {source}")]
    Metadata {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Workspace(#[from] specflow_workspace::WorkspaceError),

    #[error(transparent)]
    State(#[from] specflow_state::StateError),

    #[error(transparent)]
    Protocol(#[from] specflow_protocol::ProtocolError),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SnapshotError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
