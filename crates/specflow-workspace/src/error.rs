use std::path::PathBuf;

/// Errors raised by workspace layout and path resolution
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// No `.specflow` or `.git` marker found walking up from the start directory
    #[error("no workspace root found above {start}")]
    RootNotFound { start: PathBuf },

    /// Absolute paths are never accepted as logical artifact paths
    #[error("absolute path not allowed: {0}")]
    AbsolutePath(String),

    /// Parent-directory segments would allow escaping the artifact store
    #[error("path traversal not allowed: {0}")]
    ParentSegment(String),

    /// Joined-and-cleaned path would land outside the workspace root
    #[error("path escapes workspace: {0}")]
    EscapesWorkspace(String),

    /// Logical input not found under any searched root
    #[error("input not found: {logical} (searched {searched:?})")]
    InputNotFound {
        logical: String,
        searched: Vec<PathBuf>,
    },

    /// Configuration document failed to parse
    #[error("invalid config {path}: {source}")]
    InvalidConfig {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl WorkspaceError {
    /// Attach a path to a raw io error
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
