use std::path::PathBuf;

/// Errors raised while loading and validating protocols
///
/// All of these are fatal for the invocation; none are retried.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("cannot read protocol {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed protocol {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// A `uses` entry did not resolve to an existing file
    #[error("unresolved protocol import {entry:?} (looked for {path})")]
    ImportNotFound { entry: String, path: PathBuf },

    /// The entered source is already on the active resolution stack
    #[error("circular protocol import detected: {path}")]
    CircularImport { path: PathBuf },

    /// A stage id survived the merge more than once
    #[error("duplicate stage id after merge: {id}")]
    DuplicateStage { id: String },

    /// A `depends_on` entry names a stage absent from the final list
    #[error("stage {stage} depends on unknown stage {dependency}")]
    DanglingDependency { stage: String, dependency: String },

    /// An approval declaration references a stage absent from the final list
    #[error("approval for role {role} references unknown stage {stage}")]
    DanglingApproval { stage: String, role: String },
}
