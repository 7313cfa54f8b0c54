//! Atomic state persistence
//!
//! Save serializes to a named temp file in the destination directory,
//! flushes it to stable storage, then renames it over the destination. On
//! POSIX the rename is atomic; on platforms where rename-over-existing
//! fails, the destination is removed and the rename retried with bounded
//! backoff. That retry reopens a small window where the file is absent; an
//! accepted, documented risk, not eliminated.

use crate::model::WorkflowState;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Attempts after the first failed rename-over-existing
const RENAME_RETRIES: u32 = 3;
const RENAME_BACKOFF: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("cannot read state {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed state {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cannot serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("cannot write state {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl WorkflowState {
    /// Load state from disk; absent or empty file yields a fresh default
    ///
    /// # Errors
    /// Fails on unreadable files and malformed JSON.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(StateError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if data.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_slice(&data).map_err(|source| StateError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Persist state atomically
    ///
    /// Any failure before the final rename leaves the original file
    /// untouched; the temp file is cleaned up on every error path (the
    /// [`tempfile::NamedTempFile`] guard removes it on drop).
    ///
    /// # Errors
    /// Fails on serialization and io errors; only the
    /// rename-over-existing failure mode is retried.
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let mut data = serde_json::to_vec_pretty(self)?;
        data.push(b'\n');

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|source| StateError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

        let tmp = tempfile::Builder::new()
            .prefix(".state.")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|source| StateError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        fs::write(tmp.path(), &data).map_err(|source| StateError::Write {
            path: tmp.path().to_path_buf(),
            source,
        })?;
        tmp.as_file().sync_all().map_err(|source| StateError::Write {
            path: tmp.path().to_path_buf(),
            source,
        })?;

        let mut pending = tmp;
        let mut attempt = 0;
        loop {
            match pending.persist(path) {
                Ok(_) => {
                    tracing::debug!(path = %path.display(), "state saved");
                    return Ok(());
                }
                Err(persist_err)
                    if attempt < RENAME_RETRIES && rename_blocked_by_existing(&persist_err, path) =>
                {
                    attempt += 1;
                    tracing::warn!(
                        path = %path.display(),
                        attempt,
                        "rename over existing state failed, removing destination and retrying"
                    );
                    let _ = fs::remove_file(path);
                    std::thread::sleep(RENAME_BACKOFF);
                    pending = persist_err.file;
                }
                Err(persist_err) => {
                    return Err(StateError::Write {
                        path: path.to_path_buf(),
                        source: persist_err.error,
                    });
                }
            }
        }
    }
}

/// Whether a failed persist is the rename-over-existing-file mode that
/// warrants removing the destination and retrying. Any other rename
/// failure is fatal immediately and must leave the destination alone.
fn rename_blocked_by_existing(err: &tempfile::PersistError, path: &Path) -> bool {
    use std::io::ErrorKind;
    path.is_file()
        && matches!(
            err.error.kind(),
            ErrorKind::AlreadyExists | ErrorKind::PermissionDenied
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn absent_file_loads_default() {
        let tmp = tempfile::tempdir().unwrap();
        let state = WorkflowState::load(&tmp.path().join("state.json")).unwrap();
        assert!(state.completed_stages.is_empty());
        assert!(state.stage_outputs.is_empty());
    }

    #[test]
    fn empty_file_loads_default() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        fs::write(&path, "").unwrap();
        let state = WorkflowState::load(&path).unwrap();
        assert!(state.approvals.is_empty());
    }

    #[test]
    fn malformed_file_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            WorkflowState::load(&path),
            Err(StateError::Parse { .. })
        ));
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");

        let mut state = WorkflowState::new("default");
        state.record_completion("design", vec!["design/api.md".into()], "hash".into());
        state.record_approval("design", "lead", "ana", "ok");
        state.save(&path).unwrap();

        let loaded = WorkflowState::load(&path).unwrap();
        assert_eq!(loaded.completed_stages, state.completed_stages);
        assert_eq!(loaded.stage_outputs, state.stage_outputs);
        assert_eq!(loaded.approvals, state.approvals);
    }

    #[test]
    fn save_overwrites_existing_atomically() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");

        WorkflowState::new("first").save(&path).unwrap();
        WorkflowState::new("second").save(&path).unwrap();

        let loaded = WorkflowState::load(&path).unwrap();
        assert_eq!(loaded.protocol, "second");
        // No stray temp files left behind.
        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn rename_failure_for_other_reasons_is_fatal_and_preserves_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        // A directory at the destination makes the rename fail for a
        // reason that is not rename-over-existing-file.
        fs::create_dir(&path).unwrap();
        fs::write(path.join("sentinel"), "keep").unwrap();

        let err = WorkflowState::new("default").save(&path).unwrap_err();
        assert!(matches!(err, StateError::Write { .. }));
        assert_eq!(fs::read_to_string(path.join("sentinel")).unwrap(), "keep");
    }

    #[test]
    fn partial_collections_backfill_on_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        fs::write(&path, r#"{"protocol": "default"}"#).unwrap();

        let state = WorkflowState::load(&path).unwrap();
        assert!(state.completed_stages.is_empty());
        assert!(state.stage_outputs.is_empty());
        assert!(state.approvals.is_empty());
        assert!(state.journal.assumptions.is_empty());
    }
}
