//! Snapshot manager: create, list, metadata
//!
//! One manager is bound to a namespace root (archives or tracks) and the
//! layout of the live workspace it captures. Creation is atomic: the
//! snapshot is assembled in a `<name>.tmp` sibling and becomes visible
//! through a single rename, so a concurrent reader sees either nothing or
//! the complete snapshot.

use crate::error::SnapshotError;
use crate::name::validate_name;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use specflow_protocol::{Protocol, ProtocolSource, DEFAULT_PROTOCOL_NAME};
use specflow_state::WorkflowState;
use specflow_workspace::{
    artifact_abs_from_state, copy_dir, copy_file, ensure_dir, Config, WorkspaceLayout,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata document written into every snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub name: String,
    pub protocol: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stages_completed: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// Handles snapshot operations for one namespace (archives or tracks)
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    root: PathBuf,
    layout: WorkspaceLayout,
}

/// Removes a staging directory on every exit path unless disarmed
pub(crate) struct StagingGuard {
    path: PathBuf,
    armed: bool,
}

impl StagingGuard {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}

impl SnapshotManager {
    /// Manager over a namespace root, e.g. the archives or tracks directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, layout: WorkspaceLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    /// Namespace root this manager operates on
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    pub(crate) fn snapshot_root(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Enumerate snapshot names, sorted; an absent root is empty
    ///
    /// # Errors
    /// Propagates directory read errors.
    pub fn list(&self) -> Result<Vec<String>, SnapshotError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SnapshotError::io(&self.root, e)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SnapshotError::io(&self.root, e))?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Read a snapshot's metadata document
    ///
    /// # Errors
    /// Fails when the snapshot or its metadata is missing or malformed.
    pub fn metadata(&self, name: &str) -> Result<SnapshotMetadata, SnapshotError> {
        validate_name(name)?;
        let path = self.snapshot_root(name).join("metadata.json");
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SnapshotError::NotFound(name.to_string()))
            }
            Err(e) => return Err(SnapshotError::io(&path, e)),
        };
        serde_json::from_slice(&data).map_err(|source| SnapshotError::Metadata { path, source })
    }

    /// Create a snapshot of the current workspace
    ///
    /// Fails fast when any artifact referenced by state is missing on disk
    /// (a snapshot must be reproducible-complete) and when a snapshot of
    /// this name already exists. Any failure before the final rename
    /// removes the temporary directory; no partial snapshot ever becomes
    /// visible.
    ///
    /// # Errors
    /// Name validation, completeness, already-exists, and io failures.
    pub fn create(&self, name: &str, tags: Vec<String>, notes: &str) -> Result<(), SnapshotError> {
        validate_name(name)?;

        let config = Config::load(&self.layout.config_path())?;
        let protocol_name = if config.protocol.is_empty() {
            DEFAULT_PROTOCOL_NAME.to_string()
        } else {
            config.protocol.clone()
        };
        let protocol_path =
            ProtocolSource::classify(&protocol_name).resolve(&self.layout.protocols_dir());
        let protocol = Protocol::load(&protocol_path)?;
        let state = WorkflowState::load(&self.layout.state_path())?;

        for (stage_id, output) in &state.stage_outputs {
            for artifact in &output.files {
                let abs = artifact_abs_from_state(&self.layout, artifact)?;
                if !abs.exists() {
                    return Err(SnapshotError::MissingArtifact {
                        stage: stage_id.clone(),
                        path: artifact.clone(),
                    });
                }
            }
        }

        let final_root = self.snapshot_root(name);
        let tmp_root = self.root.join(format!("{name}.tmp"));

        ensure_dir(&self.root)?;
        let _ = fs::remove_dir_all(&tmp_root);
        if final_root.exists() {
            return Err(SnapshotError::AlreadyExists(name.to_string()));
        }
        fs::create_dir(&tmp_root).map_err(|e| SnapshotError::io(&tmp_root, e))?;
        let mut guard = StagingGuard::new(tmp_root.clone());

        copy_dir(&self.layout.artifacts_dir(), &tmp_root.join("artifacts"), true)?;
        copy_dir(&self.layout.generated_dir(), &tmp_root.join("generated"), true)?;
        copy_dir(&self.layout.protocols_dir(), &tmp_root.join("protocols"), false)?;
        copy_dir(&self.layout.templates_dir(), &tmp_root.join("templates"), false)?;
        copy_file(&self.layout.config_path(), &tmp_root.join("config.yaml"))?;
        copy_file(&self.layout.state_path(), &tmp_root.join("state.json"))?;

        let metadata = SnapshotMetadata {
            name: name.to_string(),
            protocol: protocol.name,
            created_at: Some(Utc::now()),
            stages_completed: state.completed_stages.clone(),
            tags,
            notes: notes.to_string(),
        };
        let mut data = serde_json::to_vec_pretty(&metadata).map_err(|source| {
            SnapshotError::Metadata {
                path: tmp_root.join("metadata.json"),
                source,
            }
        })?;
        data.push(b'\n');
        fs::write(tmp_root.join("metadata.json"), data)
            .map_err(|e| SnapshotError::io(tmp_root.join("metadata.json"), e))?;

        fs::rename(&tmp_root, &final_root).map_err(|e| SnapshotError::io(&final_root, e))?;
        guard.disarm();
        tracing::info!(snapshot = name, root = %self.root.display(), "snapshot created");
        Ok(())
    }
}
