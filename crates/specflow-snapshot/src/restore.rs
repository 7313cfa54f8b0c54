//! Transactional snapshot restore
//!
//! The filesystem has no multi-file transaction primitive, so restore
//! builds one out of renames: validate the snapshot, stage the whole
//! restored tree beside the live workspace, then swap the six components
//! one by one, each behind a `.old` backup. A failure mid-swap unwinds
//! every completed swap in reverse order, leaving the workspace exactly as
//! it was. Restore never writes into the snapshot itself.

use crate::error::SnapshotError;
use crate::manager::{SnapshotManager, SnapshotMetadata, StagingGuard};
use crate::name::validate_name;
use specflow_protocol::{Protocol, ProtocolSource};
use specflow_workspace::{copy_dir, copy_file, ensure_dir, Component, Config};
use std::fs;
use std::path::{Path, PathBuf};

/// One component's swap: staged replacement and live destination
#[derive(Debug)]
pub(crate) struct SwapUnit {
    pub(crate) staged: PathBuf,
    pub(crate) live: PathBuf,
}

/// A completed swap step, remembered for rollback
struct SwapRecord {
    live: PathBuf,
    backup: Option<PathBuf>,
}

impl SnapshotManager {
    /// Restore a snapshot over the live workspace
    ///
    /// Integrity checks run before any live mutation, so a corrupt or
    /// incomplete snapshot is rejected with zero side effects. Without
    /// `force`, a workspace that already has data is refused.
    ///
    /// # Errors
    /// Not-found, integrity, force-required, and io failures; a mid-swap
    /// failure is returned after rollback completes.
    pub fn restore(&self, name: &str, force: bool) -> Result<(), SnapshotError> {
        validate_name(name)?;
        let snapshot_root = self.snapshot_root(name);
        match fs::metadata(&snapshot_root) {
            Ok(info) if !info.is_dir() => {
                return Err(SnapshotError::NotADirectory(name.to_string()))
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SnapshotError::NotFound(name.to_string()))
            }
            Err(e) => return Err(SnapshotError::io(&snapshot_root, e)),
        }

        let layout = self.layout().clone();
        if !force {
            let has_data = Component::ALL
                .iter()
                .any(|c| layout.component_path(*c).exists());
            if has_data {
                return Err(SnapshotError::RequiresForce);
            }
        }

        let metadata = self.validate_structure(name, &snapshot_root)?;

        // Stage the entire restored tree before touching the live side.
        let staging = layout.root().join(".specflow_restore.tmp");
        let _ = fs::remove_dir_all(&staging);
        ensure_dir(&staging)?;
        let guard = StagingGuard::new(staging.clone());

        copy_dir(&snapshot_root.join("artifacts"), &staging.join("artifacts"), true)?;
        copy_dir(&snapshot_root.join("generated"), &staging.join("generated"), true)?;
        copy_dir(&snapshot_root.join("protocols"), &staging.join("protocols"), false)?;
        copy_dir(&snapshot_root.join("templates"), &staging.join("templates"), false)?;
        copy_file(&snapshot_root.join("config.yaml"), &staging.join("config.yaml"))?;
        copy_file(&snapshot_root.join("state.json"), &staging.join("state.json"))?;

        let plan: Vec<SwapUnit> = Component::ALL
            .iter()
            .map(|c| SwapUnit {
                staged: staging.join(c.file_name()),
                live: layout.component_path(*c),
            })
            .collect();
        swap_components(&plan)?;

        drop(guard);
        tracing::info!(
            snapshot = name,
            protocol = %metadata.protocol,
            "workspace restored"
        );
        Ok(())
    }

    /// Structural completeness checks over the snapshot contents
    ///
    /// Required subtrees and files must exist, the archived config must
    /// name a protocol resolvable inside the snapshot, and that protocol's
    /// name must match what the metadata recorded.
    fn validate_structure(
        &self,
        name: &str,
        snapshot_root: &Path,
    ) -> Result<SnapshotMetadata, SnapshotError> {
        let incomplete = |detail: String| SnapshotError::Incomplete {
            name: name.to_string(),
            detail,
        };

        for required in ["protocols", "templates"] {
            if !snapshot_root.join(required).is_dir() {
                return Err(incomplete(format!("missing {required} directory")));
            }
        }
        for required in ["config.yaml", "state.json"] {
            if !snapshot_root.join(required).is_file() {
                return Err(incomplete(format!("missing {required}")));
            }
        }

        let metadata = self.metadata(name)?;

        let archived_config = Config::load(&snapshot_root.join("config.yaml"))?;
        if archived_config.protocol.trim().is_empty() {
            return Err(incomplete("config missing protocol".to_string()));
        }

        let protocol_path = ProtocolSource::classify(&archived_config.protocol)
            .resolve(&snapshot_root.join("protocols"));
        if !protocol_path.is_file() {
            return Err(incomplete(format!(
                "missing protocol file {}",
                protocol_path
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default()
            )));
        }
        let archived_protocol = Protocol::load(&protocol_path)?;
        if !metadata.protocol.is_empty() && archived_protocol.name != metadata.protocol {
            return Err(SnapshotError::ProtocolMismatch {
                metadata: metadata.protocol.clone(),
                actual: archived_protocol.name,
            });
        }
        Ok(metadata)
    }
}

/// Swap each staged component into its live location
///
/// Existing live components are renamed to `.old` backups first. On any
/// failure, every completed swap is unwound in reverse order (remove the
/// partial new copy, rename the backup back); on success all backups are
/// discarded. The workspace ends fully swapped or fully untouched.
pub(crate) fn swap_components(plan: &[SwapUnit]) -> Result<(), SnapshotError> {
    let mut done: Vec<SwapRecord> = Vec::with_capacity(plan.len());

    for unit in plan {
        let mut backup = None;
        if unit.live.exists() {
            let old = backup_path(&unit.live);
            let _ = fs::remove_dir_all(&old);
            let _ = fs::remove_file(&old);
            if let Err(e) = fs::rename(&unit.live, &old) {
                rollback(&done);
                return Err(SnapshotError::io(&unit.live, e));
            }
            backup = Some(old);
        }

        if let Err(e) = fs::rename(&unit.staged, &unit.live) {
            // Undo this component's backup before unwinding the rest.
            if let Some(old) = &backup {
                let _ = fs::rename(old, &unit.live);
            }
            rollback(&done);
            return Err(SnapshotError::io(&unit.staged, e));
        }
        done.push(SwapRecord {
            live: unit.live.clone(),
            backup,
        });
    }

    for record in &done {
        if let Some(old) = &record.backup {
            let _ = fs::remove_dir_all(old);
            let _ = fs::remove_file(old);
        }
    }
    Ok(())
}

fn backup_path(live: &Path) -> PathBuf {
    let mut os = live.as_os_str().to_os_string();
    os.push(".old");
    PathBuf::from(os)
}

fn rollback(done: &[SwapRecord]) {
    for record in done.iter().rev() {
        let _ = fs::remove_dir_all(&record.live);
        let _ = fs::remove_file(&record.live);
        if let Some(old) = &record.backup {
            let _ = fs::rename(old, &record.live);
        }
    }
}
