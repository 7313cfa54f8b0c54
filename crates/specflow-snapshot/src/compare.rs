//! Content-addressed snapshot comparison
//!
//! Hashes every file under each snapshot's artifact subtree, keyed by path
//! relative to that subtree, and classifies the differences. All result
//! lists come back sorted so output is deterministic.

use crate::error::SnapshotError;
use crate::manager::SnapshotManager;
use crate::name::validate_name;
use specflow_workspace::collect_file_hashes;

/// Differences between two snapshots' artifact stores
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Present only in the right snapshot
    pub added: Vec<String>,
    /// Present only in the left snapshot
    pub removed: Vec<String>,
    /// Present in both with differing content hashes
    pub changed: Vec<String>,
}

impl SnapshotDiff {
    /// Whether the two snapshots' artifacts are identical
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl SnapshotManager {
    /// Compare the artifact subtrees of two snapshots
    ///
    /// # Errors
    /// Fails when either snapshot does not exist or hashing fails.
    pub fn compare(&self, left: &str, right: &str) -> Result<SnapshotDiff, SnapshotError> {
        validate_name(left)?;
        validate_name(right)?;
        for name in [left, right] {
            if !self.snapshot_root(name).is_dir() {
                return Err(SnapshotError::NotFound(name.to_string()));
            }
        }

        let left_hashes = collect_file_hashes(&self.snapshot_root(left).join("artifacts"))?;
        let right_hashes = collect_file_hashes(&self.snapshot_root(right).join("artifacts"))?;

        let mut diff = SnapshotDiff::default();
        for (path, hash) in &right_hashes {
            match left_hashes.get(path) {
                Some(left_hash) if left_hash != hash => diff.changed.push(path.clone()),
                Some(_) => {}
                None => diff.added.push(path.clone()),
            }
        }
        for path in left_hashes.keys() {
            if !right_hashes.contains_key(path) {
                diff.removed.push(path.clone());
            }
        }

        // BTreeMap iteration is already ordered; sort anyway so the
        // contract does not depend on the map implementation.
        diff.added.sort();
        diff.removed.sort();
        diff.changed.sort();
        Ok(diff)
    }
}
