//! Filesystem utilities shared by the snapshot and engine layers

use crate::error::WorkspaceError;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Create a directory and all parents
///
/// # Errors
/// Propagates the underlying io error.
pub fn ensure_dir(path: &Path) -> Result<(), WorkspaceError> {
    fs::create_dir_all(path).map_err(|e| WorkspaceError::io(path, e))
}

/// Copy a single file, creating the destination's parent directories
///
/// # Errors
/// Fails when the source is unreadable or the destination unwritable.
pub fn copy_file(src: &Path, dst: &Path) -> Result<(), WorkspaceError> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(src, dst).map_err(|e| WorkspaceError::io(src, e))?;
    Ok(())
}

/// Recursively copy a directory tree
///
/// With `tolerate_missing`, an absent source produces an empty destination
/// directory instead of an error; snapshots use this so a workspace that
/// never generated output still round-trips.
///
/// # Errors
/// Propagates io errors from traversal and copying.
pub fn copy_dir(src: &Path, dst: &Path, tolerate_missing: bool) -> Result<(), WorkspaceError> {
    if !src.exists() {
        if tolerate_missing {
            return ensure_dir(dst);
        }
        return Err(WorkspaceError::io(
            src,
            std::io::Error::new(std::io::ErrorKind::NotFound, "source directory missing"),
        ));
    }
    ensure_dir(dst)?;
    for entry in fs::read_dir(src).map_err(|e| WorkspaceError::io(src, e))? {
        let entry = entry.map_err(|e| WorkspaceError::io(src, e))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| WorkspaceError::io(&from, e))?;
        if file_type.is_dir() {
            copy_dir(&from, &to, tolerate_missing)?;
        } else {
            copy_file(&from, &to)?;
        }
    }
    Ok(())
}

/// SHA-256 of a file's contents, hex encoded
///
/// # Errors
/// Fails when the file cannot be read.
pub fn hash_file(path: &Path) -> Result<String, WorkspaceError> {
    let mut file = fs::File::open(path).map_err(|e| WorkspaceError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).map_err(|e| WorkspaceError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Content hash of every file under `root`, keyed by `/`-normalized path
/// relative to `root`
///
/// An absent root yields an empty map. BTreeMap keeps the keys sorted so
/// comparisons are deterministic.
///
/// # Errors
/// Propagates traversal and read errors.
pub fn collect_file_hashes(root: &Path) -> Result<BTreeMap<String, String>, WorkspaceError> {
    let mut hashes = BTreeMap::new();
    if !root.exists() {
        return Ok(hashes);
    }
    collect_into(root, root, &mut hashes)?;
    Ok(hashes)
}

fn collect_into(
    root: &Path,
    dir: &Path,
    hashes: &mut BTreeMap<String, String>,
) -> Result<(), WorkspaceError> {
    for entry in fs::read_dir(dir).map_err(|e| WorkspaceError::io(dir, e))? {
        let entry = entry.map_err(|e| WorkspaceError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| WorkspaceError::io(&path, e))?;
        if file_type.is_dir() {
            collect_into(root, &path, hashes)?;
        } else {
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            hashes.insert(rel, hash_file(&path)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn copy_dir_preserves_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();
        fs::write(src.join("nested/b.txt"), "b").unwrap();

        let dst = tmp.path().join("dst");
        copy_dir(&src, &dst, false).unwrap();

        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dst.join("nested/b.txt")).unwrap(), "b");
    }

    #[test]
    fn copy_dir_tolerates_missing_source() {
        let tmp = tempfile::tempdir().unwrap();
        let dst = tmp.path().join("dst");
        copy_dir(&tmp.path().join("absent"), &dst, true).unwrap();
        assert!(dst.is_dir());
        assert!(copy_dir(&tmp.path().join("absent2"), &dst, false).is_err());
    }

    #[test]
    fn file_hashes_are_relative_and_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("tree");
        fs::create_dir_all(root.join("z")).unwrap();
        fs::write(root.join("z/late.txt"), "z").unwrap();
        fs::write(root.join("early.txt"), "a").unwrap();

        let hashes = collect_file_hashes(&root).unwrap();
        let keys: Vec<_> = hashes.keys().cloned().collect();
        assert_eq!(keys, vec!["early.txt".to_string(), "z/late.txt".to_string()]);
    }

    #[test]
    fn identical_content_hashes_equal() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        fs::write(&a, "same").unwrap();
        fs::write(&b, "same").unwrap();
        assert_eq!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
    }
}
