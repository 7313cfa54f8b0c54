//! Safe artifact path resolution
//!
//! The security boundary between stage declarations (untrusted text from
//! protocol documents and state files) and the filesystem. Every path is
//! normalized and checked before it touches the artifact store; a crafted
//! input cannot read or write outside the workspace.

use crate::error::WorkspaceError;
use crate::layout::WorkspaceLayout;
use std::path::{Component as PathComponent, Path, PathBuf};

/// Normalize separators so the traversal check cannot be bypassed by
/// substituting `\` for `/` on a different platform.
fn normalize(logical: &str) -> String {
    logical.replace('\\', "/")
}

/// Reject absolute paths and any parent-directory segment.
fn check_safe(logical: &str) -> Result<(), WorkspaceError> {
    let normalized = normalize(logical);
    let path = Path::new(&normalized);
    if path.is_absolute() || normalized.starts_with('/') {
        return Err(WorkspaceError::AbsolutePath(logical.to_string()));
    }
    for component in path.components() {
        match component {
            PathComponent::ParentDir => {
                return Err(WorkspaceError::ParentSegment(logical.to_string()))
            }
            PathComponent::Prefix(_) | PathComponent::RootDir => {
                return Err(WorkspaceError::AbsolutePath(logical.to_string()))
            }
            _ => {}
        }
    }
    Ok(())
}

/// Join a checked logical path under a root, then verify the cleaned result
/// still lives under that root.
fn safe_join(root: &Path, logical: &str) -> Result<PathBuf, WorkspaceError> {
    check_safe(logical)?;
    let joined = root.join(normalize(logical));
    let mut cleaned = PathBuf::new();
    for component in joined.components() {
        match component {
            PathComponent::CurDir => {}
            PathComponent::ParentDir => {
                if !cleaned.pop() {
                    return Err(WorkspaceError::EscapesWorkspace(logical.to_string()));
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    if !cleaned.starts_with(root) {
        return Err(WorkspaceError::EscapesWorkspace(logical.to_string()));
    }
    Ok(cleaned)
}

/// Resolve a stage's logical input path to an existing file on disk
///
/// Search order: the artifact root of each declared dependency, in
/// declaration order, then the flat artifact root as a fallback. The first
/// existing file wins.
///
/// `all_stage_ids` lets an input address another stage's subtree directly
/// (`design/notes.md`) without declaring it twice; such paths resolve via
/// the flat fallback and are subject to the same traversal checks.
///
/// # Errors
/// Fails on unsafe paths and when no searched location exists; the error
/// lists every location tried.
pub fn resolve_input(
    layout: &WorkspaceLayout,
    logical: &str,
    depends_on: &[String],
    all_stage_ids: &[String],
) -> Result<PathBuf, WorkspaceError> {
    check_safe(logical)?;
    let artifacts = layout.artifacts_dir();

    let mut searched = Vec::new();
    for dep in depends_on {
        // Dependency ids come from the validated protocol, but the id list
        // passed here may be caller-assembled; skip unknown ids.
        if !all_stage_ids.is_empty() && !all_stage_ids.iter().any(|id| id == dep) {
            continue;
        }
        let candidate = safe_join(&artifacts, &format!("{dep}/{}", normalize(logical)))?;
        if candidate.is_file() {
            tracing::debug!(input = logical, dep = %dep, "resolved input via dependency root");
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    let flat = safe_join(&artifacts, logical)?;
    if flat.is_file() {
        return Ok(flat);
    }
    searched.push(flat);

    Err(WorkspaceError::InputNotFound {
        logical: logical.to_string(),
        searched,
    })
}

/// Validate a declared output path and return it relative to the artifact
/// store (`/`-separated)
///
/// # Errors
/// Fails on absolute paths, parent segments, or escapes.
pub fn resolve_output_relative(logical: &str) -> Result<String, WorkspaceError> {
    check_safe(logical)?;
    Ok(normalize(logical))
}

/// Absolute location of an artifact path recorded in workflow state
///
/// State files survive snapshot restores and manual edits, so stored paths
/// get the same treatment as protocol-declared ones.
///
/// # Errors
/// Fails on unsafe stored paths.
pub fn artifact_abs_from_state(
    layout: &WorkspaceLayout,
    stored: &str,
) -> Result<PathBuf, WorkspaceError> {
    safe_join(&layout.artifacts_dir(), stored)
}

/// Store-relative form of an artifact path recorded in workflow state
///
/// # Errors
/// Fails on unsafe stored paths.
pub fn artifact_rel_from_state(stored: &str) -> Result<String, WorkspaceError> {
    check_safe(stored)?;
    Ok(normalize(stored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> (tempfile::TempDir, WorkspaceLayout) {
        let tmp = tempfile::tempdir().unwrap();
        let layout = WorkspaceLayout::at_root(tmp.path());
        fs::create_dir_all(layout.artifacts_dir().join("design")).unwrap();
        fs::write(layout.artifacts_dir().join("design/notes.md"), "notes").unwrap();
        (tmp, layout)
    }

    #[test]
    fn rejects_parent_segments() {
        let (_tmp, layout) = fixture();
        let err = resolve_input(&layout, "../secrets.txt", &[], &[]).unwrap_err();
        assert!(matches!(err, WorkspaceError::ParentSegment(_)));
    }

    #[test]
    fn rejects_absolute_paths() {
        let (_tmp, layout) = fixture();
        let err = resolve_input(&layout, "/etc/passwd", &[], &[]).unwrap_err();
        assert!(matches!(err, WorkspaceError::AbsolutePath(_)));
    }

    #[test]
    fn rejects_backslash_traversal() {
        let (_tmp, layout) = fixture();
        let err = resolve_input(&layout, "..\\secrets.txt", &[], &[]).unwrap_err();
        assert!(matches!(err, WorkspaceError::ParentSegment(_)));
    }

    #[test]
    fn resolves_via_dependency_root() {
        let (_tmp, layout) = fixture();
        let deps = vec!["design".to_string()];
        let ids = vec!["design".to_string(), "impl".to_string()];
        let path = resolve_input(&layout, "notes.md", &deps, &ids).unwrap();
        assert_eq!(path, layout.artifacts_dir().join("design/notes.md"));
    }

    #[test]
    fn resolves_via_flat_fallback() {
        let (_tmp, layout) = fixture();
        let ids = vec!["design".to_string()];
        let path = resolve_input(&layout, "design/notes.md", &[], &ids).unwrap();
        assert_eq!(path, layout.artifacts_dir().join("design/notes.md"));
    }

    #[test]
    fn missing_input_lists_searched_locations() {
        let (_tmp, layout) = fixture();
        let deps = vec!["design".to_string()];
        let err = resolve_input(&layout, "absent.md", &deps, &deps).unwrap_err();
        match err {
            WorkspaceError::InputNotFound { searched, .. } => assert_eq!(searched.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn output_paths_are_normalized() {
        assert_eq!(
            resolve_output_relative("design\\api.md").unwrap(),
            "design/api.md"
        );
        assert!(resolve_output_relative("../out.md").is_err());
    }
}
