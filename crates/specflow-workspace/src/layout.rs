//! On-disk workspace layout
//!
//! All paths inside a workspace derive from a single root. The layout is an
//! explicit value handed to each component rather than ambient process
//! state, so two workspaces can coexist in one process (tests rely on this).

use crate::error::WorkspaceError;
use std::path::{Path, PathBuf};

/// Directory marking a workspace root
pub const MARKER_DIR: &str = ".specflow";

/// One of the six swappable workspace components
///
/// Snapshot restore treats each as an atomic swap unit, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Artifacts,
    Generated,
    Protocols,
    Templates,
    Config,
    State,
}

impl Component {
    /// All components in swap order
    pub const ALL: [Component; 6] = [
        Component::Artifacts,
        Component::Generated,
        Component::Protocols,
        Component::Templates,
        Component::Config,
        Component::State,
    ];

    /// File or directory name used both live and inside snapshots
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Component::Artifacts => "artifacts",
            Component::Generated => "generated",
            Component::Protocols => "protocols",
            Component::Templates => "templates",
            Component::Config => "config.yaml",
            Component::State => "state.json",
        }
    }

    /// Whether the component is a directory subtree (vs a single file)
    #[must_use]
    pub fn is_dir(self) -> bool {
        !matches!(self, Component::Config | Component::State)
    }
}

/// Resolved locations of everything inside one workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    root: PathBuf,
}

impl WorkspaceLayout {
    /// Layout rooted at an explicit project directory
    #[must_use]
    pub fn at_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Discover the workspace root by walking upward from `start`
    ///
    /// A directory containing `.specflow` wins; a `.git` directory is
    /// accepted as a fallback so `init` can run inside a fresh clone.
    ///
    /// # Errors
    /// Returns [`WorkspaceError::RootNotFound`] when no marker is found.
    pub fn discover(start: &Path) -> Result<Self, WorkspaceError> {
        let mut dir = start.to_path_buf();
        loop {
            if dir.join(MARKER_DIR).is_dir() || dir.join(".git").is_dir() {
                return Ok(Self { root: dir });
            }
            if !dir.pop() {
                return Err(WorkspaceError::RootNotFound {
                    start: start.to_path_buf(),
                });
            }
        }
    }

    /// Project root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.specflow` directory holding all engine data
    #[must_use]
    pub fn spec_dir(&self) -> PathBuf {
        self.root.join(MARKER_DIR)
    }

    /// Artifact store root
    #[must_use]
    pub fn artifacts_dir(&self) -> PathBuf {
        self.spec_dir().join("artifacts")
    }

    /// Generated-output store root
    #[must_use]
    pub fn generated_dir(&self) -> PathBuf {
        self.spec_dir().join("generated")
    }

    /// Protocol definitions directory
    #[must_use]
    pub fn protocols_dir(&self) -> PathBuf {
        self.spec_dir().join("protocols")
    }

    /// Prompt templates directory
    #[must_use]
    pub fn templates_dir(&self) -> PathBuf {
        self.spec_dir().join("templates")
    }

    /// Permanent snapshot namespace
    #[must_use]
    pub fn archives_dir(&self) -> PathBuf {
        self.spec_dir().join("archives")
    }

    /// Disposable parallel-branch snapshot namespace
    #[must_use]
    pub fn tracks_dir(&self) -> PathBuf {
        self.spec_dir().join("tracks")
    }

    /// Workspace configuration document
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.spec_dir().join("config.yaml")
    }

    /// Serialized workflow state
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.spec_dir().join("state.json")
    }

    /// Live location of a swappable component
    #[must_use]
    pub fn component_path(&self, component: Component) -> PathBuf {
        self.spec_dir().join(component.file_name())
    }

    /// Path of a protocol definition by bare name
    #[must_use]
    pub fn protocol_path(&self, name: &str) -> PathBuf {
        self.protocols_dir().join(format!("{name}.yaml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_root_by_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("proj");
        fs::create_dir_all(root.join(MARKER_DIR)).unwrap();
        let deep = root.join("sub/deep");
        fs::create_dir_all(&deep).unwrap();

        let layout = WorkspaceLayout::discover(&deep).unwrap();
        assert_eq!(layout.root(), root.as_path());
    }

    #[test]
    fn discovers_root_by_git_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("repo");
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("child")).unwrap();

        let layout = WorkspaceLayout::discover(&root.join("child")).unwrap();
        assert_eq!(layout.root(), root.as_path());
    }

    #[test]
    fn discovery_fails_without_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let bare = tmp.path().join("bare");
        fs::create_dir_all(&bare).unwrap();
        // The tempdir ancestors may contain a .git on developer machines,
        // so only assert when discovery walked past our fixture.
        if let Ok(layout) = WorkspaceLayout::discover(&bare) {
            assert_ne!(layout.root(), bare.as_path());
        }
    }

    #[test]
    fn component_paths_mirror_snapshot_names() {
        let layout = WorkspaceLayout::at_root("/ws");
        assert_eq!(
            layout.component_path(Component::Artifacts),
            layout.artifacts_dir()
        );
        assert_eq!(layout.component_path(Component::Config), layout.config_path());
        assert_eq!(layout.component_path(Component::State), layout.state_path());
    }
}
