//! Tagged protocol source
//!
//! A protocol is referenced either by bare name (resolved against a
//! protocols directory with a fixed extension) or by explicit file path.
//! The decision is made once, at the boundary where the raw string enters
//! the system; loaders only ever see resolved paths.

use std::path::{Path, PathBuf};

/// How a protocol was referenced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolSource {
    /// Bare name, resolved as `<dir>/<name>.yaml`
    ByName(String),
    /// Explicit file path, used as-is (relative paths resolve against the
    /// referencing context)
    ByPath(PathBuf),
}

impl ProtocolSource {
    /// Classify a raw reference string
    ///
    /// Anything containing a path separator or a YAML extension is a path;
    /// everything else is a name. This is the single place the distinction
    /// is inferred from text.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        let looks_like_path = raw.contains('/')
            || raw.contains('\\')
            || raw.ends_with(".yaml")
            || raw.ends_with(".yml");
        if looks_like_path {
            Self::ByPath(PathBuf::from(raw))
        } else {
            Self::ByName(raw.to_string())
        }
    }

    /// Resolve to a concrete file path against a protocols directory
    #[must_use]
    pub fn resolve(&self, protocols_dir: &Path) -> PathBuf {
        match self {
            Self::ByName(name) => protocols_dir.join(format!("{name}.yaml")),
            Self::ByPath(path) => {
                if path.is_absolute() {
                    path.clone()
                } else {
                    protocols_dir.join(path)
                }
            }
        }
    }

    /// The raw reference for display
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::ByName(name) => name.clone(),
            Self::ByPath(path) => path.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_resolve_with_extension() {
        let source = ProtocolSource::classify("default");
        assert_eq!(source, ProtocolSource::ByName("default".into()));
        assert_eq!(
            source.resolve(Path::new("/ws/.specflow/protocols")),
            Path::new("/ws/.specflow/protocols/default.yaml")
        );
    }

    #[test]
    fn explicit_paths_pass_through() {
        let source = ProtocolSource::classify("/abs/custom.yaml");
        assert_eq!(
            source.resolve(Path::new("/ignored")),
            Path::new("/abs/custom.yaml")
        );
    }

    #[test]
    fn relative_paths_resolve_against_dir() {
        let source = ProtocolSource::classify("shared/base.yaml");
        assert_eq!(
            source.resolve(Path::new("/protos")),
            Path::new("/protos/shared/base.yaml")
        );
    }
}
