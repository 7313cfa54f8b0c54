//! Workspace configuration document
//!
//! A single YAML file under the marker directory. An absent file means
//! all-defaults, not an error; the engine back-fills the project name and
//! active protocol when they are empty.

use crate::error::WorkspaceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project_name: String,
    /// Active protocol: bare name or explicit path override
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub custom_vars: BTreeMap<String, String>,
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,
}

impl Config {
    /// Load the configuration document; absent file yields defaults
    ///
    /// # Errors
    /// Fails on unreadable files and YAML parse errors (never retried,
    /// surfaced verbatim).
    pub fn load(path: &Path) -> Result<Self, WorkspaceError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(WorkspaceError::io(path, e)),
        };
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text).map_err(|source| WorkspaceError::InvalidConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the configuration document as YAML
    ///
    /// # Errors
    /// Fails when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), WorkspaceError> {
        if let Some(parent) = path.parent() {
            crate::fsutil::ensure_dir(parent)?;
        }
        let text = serde_yaml::to_string(self).map_err(|source| WorkspaceError::InvalidConfig {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(|e| WorkspaceError::io(path, e))
    }
}
