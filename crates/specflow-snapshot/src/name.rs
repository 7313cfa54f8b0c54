//! Snapshot name validation
//!
//! Names become directory names under the namespace root, so the pattern
//! is restrictive: start alphanumeric, then alphanumeric/dot/hyphen/
//! underscore, bounded length, never a `..` sequence.

use crate::error::SnapshotError;
use once_cell::sync::Lazy;
use regex::Regex;

const MAX_NAME_LEN: usize = 128;

static VALID_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]*$").unwrap());

/// Validate a snapshot name
///
/// # Errors
/// Returns [`SnapshotError::InvalidName`] with the reason.
pub fn validate_name(name: &str) -> Result<(), SnapshotError> {
    let fail = |reason: &str| SnapshotError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(fail("name is required"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(fail("name too long (max 128 characters)"));
    }
    if name.contains("..") {
        return Err(fail("contains path traversal"));
    }
    if !VALID_NAME.is_match(name) {
        return Err(fail(
            "must start alphanumeric and contain only alphanumerics, dots, hyphens, underscores",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_versions() {
        for name in ["v1", "v1.2.3", "release-2026_08", "0patch"] {
            assert!(validate_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_unsafe_names() {
        for name in ["", "..", "a..b", "../escape", ".hidden", "-dash", "has space", "a/b"] {
            assert!(validate_name(name).is_err(), "{name} should be invalid");
        }
    }

    #[test]
    fn rejects_overlong_names() {
        let name = "a".repeat(129);
        assert!(validate_name(&name).is_err());
        let name = "a".repeat(128);
        assert!(validate_name(&name).is_ok());
    }
}
