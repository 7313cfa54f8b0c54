//! Protocol loading, import resolution, and merge
//!
//! Resolution is depth-first over the ordered `uses` list. Each imported
//! protocol is fully resolved, then folded into an accumulator; the
//! importing protocol's own declarations fold in last. When a stage id is
//! already present in the accumulator the new definition replaces it in
//! place (position preserved, content replaced), which is how a later
//! import or the importing protocol overrides an earlier-imported stage.
//!
//! Cycle detection keeps a stack of the canonical source paths currently
//! being resolved. Re-entering a path on the active stack is a circular
//! import; re-entering a path that finished on a sibling branch (the
//! diamond shape `a uses {b, c}`, `b uses d`, `c uses d`) is allowed so
//! shared base protocols work. A diamond-shared stage id resolves by the
//! same replace-in-place rule, last import wins.

use crate::error::ProtocolError;
use crate::model::{ApprovalDecl, Protocol, Stage};
use crate::source::ProtocolSource;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

impl Protocol {
    /// Load and fully resolve a protocol definition from a file
    ///
    /// # Errors
    /// Fails on unreadable or malformed documents, unresolved or circular
    /// imports, and post-merge validation failures (dangling dependency,
    /// duplicate stage id, dangling approval).
    pub fn load(path: &Path) -> Result<Self, ProtocolError> {
        let mut stack = Vec::new();
        let proto = load_with_stack(path, &mut stack)?;
        validate(&proto)?;
        Ok(proto)
    }
}

fn canonical(path: &Path) -> Result<PathBuf, ProtocolError> {
    fs::canonicalize(path).map_err(|source| ProtocolError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn load_with_stack(path: &Path, stack: &mut Vec<PathBuf>) -> Result<Protocol, ProtocolError> {
    let id = canonical(path)?;
    if stack.contains(&id) {
        return Err(ProtocolError::CircularImport { path: id });
    }
    stack.push(id.clone());
    let result = resolve_imports(&id, stack);
    stack.pop();
    result
}

fn resolve_imports(path: &Path, stack: &mut Vec<PathBuf>) -> Result<Protocol, ProtocolError> {
    let text = fs::read_to_string(path).map_err(|source| ProtocolError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let local: Protocol =
        serde_yaml::from_str(&text).map_err(|source| ProtocolError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if local.uses.is_empty() {
        return Ok(local);
    }

    // Imports resolve against the directory of the importing document.
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut merged = Protocol {
        name: local.name.clone(),
        version: local.version.clone(),
        uses: local.uses.clone(),
        ..Protocol::default()
    };

    for entry in &local.uses {
        let target = ProtocolSource::classify(entry).resolve(base_dir);
        if !target.is_file() {
            return Err(ProtocolError::ImportNotFound {
                entry: entry.clone(),
                path: target,
            });
        }
        tracing::debug!(import = %entry, path = %target.display(), "resolving protocol import");
        let imported = load_with_stack(&target, stack)?;
        fold(&mut merged, imported);
    }

    // Local declarations apply last and override anything imported.
    fold(
        &mut merged,
        Protocol {
            stages: local.stages,
            approvals: local.approvals,
            lint: local.lint,
            ..Protocol::default()
        },
    );
    Ok(merged)
}

/// Fold one resolved protocol into the accumulator
fn fold(acc: &mut Protocol, incoming: Protocol) {
    for stage in incoming.stages {
        merge_stage(&mut acc.stages, stage);
    }
    for approval in incoming.approvals {
        merge_approval(&mut acc.approvals, approval);
    }
    if let Some(rules) = incoming.lint {
        match &mut acc.lint {
            Some(existing) => existing.merge(&rules),
            None => acc.lint = Some(rules),
        }
    }
}

/// Replace-in-place override: an existing id keeps its position but takes
/// the new definition; unseen ids append in order.
fn merge_stage(stages: &mut Vec<Stage>, incoming: Stage) {
    match stages.iter().position(|s| s.id == incoming.id) {
        Some(index) => stages[index] = incoming,
        None => stages.push(incoming),
    }
}

fn merge_approval(approvals: &mut Vec<ApprovalDecl>, incoming: ApprovalDecl) {
    match approvals
        .iter()
        .position(|a| a.stage == incoming.stage && a.role == incoming.role)
    {
        Some(index) => approvals[index] = incoming,
        None => approvals.push(incoming),
    }
}

fn validate(proto: &Protocol) -> Result<(), ProtocolError> {
    let mut seen = HashSet::new();
    for stage in &proto.stages {
        if !seen.insert(stage.id.as_str()) {
            return Err(ProtocolError::DuplicateStage {
                id: stage.id.clone(),
            });
        }
    }
    for stage in &proto.stages {
        for dep in &stage.depends_on {
            if !seen.contains(dep.as_str()) {
                return Err(ProtocolError::DanglingDependency {
                    stage: stage.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    for approval in &proto.approvals {
        if !seen.contains(approval.stage.as_str()) {
            return Err(ProtocolError::DanglingApproval {
                stage: approval.stage.clone(),
                role: approval.role.clone(),
            });
        }
    }
    Ok(())
}
