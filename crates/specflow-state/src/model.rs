//! Workflow state value and its mutators

use crate::journal::Journal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persistent record of workflow progress for one workspace
///
/// Every collection carries a serde default so states written by older
/// versions (or hand-edited) deserialize into usable values; callers never
/// observe a structurally absent map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Name of the protocol this state was created under
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub current_stage: String,
    /// Insertion order is completion order; a real invariant, stored as an
    /// explicit sequence rather than derived from the output map
    #[serde(default)]
    pub completed_stages: Vec<String>,
    #[serde(default = "Utc::now")]
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub spec_version: String,
    #[serde(default)]
    pub stage_outputs: BTreeMap<String, StageOutput>,
    #[serde(default)]
    pub approvals: BTreeMap<String, Vec<ApprovalRecord>>,
    #[serde(default)]
    pub journal: Journal,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new("")
    }
}

/// What a completed stage produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    pub completed_at: DateTime<Utc>,
    pub files: Vec<String>,
    /// Hash of the exact compiled prompt that produced the output; later
    /// tooling can detect drift against the currently declared input set
    #[serde(default)]
    pub prompt_hash: String,
}

/// A recorded statement by a named role that a completed stage is acceptable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub role: String,
    pub approved_by: String,
    pub approved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl WorkflowState {
    /// Fresh state for a workspace governed by `protocol`
    #[must_use]
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            current_stage: String::new(),
            completed_stages: Vec::new(),
            started_at: Utc::now(),
            spec_version: String::new(),
            stage_outputs: BTreeMap::new(),
            approvals: BTreeMap::new(),
            journal: Journal::default(),
        }
    }

    /// Whether a stage has been completed
    #[must_use]
    pub fn is_completed(&self, stage_id: &str) -> bool {
        self.completed_stages.iter().any(|id| id == stage_id)
    }

    /// Record a stage completion
    ///
    /// Appends to `completed_stages` only if absent and unconditionally
    /// overwrites the stage's output record. Safe to call twice with
    /// identical inputs.
    pub fn record_completion(&mut self, stage_id: &str, files: Vec<String>, prompt_hash: String) {
        self.stage_outputs.insert(
            stage_id.to_string(),
            StageOutput {
                completed_at: Utc::now(),
                files,
                prompt_hash,
            },
        );
        if !self.is_completed(stage_id) {
            self.completed_stages.push(stage_id.to_string());
        }
        tracing::debug!(stage = stage_id, "recorded stage completion");
    }

    /// Record or update an approval for (stage, role)
    ///
    /// At most one live record per role: a repeat recording replaces the
    /// existing record and returns `true`.
    pub fn record_approval(
        &mut self,
        stage_id: &str,
        role: &str,
        approved_by: &str,
        notes: &str,
    ) -> bool {
        let record = ApprovalRecord {
            role: role.to_string(),
            approved_by: approved_by.to_string(),
            approved_at: Utc::now(),
            notes: notes.to_string(),
        };
        let records = self.approvals.entry(stage_id.to_string()).or_default();
        if let Some(existing) = records.iter_mut().find(|r| r.role == role) {
            *existing = record;
            return true;
        }
        records.push(record);
        false
    }

    /// Whether `role` has approved `stage_id`
    #[must_use]
    pub fn has_approval(&self, stage_id: &str, role: &str) -> bool {
        self.approvals
            .get(stage_id)
            .is_some_and(|records| records.iter().any(|r| r.role == role))
    }
}
