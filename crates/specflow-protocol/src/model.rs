//! Protocol, stage, approval, and lint declarations
//!
//! These mirror the YAML protocol document. Every collection defaults to
//! empty so partially specified documents deserialize into usable values.

use serde::{Deserialize, Serialize};

/// The ordered stage graph plus approval/lint declarations for one workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// Ordered import list, resolved before local declarations apply
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uses: Vec<String>,
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approvals: Vec<ApprovalDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<LintRules>,
}

impl Protocol {
    /// Look up a stage by id
    #[must_use]
    pub fn stage_by_id(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// All stage ids in declaration order
    #[must_use]
    pub fn stage_ids(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.id.clone()).collect()
    }

    /// Whether an approval for (stage, role) is declared
    #[must_use]
    pub fn declares_approval(&self, stage: &str, role: &str) -> bool {
        self.approvals
            .iter()
            .any(|a| a.stage == stage && a.role == role)
    }
}

/// One step of the workflow with declared inputs, outputs, and dependencies
///
/// Immutable after resolution for the lifetime of a loaded protocol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub intent: String,
    /// spec | decompose | task_prompt | review | ...
    #[serde(default, rename = "type")]
    pub stage_type: String,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<PromptOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputContract>,
}

/// A contract that a role's attestation is expected once a stage completes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecl {
    pub stage: String,
    pub role: String,
}

/// Per-stage prompt generation options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptOptions {
    #[serde(default)]
    pub granularity: String,
    #[serde(default)]
    pub max_tasks: usize,
    #[serde(default)]
    pub prefer_parallel: bool,
    #[serde(default)]
    pub risk_bias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<LintRules>,
}

/// Required structure of a stage's primary output document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputContract {
    /// Markdown section headers that must be present
    #[serde(default)]
    pub sections: Vec<String>,
}

/// Prompt lint rule overrides carried by protocols and stages
///
/// Merging extends rather than replaces: an importing protocol adds to the
/// rules of its bases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintRules {
    #[serde(default)]
    pub required_sections: Vec<String>,
    #[serde(default)]
    pub forbidden_phrases: Vec<String>,
}

impl LintRules {
    /// Fold another rule set into this one
    pub fn merge(&mut self, other: &LintRules) {
        self.required_sections
            .extend(other.required_sections.iter().cloned());
        self.forbidden_phrases
            .extend(other.forbidden_phrases.iter().cloned());
    }
}
