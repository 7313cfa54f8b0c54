//! Workspace health check and completion validation
//!
//! All findings here are advisory: collected, categorized, and reported in
//! aggregate. Nothing aborts unless the caller opts into failing on
//! warnings. Stages whose prerequisites are unmet are silently skipped; a
//! bulk scan must not punish stages the user has not reached yet.

use crate::compile::{CompileOptions, PromptLinter, PromptRenderer};
use crate::engine::Engine;
use crate::error::EngineError;
use specflow_workspace::artifact_rel_from_state;
use std::collections::BTreeMap;
use std::fs;

/// Aggregated advisory warnings, grouped by category
#[derive(Debug, Clone, Default)]
pub struct HealthReport {
    warnings: BTreeMap<String, Vec<String>>,
}

impl HealthReport {
    fn add(&mut self, category: &str, message: String) {
        self.warnings.entry(category.to_string()).or_default().push(message);
    }

    /// Categories in sorted order with their warnings
    #[must_use]
    pub fn by_category(&self) -> &BTreeMap<String, Vec<String>> {
        &self.warnings
    }

    /// Total warning count across categories
    #[must_use]
    pub fn total(&self) -> usize {
        self.warnings.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Turn a non-empty report into an error when the caller opted in
    ///
    /// # Errors
    /// Returns [`EngineError::CheckFailed`] when warnings exist and
    /// `fail_on_warnings` is set.
    pub fn into_result(self, fail_on_warnings: bool) -> Result<Self, EngineError> {
        if fail_on_warnings && !self.is_empty() {
            return Err(EngineError::CheckFailed { count: self.total() });
        }
        Ok(self)
    }
}

/// Outcome of completion validation
#[derive(Debug, Clone, Default)]
pub struct CompletionStatus {
    pub missing_stages: Vec<String>,
    /// (stage, role) pairs declared but not yet recorded
    pub missing_approvals: Vec<(String, String)>,
}

impl CompletionStatus {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_stages.is_empty() && self.missing_approvals.is_empty()
    }
}

impl Engine {
    /// Run all non-blocking validations over the workspace
    ///
    /// The renderer and linter are optional collaborators; without them
    /// the prompt-quality pass is skipped.
    ///
    /// # Errors
    /// Only infrastructure failures (unreadable state paths); findings
    /// themselves never error here.
    pub fn check(
        &self,
        renderer: Option<&dyn PromptRenderer>,
        linter: Option<&dyn PromptLinter>,
    ) -> Result<HealthReport, EngineError> {
        let mut report = HealthReport::default();
        let state = self.state();
        let protocol = self.protocol();

        if !state.protocol.is_empty() && state.protocol != protocol.name {
            report.add(
                "protocol",
                format!(
                    "protocol drift: state={} protocol={}",
                    state.protocol, protocol.name
                ),
            );
        }

        for stage in &protocol.stages {
            if stage.intent == "review" && !stage.outputs.is_empty() {
                report.add(
                    "protocol",
                    format!("review stage {} declares outputs", stage.id),
                );
            }
            if !state.is_completed(&stage.id) {
                continue;
            }

            // Stored artifact paths, relative to the stage's artifact root
            // where prefixed, for wildcard matching.
            let mut stored_rel = Vec::new();
            if let Some(output) = state.stage_outputs.get(&stage.id) {
                for file in &output.files {
                    match artifact_rel_from_state(file) {
                        Ok(rel) => {
                            let prefix = format!("{}/", stage.id);
                            stored_rel.push(
                                rel.strip_prefix(&prefix).map(str::to_string).unwrap_or(rel),
                            );
                        }
                        Err(err) => report.add(
                            "artifacts",
                            format!(
                                "invalid stored artifact path for stage {}: {file} ({err})",
                                stage.id
                            ),
                        ),
                    }
                }
            }

            for declared in &stage.outputs {
                if declared.is_empty() {
                    continue;
                }
                if declared.contains('*') {
                    let found = stored_rel.iter().any(|rel| match_output_pattern(declared, rel));
                    if !found {
                        report.add(
                            "outputs",
                            format!(
                                "missing output for stage {}: {declared} (no stored artifacts match)",
                                stage.id
                            ),
                        );
                    }
                    continue;
                }
                let expected = self
                    .layout()
                    .artifacts_dir()
                    .join(&stage.id)
                    .join(declared);
                if !expected.exists() {
                    report.add(
                        "outputs",
                        format!("missing output for stage {}: {}", stage.id, expected.display()),
                    );
                } else if let Some(contract) = &stage.output {
                    if let Ok(content) = fs::read_to_string(&expected) {
                        for section in &contract.sections {
                            let h1 = format!("# {section}");
                            let h2 = format!("## {section}");
                            if !content.contains(&h1) && !content.contains(&h2) {
                                report.add(
                                    "structure",
                                    format!(
                                        "missing section {section:?} in {}",
                                        expected.display()
                                    ),
                                );
                            }
                        }
                    }
                }
            }
        }

        for approval in &protocol.approvals {
            if state.is_completed(&approval.stage)
                && !state.has_approval(&approval.stage, &approval.role)
            {
                report.add(
                    "approvals",
                    format!(
                        "missing approval for stage {} (role: {})",
                        approval.stage, approval.role
                    ),
                );
            }
        }

        if let Some(renderer) = renderer {
            for stage in &protocol.stages {
                // Not an error during a bulk scan; the stage simply has
                // not been reached yet.
                if self.require_dependencies(stage).is_err() {
                    continue;
                }
                match self.compile_prompt(stage, &CompileOptions::default(), renderer) {
                    Ok(compiled) => {
                        if let Some(linter) = linter {
                            for warning in linter.lint(&stage.id, &compiled.text) {
                                report.add("prompts", format!("quality ({}): {warning}", stage.id));
                            }
                        }
                    }
                    Err(err) => {
                        report.add("prompts", format!("prompt compile ({}): {err}", stage.id));
                    }
                }
            }
        }

        tracing::debug!(warnings = report.total(), "health check complete");
        Ok(report)
    }

    /// Validate that every stage is completed and every declared approval
    /// is present
    #[must_use]
    pub fn validate_completion(&self) -> CompletionStatus {
        let mut status = CompletionStatus::default();
        for stage in &self.protocol().stages {
            if !self.state().is_completed(&stage.id) {
                status.missing_stages.push(stage.id.clone());
            }
        }
        for approval in &self.protocol().approvals {
            if !self.state().has_approval(&approval.stage, &approval.role) {
                status
                    .missing_approvals
                    .push((approval.stage.clone(), approval.role.clone()));
            }
        }
        status
    }
}

/// Match a declared output pattern against a stored relative path
///
/// `*` matches within a path segment; `**` is not supported. Patterns
/// without wildcards compare exactly.
fn match_output_pattern(pattern: &str, path: &str) -> bool {
    let mut regex_text = String::from("^");
    let mut first = true;
    for chunk in pattern.split('*') {
        if !first {
            regex_text.push_str("[^/]*");
        }
        first = false;
        regex_text.push_str(&regex::escape(chunk));
    }
    regex_text.push('$');
    regex::Regex::new(&regex_text).map(|re| re.is_match(path)).unwrap_or(false)
}
