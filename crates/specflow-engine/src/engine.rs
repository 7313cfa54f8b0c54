//! Engine construction and state-mutating operations

use crate::error::EngineError;
use specflow_protocol::{Protocol, ProtocolSource, Stage, DEFAULT_PROTOCOL_NAME};
use specflow_state::WorkflowState;
use specflow_workspace::{resolve_output_relative, Config, WorkspaceLayout};

/// The main application coordinator
///
/// Owns the in-memory config/protocol/state triple for the duration of one
/// command invocation. The resolved protocol source is carried per
/// instance; there is no process-wide override.
#[derive(Debug)]
pub struct Engine {
    layout: WorkspaceLayout,
    config: Config,
    protocol: Protocol,
    state: WorkflowState,
}

impl Engine {
    /// Load the engine from the filesystem: config, then the active
    /// protocol, then state
    ///
    /// The active protocol is, in order of precedence: the explicit
    /// `protocol_override` parameter, the configured protocol, the
    /// default name. Fresh state is stamped with the protocol name and
    /// version on first contact.
    ///
    /// # Errors
    /// Propagates configuration, protocol, and state load failures.
    pub fn load(
        layout: WorkspaceLayout,
        protocol_override: Option<ProtocolSource>,
    ) -> Result<Self, EngineError> {
        let mut config = Config::load(&layout.config_path())?;
        if config.protocol.is_empty() {
            config.protocol = DEFAULT_PROTOCOL_NAME.to_string();
        }
        if config.project_name.is_empty() {
            config.project_name = layout
                .root()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "project".to_string());
        }

        let source = protocol_override
            .unwrap_or_else(|| ProtocolSource::classify(&config.protocol));
        let protocol_path = source.resolve(&layout.protocols_dir());
        tracing::debug!(
            protocol = %source.display_name(),
            path = %protocol_path.display(),
            "loading active protocol"
        );
        let protocol = Protocol::load(&protocol_path)?;

        let mut state = WorkflowState::load(&layout.state_path())?;
        if state.protocol.is_empty() {
            state.protocol = protocol.name.clone();
        }
        if state.spec_version.is_empty() {
            state.spec_version = protocol.version.clone();
        }

        Ok(Self {
            layout,
            config,
            protocol,
            state,
        })
    }

    #[must_use]
    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    #[must_use]
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Look up a stage or fail with its id
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownStage`].
    pub fn stage(&self, stage_id: &str) -> Result<&Stage, EngineError> {
        self.protocol
            .stage_by_id(stage_id)
            .ok_or_else(|| EngineError::UnknownStage(stage_id.to_string()))
    }

    /// Gate: every `depends_on` entry of the stage must be completed
    ///
    /// # Errors
    /// Names the first unmet dependency found.
    pub fn require_dependencies(&self, stage: &Stage) -> Result<(), EngineError> {
        for dep in &stage.depends_on {
            if !self.state.is_completed(dep) {
                return Err(EngineError::MissingDependency {
                    stage: stage.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        Ok(())
    }

    /// Record an approval for a stage
    ///
    /// The (stage, role) pair must be declared in the protocol; the state
    /// object itself has no protocol reference, so the check lives here.
    /// Returns advisory warnings (preemptive approval of an incomplete
    /// stage, replacement of an existing record). State is persisted.
    ///
    /// # Errors
    /// Undeclared approvals and persistence failures.
    pub fn approve_stage(
        &mut self,
        stage_id: &str,
        role: &str,
        approved_by: &str,
        notes: &str,
    ) -> Result<Vec<String>, EngineError> {
        if !self.protocol.declares_approval(stage_id, role) {
            return Err(EngineError::ApprovalNotDeclared {
                stage: stage_id.to_string(),
                role: role.to_string(),
            });
        }

        let mut warnings = Vec::new();
        if !self.state.is_completed(stage_id) {
            warnings.push(format!(
                "stage {stage_id} is not yet completed; approval recorded preemptively"
            ));
        }
        if self.state.record_approval(stage_id, role, approved_by, notes) {
            warnings.push(format!("updating existing approval for role {role}"));
        }
        self.save_state()?;
        tracing::info!(stage = stage_id, role, by = approved_by, "approval recorded");
        Ok(warnings)
    }

    /// Record a stage completion with its produced artifacts
    ///
    /// Artifact paths are validated through the path resolver before they
    /// enter state. Idempotent; state is persisted.
    ///
    /// # Errors
    /// Unknown stage, unsafe artifact paths, persistence failures.
    pub fn complete_stage(
        &mut self,
        stage_id: &str,
        files: Vec<String>,
        prompt_hash: String,
    ) -> Result<(), EngineError> {
        self.stage(stage_id)?;
        let mut safe_files = Vec::with_capacity(files.len());
        for file in &files {
            safe_files.push(resolve_output_relative(file)?);
        }
        self.state.record_completion(stage_id, safe_files, prompt_hash);
        self.save_state()
    }

    /// Record an assumption in the journal; returns its id. Persists.
    ///
    /// # Errors
    /// Persistence failures.
    pub fn record_assumption(&mut self, text: &str, owner: &str) -> Result<String, EngineError> {
        let id = self.state.journal.add_assumption(text, owner);
        self.save_state()?;
        Ok(id)
    }

    /// Record an open question in the journal; returns its id. Persists.
    ///
    /// # Errors
    /// Persistence failures.
    pub fn record_open_question(
        &mut self,
        text: &str,
        tags: Vec<String>,
        context: &str,
    ) -> Result<String, EngineError> {
        let id = self.state.journal.add_open_question(text, tags, context);
        self.save_state()?;
        Ok(id)
    }

    /// Record a decision in the journal; returns its id. Persists.
    ///
    /// # Errors
    /// Persistence failures.
    pub fn record_decision(
        &mut self,
        text: &str,
        rationale: &str,
        alternatives: Vec<String>,
    ) -> Result<String, EngineError> {
        let id = self.state.journal.add_decision(text, rationale, alternatives);
        self.save_state()?;
        Ok(id)
    }

    /// Record a risk in the journal; returns its id. Persists.
    ///
    /// # Errors
    /// Persistence failures.
    pub fn record_risk(&mut self, text: &str, severity: &str) -> Result<String, EngineError> {
        let id = self.state.journal.add_risk(text, severity);
        self.save_state()?;
        Ok(id)
    }

    /// Update a journal entry, dispatching on its id prefix
    ///
    /// Assumptions and decisions take a `status` (defaulting to
    /// "validated" / "accepted"); questions take `note` as the answer;
    /// risks take `note` as the mitigation plus a `status` (defaulting to
    /// "mitigated"). Persists on success.
    ///
    /// # Errors
    /// Unknown entry ids and persistence failures.
    pub fn update_journal_entry(
        &mut self,
        id: &str,
        status: &str,
        note: &str,
    ) -> Result<(), EngineError> {
        let journal = &mut self.state.journal;
        let found = match id.chars().next() {
            Some('A') => {
                let status = if status.is_empty() { "validated" } else { status };
                journal.close_assumption(id, status)
            }
            Some('Q') => journal.resolve_open_question(id, note),
            Some('D') => {
                let status = if status.is_empty() { "accepted" } else { status };
                journal.update_decision(id, status)
            }
            Some('R') => {
                let status = if status.is_empty() { "mitigated" } else { status };
                journal.mitigate_risk(id, note, status)
            }
            _ => false,
        };
        if !found {
            return Err(EngineError::UnknownJournalEntry(id.to_string()));
        }
        self.save_state()
    }

    /// Persist the current state to disk
    ///
    /// # Errors
    /// Propagates persistence failures.
    pub fn save_state(&self) -> Result<(), EngineError> {
        self.state.save(&self.layout.state_path())?;
        Ok(())
    }
}
