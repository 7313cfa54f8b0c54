//! Stage input compilation
//!
//! Assembles the dependency-complete, path-safe input set for a stage and
//! hands it to the external template renderer. The engine never inspects
//! rendered text; it only fingerprints it (SHA-256) so a completion can
//! later be checked against the inputs that produced it.

use crate::engine::Engine;
use crate::error::EngineError;
use sha2::{Digest, Sha256};
use specflow_protocol::{OutputContract, PromptOptions, Stage};
use specflow_workspace::resolve_input;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One resolved input handed to the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Logical name as declared by the stage
    pub name: String,
    pub content: String,
}

/// Caller overrides applied on top of the stage's prompt options
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub granularity: String,
    pub max_tasks: usize,
    pub prefer_parallel: bool,
    pub risk_bias: String,
}

impl CompileOptions {
    fn is_empty(&self) -> bool {
        self.granularity.is_empty()
            && self.max_tasks == 0
            && !self.prefer_parallel
            && self.risk_bias.is_empty()
    }

    /// Overlay onto a stage's options without mutating the loaded protocol
    fn apply(&self, base: Option<&PromptOptions>) -> Option<PromptOptions> {
        if self.is_empty() {
            return base.cloned();
        }
        let mut options = base.cloned().unwrap_or_default();
        if !self.granularity.is_empty() {
            options.granularity = self.granularity.clone();
        }
        if self.max_tasks > 0 {
            options.max_tasks = self.max_tasks;
        }
        if self.prefer_parallel {
            options.prefer_parallel = true;
        }
        if !self.risk_bias.is_empty() {
            options.risk_bias = self.risk_bias.clone();
        }
        Some(options)
    }
}

/// Everything the external renderer may substitute into a template
#[derive(Debug, Clone)]
pub struct TemplateData {
    pub stage_name: String,
    pub stage_type: String,
    pub intent: String,
    pub project_name: String,
    pub language: String,
    pub framework: String,
    pub inputs: Vec<InputFile>,
    pub outputs: Vec<String>,
    pub custom_vars: BTreeMap<String, String>,
    pub constraints: BTreeMap<String, String>,
    pub prompt: Option<PromptOptions>,
    pub output_contract: Option<OutputContract>,
}

/// Rendering failure reported by the external collaborator
#[derive(Debug, thiserror::Error)]
#[error("template render failed: {0}")]
pub struct RenderError(pub String);

/// External template renderer seam
///
/// Out of core scope; the engine guarantees only that `data.inputs` is
/// dependency-complete and path-safe.
pub trait PromptRenderer {
    /// Render the template at `template_path` with the given data
    ///
    /// # Errors
    /// Implementation-defined.
    fn render(&self, template_path: &Path, data: &TemplateData) -> Result<String, RenderError>;
}

/// External prompt-quality checker seam
///
/// Returns advisory warnings for a compiled prompt; never blocks.
pub trait PromptLinter {
    fn lint(&self, stage_id: &str, prompt: &str) -> Vec<String>;
}

/// A rendered prompt plus the fingerprint of its exact text
#[derive(Debug, Clone)]
pub struct CompiledPrompt {
    pub text: String,
    pub fingerprint: String,
}

impl CompiledPrompt {
    fn new(text: String) -> Self {
        let fingerprint = hex::encode(Sha256::digest(text.as_bytes()));
        Self { text, fingerprint }
    }
}

impl Engine {
    /// Resolve and read every input the stage declares
    ///
    /// Review-intent stages receive the entire artifact store (sorted by
    /// relative path) instead of their declared list, so a reviewer sees
    /// everything produced so far.
    ///
    /// # Errors
    /// Unsafe or missing inputs and unreadable files.
    pub fn compile_inputs(&self, stage: &Stage) -> Result<Vec<InputFile>, EngineError> {
        if stage.intent == "review" {
            return self.list_all_artifacts();
        }
        let stage_ids = self.protocol().stage_ids();
        let mut inputs = Vec::with_capacity(stage.inputs.len());
        for logical in &stage.inputs {
            let path = resolve_input(self.layout(), logical, &stage.depends_on, &stage_ids)?;
            let content =
                fs::read_to_string(&path).map_err(|e| EngineError::io(&path, e))?;
            inputs.push(InputFile {
                name: logical.clone(),
                content,
            });
        }
        Ok(inputs)
    }

    /// Compile a stage's prompt through the external renderer
    ///
    /// Does not gate on dependencies; callers invoke
    /// [`Engine::require_dependencies`] first for direct stage requests
    /// and skip unmet stages during bulk checks.
    ///
    /// # Errors
    /// Input resolution and renderer failures.
    pub fn compile_prompt(
        &self,
        stage: &Stage,
        options: &CompileOptions,
        renderer: &dyn PromptRenderer,
    ) -> Result<CompiledPrompt, EngineError> {
        let inputs = self.compile_inputs(stage)?;
        let config = self.config();
        let data = TemplateData {
            stage_name: stage.name.clone(),
            stage_type: stage.stage_type.clone(),
            intent: stage.intent.clone(),
            project_name: config.project_name.clone(),
            language: config.language.clone(),
            framework: config.framework.clone(),
            inputs,
            outputs: stage.outputs.clone(),
            custom_vars: config.custom_vars.clone(),
            constraints: config.constraints.clone(),
            prompt: options.apply(stage.prompt.as_ref()),
            output_contract: stage.output.clone(),
        };
        let template_path = self.template_path(stage);
        let text = renderer.render(&template_path, &data)?;
        Ok(CompiledPrompt::new(text))
    }

    /// Location of the stage's template under the templates directory
    #[must_use]
    pub fn template_path(&self, stage: &Stage) -> PathBuf {
        self.layout().templates_dir().join(&stage.template)
    }

    /// Every file under the artifact store as an input, sorted by path
    ///
    /// # Errors
    /// Traversal and read failures; an absent store is empty.
    pub fn list_all_artifacts(&self) -> Result<Vec<InputFile>, EngineError> {
        let root = self.layout().artifacts_dir();
        let hashes = specflow_workspace::collect_file_hashes(&root)?;
        let mut inputs = Vec::with_capacity(hashes.len());
        for rel in hashes.keys() {
            let path = root.join(rel);
            let content =
                fs::read_to_string(&path).map_err(|e| EngineError::io(&path, e))?;
            inputs.push(InputFile {
                name: rel.clone(),
                content,
            });
        }
        Ok(inputs)
    }
}
