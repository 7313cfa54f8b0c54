//! Plain-text template renderer
//!
//! Substitutes `{{key}}` placeholders from the template data and appends
//! the resolved inputs as labeled sections. Unknown placeholders are left
//! in place so a template author can spot them in the output.

use specflow_engine::{PromptRenderer, RenderError, TemplateData};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub struct PlainRenderer;

impl PlainRenderer {
    fn variables(data: &TemplateData) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("stage_name".to_string(), data.stage_name.clone());
        vars.insert("stage_type".to_string(), data.stage_type.clone());
        vars.insert("intent".to_string(), data.intent.clone());
        vars.insert("project_name".to_string(), data.project_name.clone());
        vars.insert("language".to_string(), data.language.clone());
        vars.insert("framework".to_string(), data.framework.clone());
        if let Some(prompt) = &data.prompt {
            vars.insert("granularity".to_string(), prompt.granularity.clone());
            vars.insert("max_tasks".to_string(), prompt.max_tasks.to_string());
            vars.insert("risk_bias".to_string(), prompt.risk_bias.clone());
        }
        for (key, value) in &data.custom_vars {
            vars.insert(key.clone(), value.clone());
        }
        for (key, value) in &data.constraints {
            vars.insert(format!("constraints.{key}"), value.clone());
        }
        vars
    }
}

impl PromptRenderer for PlainRenderer {
    fn render(&self, template_path: &Path, data: &TemplateData) -> Result<String, RenderError> {
        let template = fs::read_to_string(template_path).map_err(|e| {
            RenderError(format!("cannot read template {}: {e}", template_path.display()))
        })?;

        let mut text = template;
        for (key, value) in Self::variables(data) {
            text = text.replace(&format!("{{{{{key}}}}}"), &value);
        }

        if !data.inputs.is_empty() {
            text.push_str("\n## Inputs\n");
            for input in &data.inputs {
                text.push_str(&format!("\n### {}\n\n{}\n", input.name, input.content));
            }
        }
        if let Some(contract) = &data.output_contract {
            if !contract.sections.is_empty() {
                text.push_str("\n## Output Requirements\n\n");
                text.push_str("The output document must contain these sections:\n");
                for section in &contract.sections {
                    text.push_str(&format!("- {section}\n"));
                }
            }
        }
        Ok(text)
    }
}
