//! Prompt quality linting
//!
//! Checks compiled prompts against a schema of required markdown sections
//! and forbidden (ambiguous) phrases. The built-in schema is extended by
//! protocol-level and stage-level lint rules; all findings are advisory.

use specflow_engine::PromptLinter;
use specflow_protocol::{LintRules, Protocol};
use std::collections::BTreeMap;

fn builtin_rules() -> LintRules {
    LintRules {
        required_sections: vec![
            "Context".to_string(),
            "Task".to_string(),
            "Assumptions".to_string(),
        ],
        forbidden_phrases: vec![
            "make it better".to_string(),
            "improve this".to_string(),
            "fix it".to_string(),
            "do your best".to_string(),
            "be creative".to_string(),
            "use best practices".to_string(),
            "make it good".to_string(),
            "enhance this".to_string(),
            "optimize this".to_string(),
            "make it perfect".to_string(),
        ],
    }
}

/// Linter with per-stage rule sets resolved from a loaded protocol
pub struct SchemaLinter {
    base: LintRules,
    per_stage: BTreeMap<String, LintRules>,
}

impl SchemaLinter {
    pub fn for_protocol(protocol: &Protocol) -> Self {
        let mut base = builtin_rules();
        if let Some(rules) = &protocol.lint {
            base.merge(rules);
        }
        let mut per_stage = BTreeMap::new();
        for stage in &protocol.stages {
            if let Some(rules) = stage.prompt.as_ref().and_then(|p| p.lint.as_ref()) {
                let mut merged = base.clone();
                merged.merge(rules);
                per_stage.insert(stage.id.clone(), merged);
            }
        }
        Self { base, per_stage }
    }

    fn rules_for(&self, stage_id: &str) -> &LintRules {
        self.per_stage.get(stage_id).unwrap_or(&self.base)
    }
}

impl PromptLinter for SchemaLinter {
    fn lint(&self, stage_id: &str, prompt: &str) -> Vec<String> {
        let rules = self.rules_for(stage_id);
        let mut warnings = Vec::new();

        for section in &rules.required_sections {
            // Section headers at any level, case-insensitive, own line
            let pattern = format!(r"(?mi)^#+\s+{}\s*$", regex::escape(section.trim()));
            let present = match regex::Regex::new(&pattern) {
                Ok(re) => re.is_match(prompt),
                Err(_) => prompt.to_lowercase().contains(&section.to_lowercase()),
            };
            if !present {
                warnings.push(format!("missing required section: {section}"));
            }
        }

        let prompt_lower = prompt.to_lowercase();
        for phrase in &rules.forbidden_phrases {
            if prompt_lower.contains(&phrase.to_lowercase()) {
                warnings.push(format!("contains ambiguous phrase: {phrase:?}"));
            }
        }

        warnings
    }
}
