//! Embedded workspace scaffolding
//!
//! The default protocol and its stage templates, written out verbatim by
//! [`init_workspace`]. Existing files are never overwritten; re-running
//! init on a live workspace only fills gaps.

use crate::error::EngineError;
use specflow_protocol::DEFAULT_PROTOCOL_NAME;
use specflow_state::WorkflowState;
use specflow_workspace::{ensure_dir, Config, WorkspaceLayout};
use std::fs;
use std::path::Path;

/// The protocol written at init time when no other is selected
pub const DEFAULT_PROTOCOL_YAML: &str = r#"name: default
version: "1.0"
stages:
  - id: requirements
    name: Requirements
    type: document
    intent: generate
    template: requirements.md
    outputs:
      - requirements.md
    output:
      sections:
        - Overview
        - Functional Requirements
        - Non-Functional Requirements
  - id: design
    name: Design
    type: document
    intent: generate
    template: design.md
    inputs:
      - requirements.md
    outputs:
      - design.md
    depends_on:
      - requirements
    output:
      sections:
        - Architecture
        - Components
  - id: implementation
    name: Implementation Plan
    type: document
    intent: generate
    template: implementation.md
    inputs:
      - requirements.md
      - design.md
    outputs:
      - implementation.md
    depends_on:
      - requirements
      - design
  - id: decompose
    name: Task Decomposition
    type: document
    intent: generate
    template: decompose.md
    inputs:
      - implementation.md
    outputs:
      - "tasks-*.md"
    depends_on:
      - implementation
    prompt:
      granularity: medium
      max_tasks: 12
approvals:
  - stage: design
    role: architect
"#;

const REQUIREMENTS_TEMPLATE: &str = r#"# Requirements: {{project_name}}

## Context

You are writing the requirements document for {{project_name}}
(language: {{language}}, framework: {{framework}}).

## Task

Produce a requirements document with these sections: Overview,
Functional Requirements, Non-Functional Requirements.

## Assumptions

State every assumption you make as a numbered list.
"#;

const DESIGN_TEMPLATE: &str = r#"# Design: {{project_name}}

## Context

Derive the design for {{project_name}} from the requirements supplied
below as inputs.

## Task

Produce a design document with these sections: Architecture, Components.

## Assumptions

State every assumption you make as a numbered list.
"#;

const IMPLEMENTATION_TEMPLATE: &str = r#"# Implementation Plan: {{project_name}}

## Context

Turn the approved design for {{project_name}} into an ordered
implementation plan.

## Task

Produce an implementation plan referencing each design component.

## Assumptions

State every assumption you make as a numbered list.
"#;

const DECOMPOSE_TEMPLATE: &str = r#"# Task Decomposition: {{project_name}}

## Context

Break the implementation plan for {{project_name}} into independent
tasks (granularity: {{granularity}}, at most {{max_tasks}} tasks).

## Task

Write one tasks-NNN.md file per task with a goal and acceptance
criteria.

## Assumptions

State every assumption you make as a numbered list.
"#;

/// Scaffold a workspace under the layout's root
///
/// Creates the marker directory tree, then fills in config, default
/// protocol, templates, and an empty state file, skipping anything
/// already present.
///
/// # Errors
/// Directory creation, serialization, and write failures.
pub fn init_workspace(layout: &WorkspaceLayout, project_name: &str) -> Result<(), EngineError> {
    ensure_dir(&layout.spec_dir())?;
    ensure_dir(&layout.artifacts_dir())?;
    ensure_dir(&layout.generated_dir())?;
    ensure_dir(&layout.protocols_dir())?;
    ensure_dir(&layout.templates_dir())?;
    ensure_dir(&layout.archives_dir())?;

    let config_path = layout.config_path();
    if !config_path.exists() {
        let config = Config {
            project_name: project_name.to_string(),
            protocol: DEFAULT_PROTOCOL_NAME.to_string(),
            ..Config::default()
        };
        config.save(&config_path)?;
    }

    write_if_missing(
        &layout.protocol_path(DEFAULT_PROTOCOL_NAME),
        DEFAULT_PROTOCOL_YAML,
    )?;
    let templates = layout.templates_dir();
    write_if_missing(&templates.join("requirements.md"), REQUIREMENTS_TEMPLATE)?;
    write_if_missing(&templates.join("design.md"), DESIGN_TEMPLATE)?;
    write_if_missing(&templates.join("implementation.md"), IMPLEMENTATION_TEMPLATE)?;
    write_if_missing(&templates.join("decompose.md"), DECOMPOSE_TEMPLATE)?;

    let state_path = layout.state_path();
    if !state_path.exists() {
        WorkflowState::new(DEFAULT_PROTOCOL_NAME).save(&state_path)?;
    }

    tracing::info!(root = %layout.root().display(), "workspace initialized");
    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<(), EngineError> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, content).map_err(|e| EngineError::io(path, e))
}
