//! End-to-end engine flow over a scaffolded workspace

use pretty_assertions::assert_eq;
use specflow_engine::{
    init_workspace, CompileOptions, Engine, EngineError, PromptLinter, PromptRenderer,
    RenderError, TemplateData,
};
use specflow_workspace::WorkspaceLayout;
use std::fs;
use std::path::Path;

/// Minimal renderer: template text followed by each input, labeled
struct PlainRenderer;

impl PromptRenderer for PlainRenderer {
    fn render(&self, template_path: &Path, data: &TemplateData) -> Result<String, RenderError> {
        let template = fs::read_to_string(template_path)
            .map_err(|e| RenderError(format!("{}: {e}", template_path.display())))?;
        let mut out = template;
        for input in &data.inputs {
            out.push_str(&format!("\n--- {} ---\n{}", input.name, input.content));
        }
        Ok(out)
    }
}

struct PhraseLinter(&'static str);

impl PromptLinter for PhraseLinter {
    fn lint(&self, _stage_id: &str, prompt: &str) -> Vec<String> {
        if prompt.contains(self.0) {
            vec![format!("forbidden phrase: {}", self.0)]
        } else {
            Vec::new()
        }
    }
}

fn workspace() -> (tempfile::TempDir, WorkspaceLayout) {
    let tmp = tempfile::tempdir().unwrap();
    let layout = WorkspaceLayout::at_root(tmp.path());
    init_workspace(&layout, "demo").unwrap();
    (tmp, layout)
}

fn write_artifact(layout: &WorkspaceLayout, rel: &str, content: &str) {
    let path = layout.artifacts_dir().join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn load_stamps_fresh_state_and_config() {
    let (_tmp, layout) = workspace();
    let engine = Engine::load(layout, None).unwrap();
    assert_eq!(engine.config().protocol, "default");
    assert_eq!(engine.config().project_name, "demo");
    assert_eq!(engine.state().protocol, "default");
    assert_eq!(engine.state().spec_version, "1.0");
    assert_eq!(
        engine.protocol().stage_ids(),
        vec!["requirements", "design", "implementation", "decompose"]
    );
}

#[test]
fn dependency_gate_blocks_until_prerequisites_complete() {
    let (_tmp, layout) = workspace();
    let mut engine = Engine::load(layout, None).unwrap();

    let design = engine.stage("design").unwrap().clone();
    let err = engine.require_dependencies(&design).unwrap_err();
    match err {
        EngineError::MissingDependency { stage, dependency } => {
            assert_eq!(stage, "design");
            assert_eq!(dependency, "requirements");
        }
        other => panic!("unexpected error: {other}"),
    }

    engine
        .complete_stage(
            "requirements",
            vec!["requirements/requirements.md".into()],
            "hash".into(),
        )
        .unwrap();
    engine.require_dependencies(&design).unwrap();
}

#[test]
fn completion_persists_across_reloads() {
    let (_tmp, layout) = workspace();
    let mut engine = Engine::load(layout.clone(), None).unwrap();
    engine
        .complete_stage(
            "requirements",
            vec!["requirements/requirements.md".into()],
            "h1".into(),
        )
        .unwrap();
    drop(engine);

    let reloaded = Engine::load(layout, None).unwrap();
    assert!(reloaded.state().is_completed("requirements"));
    assert_eq!(
        reloaded.state().stage_outputs["requirements"].prompt_hash,
        "h1"
    );
}

#[test]
fn completion_rejects_unsafe_artifact_paths() {
    let (_tmp, layout) = workspace();
    let mut engine = Engine::load(layout, None).unwrap();
    let err = engine
        .complete_stage("requirements", vec!["../escape.md".into()], String::new())
        .unwrap_err();
    assert!(matches!(err, EngineError::Workspace(_)));
    assert!(!engine.state().is_completed("requirements"));
}

#[test]
fn unknown_stage_is_rejected_before_state_changes() {
    let (_tmp, layout) = workspace();
    let mut engine = Engine::load(layout, None).unwrap();
    let err = engine
        .complete_stage("nonexistent", vec![], String::new())
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownStage(_)));
}

#[test]
fn approvals_must_be_declared() {
    let (_tmp, layout) = workspace();
    let mut engine = Engine::load(layout, None).unwrap();
    let err = engine
        .approve_stage("requirements", "architect", "ana", "")
        .unwrap_err();
    assert!(matches!(err, EngineError::ApprovalNotDeclared { .. }));
}

#[test]
fn preemptive_and_repeat_approvals_warn() {
    let (_tmp, layout) = workspace();
    let mut engine = Engine::load(layout, None).unwrap();

    let warnings = engine.approve_stage("design", "architect", "ana", "").unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("not yet completed"));

    let warnings = engine
        .approve_stage("design", "architect", "ana", "revised")
        .unwrap();
    assert!(warnings.iter().any(|w| w.contains("existing approval")));
    assert!(engine.state().has_approval("design", "architect"));
}

#[test]
fn compile_resolves_inputs_through_dependency_roots() {
    let (_tmp, layout) = workspace();
    write_artifact(&layout, "requirements/requirements.md", "the requirements body");
    let engine = Engine::load(layout, None).unwrap();

    let design = engine.stage("design").unwrap();
    let compiled = engine
        .compile_prompt(design, &CompileOptions::default(), &PlainRenderer)
        .unwrap();
    assert!(compiled.text.contains("the requirements body"));
    assert_eq!(compiled.fingerprint.len(), 64);

    let again = engine
        .compile_prompt(design, &CompileOptions::default(), &PlainRenderer)
        .unwrap();
    assert_eq!(compiled.fingerprint, again.fingerprint);
}

#[test]
fn compile_fails_when_inputs_are_missing() {
    let (_tmp, layout) = workspace();
    let engine = Engine::load(layout, None).unwrap();
    let design = engine.stage("design").unwrap();
    let err = engine.compile_inputs(design).unwrap_err();
    assert!(matches!(err, EngineError::Workspace(_)));
}

#[test]
fn check_reports_missing_outputs_and_approvals() {
    let (_tmp, layout) = workspace();
    write_artifact(&layout, "requirements/requirements.md", "# Overview\nbody\n");
    let mut engine = Engine::load(layout, None).unwrap();
    engine
        .complete_stage(
            "requirements",
            vec!["requirements/requirements.md".into()],
            String::new(),
        )
        .unwrap();
    engine
        .complete_stage("design", vec![], String::new())
        .unwrap();

    let report = engine.check(None, None).unwrap();
    let warnings = report.by_category();

    // design.md was never written
    assert!(warnings["outputs"].iter().any(|w| w.contains("design")));
    // requirements.md exists but lacks two declared sections
    assert_eq!(warnings["structure"].len(), 2);
    // design completed without its declared architect approval
    assert!(warnings["approvals"][0].contains("architect"));
}

#[test]
fn check_matches_wildcard_outputs_against_stored_artifacts() {
    let (_tmp, layout) = workspace();
    let mut engine = Engine::load(layout, None).unwrap();
    for stage in ["requirements", "design", "implementation"] {
        engine.complete_stage(stage, vec![], String::new()).unwrap();
    }
    engine
        .complete_stage(
            "decompose",
            vec!["decompose/tasks-001.md".into(), "decompose/tasks-002.md".into()],
            String::new(),
        )
        .unwrap();

    let report = engine.check(None, None).unwrap();
    let missing_decompose = report
        .by_category()
        .get("outputs")
        .map(|w| w.iter().any(|m| m.contains("tasks-*")))
        .unwrap_or(false);
    assert!(!missing_decompose);
}

#[test]
fn check_skips_prompt_pass_for_gated_stages() {
    let (_tmp, layout) = workspace();
    write_artifact(&layout, "requirements/requirements.md", "body");
    let engine = Engine::load(layout, None).unwrap();

    // Only the requirements stage has met dependencies; no compile
    // failures may leak from the gated ones.
    let report = engine
        .check(Some(&PlainRenderer), Some(&PhraseLinter("TBD")))
        .unwrap();
    assert!(!report.by_category().contains_key("prompts"));
}

#[test]
fn check_surfaces_linter_warnings() {
    let (_tmp, layout) = workspace();
    write_artifact(&layout, "requirements/requirements.md", "left as TBD");
    let mut engine = Engine::load(layout, None).unwrap();
    engine
        .complete_stage(
            "requirements",
            vec!["requirements/requirements.md".into()],
            String::new(),
        )
        .unwrap();

    let report = engine
        .check(Some(&PlainRenderer), Some(&PhraseLinter("TBD")))
        .unwrap();
    let prompts = &report.by_category()["prompts"];
    assert!(prompts.iter().any(|w| w.contains("forbidden phrase")));
}

#[test]
fn check_report_can_fail_on_warnings() {
    let (_tmp, layout) = workspace();
    let mut engine = Engine::load(layout, None).unwrap();
    engine
        .complete_stage("design", vec![], String::new())
        .unwrap();

    let report = engine.check(None, None).unwrap();
    assert!(!report.is_empty());
    let err = report.clone().into_result(true).unwrap_err();
    assert!(matches!(err, EngineError::CheckFailed { .. }));
    report.into_result(false).unwrap();
}

#[test]
fn completion_validation_lists_everything_outstanding() {
    let (_tmp, layout) = workspace();
    let mut engine = Engine::load(layout, None).unwrap();
    engine
        .complete_stage("requirements", vec![], String::new())
        .unwrap();

    let status = engine.validate_completion();
    assert!(!status.is_complete());
    assert_eq!(
        status.missing_stages,
        vec!["design", "implementation", "decompose"]
    );
    assert_eq!(
        status.missing_approvals,
        vec![("design".to_string(), "architect".to_string())]
    );

    for stage in ["design", "implementation", "decompose"] {
        engine.complete_stage(stage, vec![], String::new()).unwrap();
    }
    engine.approve_stage("design", "architect", "ana", "").unwrap();
    assert!(engine.validate_completion().is_complete());
}

#[test]
fn review_stages_receive_the_whole_artifact_store() {
    let (_tmp, layout) = workspace();
    // Add a review stage to the protocol on disk before loading.
    let protocol_path = layout.protocol_path("default");
    let text = fs::read_to_string(&protocol_path).unwrap();
    let audit_stage =
        "  - id: audit\n    name: Audit\n    type: document\n    intent: review\n    template: requirements.md\napprovals:";
    fs::write(&protocol_path, text.replacen("approvals:", audit_stage, 1)).unwrap();

    write_artifact(&layout, "requirements/requirements.md", "reqs");
    write_artifact(&layout, "design/design.md", "design");
    let engine = Engine::load(layout, None).unwrap();

    let audit = engine.stage("audit").unwrap();
    let inputs = engine.compile_inputs(audit).unwrap();
    let names: Vec<&str> = inputs.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["design/design.md", "requirements/requirements.md"]);
}

#[test]
fn journal_entries_persist_across_reloads() {
    let (_tmp, layout) = workspace();
    let mut engine = Engine::load(layout.clone(), None).unwrap();

    let a = engine.record_assumption("single writer per workspace", "ana").unwrap();
    let q = engine
        .record_open_question("retention policy for tracks?", vec!["ops".into()], "")
        .unwrap();
    let r = engine.record_risk("restore race with external writers", "medium").unwrap();
    assert_eq!((a.as_str(), q.as_str(), r.as_str()), ("A1", "Q1", "R1"));

    engine.update_journal_entry("Q1", "", "tracks are disposable").unwrap();
    engine.update_journal_entry("R1", "accepted", "documented limitation").unwrap();

    let reloaded = Engine::load(layout, None).unwrap();
    let journal = &reloaded.state().journal;
    assert_eq!(journal.assumptions[0].status, "open");
    assert_eq!(journal.open_questions[0].answer, "tracks are disposable");
    assert_eq!(journal.risks[0].status, "accepted");
    assert_eq!(journal.risks[0].mitigation, "documented limitation");
}

#[test]
fn unknown_journal_ids_are_rejected() {
    let (_tmp, layout) = workspace();
    let mut engine = Engine::load(layout, None).unwrap();
    let err = engine.update_journal_entry("Q7", "", "n/a").unwrap_err();
    assert!(matches!(err, EngineError::UnknownJournalEntry(_)));
}
