//! Snapshot lifecycle integration tests
//!
//! Exercises create/restore/compare against a real workspace tree in a
//! temporary directory.

use pretty_assertions::assert_eq;
use specflow_snapshot::{SnapshotError, SnapshotManager};
use specflow_state::WorkflowState;
use specflow_workspace::{collect_file_hashes, Config, WorkspaceLayout};
use std::fs;
use std::path::Path;

const PROTOCOL_DOC: &str = "name: default\nversion: \"1.0\"\nstages:\n  - id: requirements\n    template: requirements.md\n";

fn build_workspace(root: &Path) -> WorkspaceLayout {
    let layout = WorkspaceLayout::at_root(root);
    fs::create_dir_all(layout.protocols_dir()).unwrap();
    fs::write(layout.protocol_path("default"), PROTOCOL_DOC).unwrap();
    fs::create_dir_all(layout.templates_dir()).unwrap();
    fs::write(layout.templates_dir().join("requirements.md"), "# Req").unwrap();
    fs::create_dir_all(layout.artifacts_dir().join("requirements")).unwrap();
    fs::write(
        layout.artifacts_dir().join("requirements/spec.md"),
        "the spec",
    )
    .unwrap();

    let config = Config {
        protocol: "default".into(),
        project_name: "demo".into(),
        ..Config::default()
    };
    config.save(&layout.config_path()).unwrap();

    let mut state = WorkflowState::new("default");
    state.record_completion(
        "requirements",
        vec!["requirements/spec.md".into()],
        "hash-1".into(),
    );
    state.save(&layout.state_path()).unwrap();
    layout
}

fn archives(layout: &WorkspaceLayout) -> SnapshotManager {
    SnapshotManager::new(layout.archives_dir(), layout.clone())
}

#[test]
fn create_then_restore_round_trips_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = build_workspace(tmp.path());
    let mgr = archives(&layout);

    mgr.create("v1", vec!["release".into()], "first cut").unwrap();
    let before = collect_file_hashes(&layout.artifacts_dir()).unwrap();

    // Dirty the live workspace after the snapshot.
    fs::write(
        layout.artifacts_dir().join("requirements/dirty.md"),
        "trash",
    )
    .unwrap();
    fs::write(layout.artifacts_dir().join("requirements/spec.md"), "edited").unwrap();

    mgr.restore("v1", true).unwrap();

    let after = collect_file_hashes(&layout.artifacts_dir()).unwrap();
    assert_eq!(after, before);
    assert!(!layout.artifacts_dir().join("requirements/dirty.md").exists());
    // Staging directory cleaned up.
    assert!(!layout.root().join(".specflow_restore.tmp").exists());
}

#[test]
fn create_records_metadata() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = build_workspace(tmp.path());
    let mgr = archives(&layout);

    mgr.create("v1", vec!["release".into()], "notes here").unwrap();
    let metadata = mgr.metadata("v1").unwrap();
    assert_eq!(metadata.name, "v1");
    assert_eq!(metadata.protocol, "default");
    assert_eq!(metadata.stages_completed, vec!["requirements"]);
    assert_eq!(metadata.tags, vec!["release"]);
    assert_eq!(metadata.notes, "notes here");
}

#[test]
fn create_refuses_existing_name() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = build_workspace(tmp.path());
    let mgr = archives(&layout);

    mgr.create("v1", vec![], "").unwrap();
    let err = mgr.create("v1", vec![], "").unwrap_err();
    assert!(matches!(err, SnapshotError::AlreadyExists(_)));
    // No temp directory left behind.
    assert!(!layout.archives_dir().join("v1.tmp").exists());
}

#[test]
fn create_requires_referenced_artifacts_on_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = build_workspace(tmp.path());
    fs::remove_file(layout.artifacts_dir().join("requirements/spec.md")).unwrap();

    let err = archives(&layout).create("v1", vec![], "").unwrap_err();
    assert!(matches!(err, SnapshotError::MissingArtifact { .. }));
    assert!(!layout.archives_dir().join("v1").exists());
}

#[test]
fn restore_unknown_snapshot_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = build_workspace(tmp.path());
    let err = archives(&layout).restore("ghost", true).unwrap_err();
    assert!(matches!(err, SnapshotError::NotFound(_)));
}

#[test]
fn restore_without_force_refuses_populated_workspace() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = build_workspace(tmp.path());
    let mgr = archives(&layout);
    mgr.create("v1", vec![], "").unwrap();

    let err = mgr.restore("v1", false).unwrap_err();
    assert!(matches!(err, SnapshotError::RequiresForce));
}

#[test]
fn restore_rejects_corrupt_snapshot_without_live_effects() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = build_workspace(tmp.path());
    let mgr = archives(&layout);
    mgr.create("v1", vec![], "").unwrap();

    // Corrupt the snapshot: drop a required subtree.
    fs::remove_dir_all(layout.archives_dir().join("v1/templates")).unwrap();
    let before = collect_file_hashes(&layout.artifacts_dir()).unwrap();

    let err = mgr.restore("v1", true).unwrap_err();
    assert!(matches!(err, SnapshotError::Incomplete { .. }));

    let after = collect_file_hashes(&layout.artifacts_dir()).unwrap();
    assert_eq!(after, before);
}

#[test]
fn restore_rejects_metadata_protocol_mismatch() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = build_workspace(tmp.path());
    let mgr = archives(&layout);
    mgr.create("v1", vec![], "").unwrap();

    let metadata_path = layout.archives_dir().join("v1/metadata.json");
    let text = fs::read_to_string(&metadata_path).unwrap();
    fs::write(&metadata_path, text.replace("\"default\"", "\"other\"")).unwrap();

    let err = mgr.restore("v1", true).unwrap_err();
    assert!(matches!(err, SnapshotError::ProtocolMismatch { .. }));
}

#[test]
fn compare_classifies_and_sorts_differences() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = build_workspace(tmp.path());
    let mgr = archives(&layout);
    mgr.create("v1", vec![], "").unwrap();

    // One changed, one added, one removed relative to v1.
    fs::write(layout.artifacts_dir().join("requirements/spec.md"), "v2 body").unwrap();
    fs::write(layout.artifacts_dir().join("requirements/api.md"), "api").unwrap();
    let mut state = WorkflowState::load(&layout.state_path()).unwrap();
    state.record_completion(
        "requirements",
        vec!["requirements/spec.md".into(), "requirements/api.md".into()],
        "hash-2".into(),
    );
    state.save(&layout.state_path()).unwrap();
    mgr.create("v2", vec![], "").unwrap();
    fs::remove_file(layout.archives_dir().join("v2/artifacts/requirements/api.md")).unwrap();
    fs::write(
        layout.archives_dir().join("v2/artifacts/requirements/extra.md"),
        "extra",
    )
    .unwrap();

    let diff = mgr.compare("v1", "v2").unwrap();
    assert_eq!(diff.added, vec!["requirements/extra.md"]);
    assert_eq!(diff.removed, Vec::<String>::new());
    assert_eq!(diff.changed, vec!["requirements/spec.md"]);

    // Reversed direction flips added/removed.
    let diff = mgr.compare("v2", "v1").unwrap();
    assert_eq!(diff.removed, vec!["requirements/extra.md"]);
    assert_eq!(diff.added, Vec::<String>::new());
    assert_eq!(diff.changed, vec!["requirements/spec.md"]);
}

#[test]
fn identical_snapshots_compare_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = build_workspace(tmp.path());
    let mgr = archives(&layout);
    mgr.create("v1", vec![], "").unwrap();
    mgr.create("v2", vec![], "").unwrap();

    assert!(mgr.compare("v1", "v2").unwrap().is_empty());
}

#[test]
fn list_is_sorted_and_tolerates_absent_root() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = build_workspace(tmp.path());
    let mgr = archives(&layout);
    assert!(mgr.list().unwrap().is_empty());

    mgr.create("zeta", vec![], "").unwrap();
    mgr.create("alpha", vec![], "").unwrap();
    assert_eq!(mgr.list().unwrap(), vec!["alpha", "zeta"]);
}

#[test]
fn archives_and_tracks_share_the_mechanism() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = build_workspace(tmp.path());
    let tracks = SnapshotManager::new(layout.tracks_dir(), layout.clone());

    tracks.create("experiment", vec!["track".into()], "").unwrap();
    assert_eq!(tracks.list().unwrap(), vec!["experiment"]);
    // Tracks do not show up under archives.
    assert!(archives(&layout).list().unwrap().is_empty());

    tracks.restore("experiment", true).unwrap();
    assert!(layout.artifacts_dir().join("requirements/spec.md").is_file());
}
