//! `specflow` command-line interface

mod lint;
mod render;

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use lint::SchemaLinter;
use render::PlainRenderer;
use specflow_engine::{init_workspace, CompileOptions, Engine, PromptLinter};
use specflow_protocol::ProtocolSource;
use specflow_snapshot::SnapshotManager;
use specflow_workspace::WorkspaceLayout;
use std::fs;
use std::path::PathBuf;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn cli() -> Command {
    Command::new("specflow")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Spec-driven workflow engine")
        .arg_required_else_help(true)
        .arg(
            Arg::new("protocol")
                .long("protocol")
                .global(true)
                .help("Active protocol: a bare name under protocols/ or a path to a YAML file"),
        )
        .subcommand(
            Command::new("init")
                .about("Initialize a specflow workspace in the current directory")
                .arg(
                    Arg::new("name")
                        .long("name")
                        .help("Project name (defaults to the directory name)"),
                ),
        )
        .subcommand(
            Command::new("stage")
                .about("Compile and print the prompt for a stage")
                .arg(Arg::new("id").required(true).help("Stage id"))
                .arg(
                    Arg::new("out")
                        .long("out")
                        .help("Also write the prompt to this file"),
                )
                .arg(
                    Arg::new("no-strict")
                        .long("no-strict")
                        .action(ArgAction::SetTrue)
                        .help("Skip the dependency-completion gate"),
                )
                .arg(
                    Arg::new("granularity")
                        .long("granularity")
                        .help("Override prompt granularity"),
                )
                .arg(
                    Arg::new("max-tasks")
                        .long("max-tasks")
                        .value_parser(value_parser!(usize))
                        .help("Override maximum task count"),
                ),
        )
        .subcommand(
            Command::new("complete")
                .about("Record a stage completion with its produced artifacts")
                .arg(Arg::new("id").required(true).help("Stage id"))
                .arg(
                    Arg::new("file")
                        .long("file")
                        .action(ArgAction::Append)
                        .help("Artifact path relative to the artifact store (repeatable)"),
                )
                .arg(
                    Arg::new("prompt-hash")
                        .long("prompt-hash")
                        .help("Fingerprint of the prompt that produced the output"),
                ),
        )
        .subcommand(
            Command::new("approve")
                .about("Record an approval for a stage")
                .arg(Arg::new("id").required(true).help("Stage id"))
                .arg(Arg::new("role").long("role").required(true).help("Approving role"))
                .arg(Arg::new("by").long("by").required(true).help("Name of the approver"))
                .arg(Arg::new("notes").long("notes").default_value("").help("Approval notes")),
        )
        .subcommand(Command::new("status").about("Show workflow status"))
        .subcommand(
            Command::new("journal")
                .about("Record assumptions, questions, decisions, and risks")
                .subcommand_required(true)
                .subcommand(
                    Command::new("assume")
                        .about("Record an assumption")
                        .arg(Arg::new("text").required(true))
                        .arg(Arg::new("owner").long("owner").default_value("")),
                )
                .subcommand(
                    Command::new("question")
                        .about("Record an open question")
                        .arg(Arg::new("text").required(true))
                        .arg(Arg::new("tag").long("tag").action(ArgAction::Append))
                        .arg(
                            Arg::new("context")
                                .long("context")
                                .default_value("")
                                .help("File or section reference"),
                        ),
                )
                .subcommand(
                    Command::new("decide")
                        .about("Record a decision")
                        .arg(Arg::new("text").required(true))
                        .arg(Arg::new("rationale").long("rationale").required(true))
                        .arg(
                            Arg::new("alternative")
                                .long("alternative")
                                .action(ArgAction::Append)
                                .help("Rejected alternative (repeatable)"),
                        ),
                )
                .subcommand(
                    Command::new("risk")
                        .about("Record a risk")
                        .arg(Arg::new("text").required(true))
                        .arg(
                            Arg::new("severity")
                                .long("severity")
                                .default_value("medium")
                                .help("low | medium | high"),
                        ),
                )
                .subcommand(
                    Command::new("update")
                        .about("Update an entry by id (A*, Q*, D*, R*)")
                        .arg(Arg::new("id").required(true))
                        .arg(
                            Arg::new("status")
                                .long("status")
                                .default_value("")
                                .help("New status (kind-appropriate default when omitted)"),
                        )
                        .arg(
                            Arg::new("note")
                                .long("note")
                                .default_value("")
                                .help("Answer for questions, mitigation for risks"),
                        ),
                )
                .subcommand(Command::new("list").about("List journal entries")),
        )
        .subcommand(
            Command::new("check")
                .about("Run workspace health checks")
                .arg(
                    Arg::new("fail-on-warnings")
                        .long("fail-on-warnings")
                        .action(ArgAction::SetTrue)
                        .help("Exit non-zero when warnings are found"),
                ),
        )
        .subcommand(
            Command::new("complete-spec")
                .about("Validate spec completion and optionally archive")
                .arg(
                    Arg::new("warn-only")
                        .long("warn-only")
                        .action(ArgAction::SetTrue)
                        .help("Report missing stages/approvals without failing"),
                )
                .arg(
                    Arg::new("archive")
                        .long("archive")
                        .action(ArgAction::SetTrue)
                        .help("Create an archive snapshot after validation"),
                )
                .arg(
                    Arg::new("version")
                        .long("version")
                        .help("Archive version (defaults to state.spec_version)"),
                )
                .arg(
                    Arg::new("tag")
                        .long("tag")
                        .action(ArgAction::Append)
                        .help("Tag to apply to the archive (repeatable)"),
                )
                .arg(Arg::new("notes").long("notes").default_value("").help("Archive notes")),
        )
        .subcommand(
            Command::new("archive")
                .about("Manage permanent spec archives")
                .subcommand_required(true)
                .subcommand(
                    Command::new("create")
                        .about("Archive the current workspace under a version name")
                        .arg(Arg::new("version").required(true))
                        .arg(Arg::new("tag").long("tag").action(ArgAction::Append))
                        .arg(Arg::new("notes").long("notes").default_value("")),
                )
                .subcommand(Command::new("list").about("List archives"))
                .subcommand(
                    Command::new("show")
                        .about("Show archive metadata")
                        .arg(Arg::new("version").required(true)),
                )
                .subcommand(
                    Command::new("restore")
                        .about("Restore an archive into the workspace")
                        .arg(Arg::new("version").required(true))
                        .arg(
                            Arg::new("force")
                                .long("force")
                                .action(ArgAction::SetTrue)
                                .help("Overwrite existing workspace data"),
                        ),
                )
                .subcommand(
                    Command::new("diff")
                        .about("Compare artifacts between two archives")
                        .arg(Arg::new("left").required(true))
                        .arg(Arg::new("right").required(true)),
                ),
        )
        .subcommand(
            Command::new("track")
                .about("Manage parallel exploration tracks")
                .subcommand_required(true)
                .subcommand(
                    Command::new("create")
                        .about("Create a track from the current workspace")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("tag").long("tag").action(ArgAction::Append))
                        .arg(Arg::new("notes").long("notes").default_value("")),
                )
                .subcommand(Command::new("list").about("List tracks"))
                .subcommand(
                    Command::new("switch")
                        .about("Switch the workspace to a track (restores it)")
                        .arg(Arg::new("name").required(true))
                        .arg(
                            Arg::new("force")
                                .long("force")
                                .action(ArgAction::SetTrue)
                                .help("Overwrite existing workspace data"),
                        ),
                )
                .subcommand(
                    Command::new("diff")
                        .about("Compare artifacts between two tracks")
                        .arg(Arg::new("left").required(true))
                        .arg(Arg::new("right").required(true)),
                ),
        )
}

fn run() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("init", args)) => cmd_init(args),
        Some(("stage", args)) => cmd_stage(&matches, args),
        Some(("complete", args)) => cmd_complete(&matches, args),
        Some(("approve", args)) => cmd_approve(&matches, args),
        Some(("status", _)) => cmd_status(&matches),
        Some(("journal", args)) => cmd_journal(&matches, args),
        Some(("check", args)) => cmd_check(&matches, args),
        Some(("complete-spec", args)) => cmd_complete_spec(&matches, args),
        Some(("archive", args)) => cmd_snapshot(&matches, args, SnapshotKind::Archive),
        Some(("track", args)) => cmd_snapshot(&matches, args, SnapshotKind::Track),
        _ => unreachable!("subcommand required"),
    }
}

fn discover_layout() -> anyhow::Result<WorkspaceLayout> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    Ok(WorkspaceLayout::discover(&cwd)?)
}

fn load_engine(matches: &ArgMatches) -> anyhow::Result<Engine> {
    let layout = discover_layout()?;
    let source = matches
        .get_one::<String>("protocol")
        .map(|p| ProtocolSource::classify(p));
    Ok(Engine::load(layout, source)?)
}

fn cmd_init(args: &ArgMatches) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let layout = WorkspaceLayout::discover(&cwd).unwrap_or_else(|_| WorkspaceLayout::at_root(&cwd));
    let default_name = layout
        .root()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    let name = args.get_one::<String>("name").cloned().unwrap_or(default_name);

    init_workspace(&layout, &name)?;
    println!("Initialized specflow workspace at {}", layout.root().display());
    Ok(())
}

fn cmd_stage(matches: &ArgMatches, args: &ArgMatches) -> anyhow::Result<()> {
    let engine = load_engine(matches)?;
    let stage_id = args.get_one::<String>("id").map(String::as_str).unwrap_or_default();
    let stage = engine.stage(stage_id)?.clone();

    if !args.get_flag("no-strict") {
        engine.require_dependencies(&stage)?;
    }

    let options = CompileOptions {
        granularity: args
            .get_one::<String>("granularity")
            .cloned()
            .unwrap_or_default(),
        max_tasks: args.get_one::<usize>("max-tasks").copied().unwrap_or(0),
        ..CompileOptions::default()
    };
    let compiled = engine.compile_prompt(&stage, &options, &PlainRenderer)?;

    for warning in SchemaLinter::for_protocol(engine.protocol()).lint(stage_id, &compiled.text) {
        eprintln!("warning: {warning}");
    }

    if let Some(out) = args.get_one::<String>("out") {
        let out = PathBuf::from(out);
        fs::write(&out, &compiled.text)
            .with_context(|| format!("cannot write prompt to {}", out.display()))?;
    }
    println!("{}", compiled.text);
    eprintln!("prompt fingerprint: {}", compiled.fingerprint);
    Ok(())
}

fn cmd_complete(matches: &ArgMatches, args: &ArgMatches) -> anyhow::Result<()> {
    let mut engine = load_engine(matches)?;
    let stage_id = args.get_one::<String>("id").map(String::as_str).unwrap_or_default();
    let files: Vec<String> = args
        .get_many::<String>("file")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let prompt_hash = args
        .get_one::<String>("prompt-hash")
        .cloned()
        .unwrap_or_default();

    engine.complete_stage(stage_id, files, prompt_hash)?;
    println!("Recorded completion of stage {stage_id}");
    Ok(())
}

fn cmd_approve(matches: &ArgMatches, args: &ArgMatches) -> anyhow::Result<()> {
    let mut engine = load_engine(matches)?;
    let stage_id = args.get_one::<String>("id").map(String::as_str).unwrap_or_default();
    let role = args.get_one::<String>("role").map(String::as_str).unwrap_or_default();
    let by = args.get_one::<String>("by").map(String::as_str).unwrap_or_default();
    let notes = args.get_one::<String>("notes").map(String::as_str).unwrap_or_default();

    let warnings = engine.approve_stage(stage_id, role, by, notes)?;
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
    println!("Recorded approval of stage {stage_id} by role {role}");
    Ok(())
}

fn cmd_status(matches: &ArgMatches) -> anyhow::Result<()> {
    let engine = load_engine(matches)?;
    println!("Project: {}", engine.config().project_name);
    println!("Protocol: {}", engine.protocol().name);
    println!("State: {}", engine.layout().state_path().display());

    let state = engine.state();
    if state.completed_stages.is_empty() {
        println!("Completed stages: (none)");
    } else {
        println!("Completed stages: {}", state.completed_stages.join(", "));
    }
    if !state.current_stage.is_empty() {
        println!("Current stage: {}", state.current_stage);
    }
    Ok(())
}

fn cmd_journal(matches: &ArgMatches, args: &ArgMatches) -> anyhow::Result<()> {
    let mut engine = load_engine(matches)?;
    let text_of = |sub: &ArgMatches, key: &str| -> String {
        sub.get_one::<String>(key).cloned().unwrap_or_default()
    };
    match args.subcommand() {
        Some(("assume", sub)) => {
            let id = engine.record_assumption(&text_of(sub, "text"), &text_of(sub, "owner"))?;
            println!("Recorded assumption {id}");
        }
        Some(("question", sub)) => {
            let tags: Vec<String> = sub
                .get_many::<String>("tag")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            let id =
                engine.record_open_question(&text_of(sub, "text"), tags, &text_of(sub, "context"))?;
            println!("Recorded open question {id}");
        }
        Some(("decide", sub)) => {
            let alternatives: Vec<String> = sub
                .get_many::<String>("alternative")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            let id = engine.record_decision(
                &text_of(sub, "text"),
                &text_of(sub, "rationale"),
                alternatives,
            )?;
            println!("Recorded decision {id}");
        }
        Some(("risk", sub)) => {
            let id = engine.record_risk(&text_of(sub, "text"), &text_of(sub, "severity"))?;
            println!("Recorded risk {id}");
        }
        Some(("update", sub)) => {
            let id = text_of(sub, "id");
            engine.update_journal_entry(&id, &text_of(sub, "status"), &text_of(sub, "note"))?;
            println!("Updated journal entry {id}");
        }
        Some(("list", _)) => {
            let journal = &engine.state().journal;
            for a in &journal.assumptions {
                println!("{} [{}] {}", a.id, a.status, a.text);
            }
            for q in &journal.open_questions {
                println!("{} [{}] {}", q.id, q.status, q.text);
            }
            for d in &journal.decisions {
                println!("{} [{}] {}", d.id, d.status, d.text);
            }
            for r in &journal.risks {
                println!("{} [{}/{}] {}", r.id, r.severity, r.status, r.text);
            }
        }
        _ => unreachable!("subcommand required"),
    }
    Ok(())
}

fn cmd_check(matches: &ArgMatches, args: &ArgMatches) -> anyhow::Result<()> {
    let engine = load_engine(matches)?;
    let linter = SchemaLinter::for_protocol(engine.protocol());
    let report = engine.check(Some(&PlainRenderer), Some(&linter))?;

    if report.is_empty() {
        println!("No warnings.");
        return Ok(());
    }
    for (category, warnings) in report.by_category() {
        println!("{category}:");
        for warning in warnings {
            println!("- {warning}");
        }
    }
    let total = report.total();
    report.into_result(args.get_flag("fail-on-warnings"))?;
    println!("{total} warnings.");
    Ok(())
}

fn cmd_complete_spec(matches: &ArgMatches, args: &ArgMatches) -> anyhow::Result<()> {
    let engine = load_engine(matches)?;
    let warn_only = args.get_flag("warn-only");

    let status = engine.validate_completion();
    if !status.missing_stages.is_empty() {
        let message = format!(
            "spec is not complete, missing stages: {}",
            status.missing_stages.join(", ")
        );
        if warn_only {
            eprintln!("warning: {message}");
        } else {
            bail!(message);
        }
    }
    if !status.missing_approvals.is_empty() {
        let pairs: Vec<String> = status
            .missing_approvals
            .iter()
            .map(|(stage, role)| format!("{stage}/{role}"))
            .collect();
        let message = format!("spec is not approved, missing approvals: {}", pairs.join(", "));
        if warn_only {
            eprintln!("warning: {message}");
        } else {
            bail!(message);
        }
    }
    if status.is_complete() {
        println!("All stages completed.");
    }

    if args.get_flag("archive") {
        let version = args
            .get_one::<String>("version")
            .cloned()
            .filter(|v| !v.is_empty())
            .or_else(|| {
                let v = engine.state().spec_version.clone();
                (!v.is_empty()).then_some(v)
            })
            .context("archive version is required (set --version or state.spec_version)")?;
        let tags: Vec<String> = args
            .get_many::<String>("tag")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        let notes = args.get_one::<String>("notes").map(String::as_str).unwrap_or_default();

        let layout = engine.layout().clone();
        let manager = SnapshotManager::new(layout.archives_dir(), layout);
        manager.create(&version, tags, notes)?;
        println!("Archived version {version}");
    }
    Ok(())
}

enum SnapshotKind {
    Archive,
    Track,
}

impl SnapshotKind {
    fn manager(&self, layout: WorkspaceLayout) -> SnapshotManager {
        let root = match self {
            SnapshotKind::Archive => layout.archives_dir(),
            SnapshotKind::Track => layout.tracks_dir(),
        };
        SnapshotManager::new(root, layout)
    }

    fn default_tag(&self) -> &'static str {
        match self {
            SnapshotKind::Archive => "archive",
            SnapshotKind::Track => "track",
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            SnapshotKind::Archive => "archive",
            SnapshotKind::Track => "track",
        }
    }
}

fn cmd_snapshot(
    _matches: &ArgMatches,
    args: &ArgMatches,
    kind: SnapshotKind,
) -> anyhow::Result<()> {
    let manager = kind.manager(discover_layout()?);
    match args.subcommand() {
        Some(("create", sub)) => {
            let name = name_arg(sub, &kind)?;
            let mut tags: Vec<String> = sub
                .get_many::<String>("tag")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            if tags.is_empty() {
                tags.push(kind.default_tag().to_string());
            }
            let notes = sub.get_one::<String>("notes").map(String::as_str).unwrap_or_default();
            manager.create(name, tags, notes)?;
            println!("Created {} {name}", kind.noun());
        }
        Some(("list", _)) => {
            for name in manager.list()? {
                println!("{name}");
            }
        }
        Some(("show", sub)) => {
            let name = name_arg(sub, &kind)?;
            let metadata = manager.metadata(name)?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Some(("restore", sub)) | Some(("switch", sub)) => {
            let name = name_arg(sub, &kind)?;
            manager.restore(name, sub.get_flag("force"))?;
            match kind {
                SnapshotKind::Archive => println!("Restored archive {name}"),
                SnapshotKind::Track => println!("Switched to track {name}"),
            }
        }
        Some(("diff", sub)) => {
            let left = sub.get_one::<String>("left").map(String::as_str).unwrap_or_default();
            let right = sub.get_one::<String>("right").map(String::as_str).unwrap_or_default();
            let diff = manager.compare(left, right)?;
            if diff.is_empty() {
                println!("No differences detected.");
                return Ok(());
            }
            print_diff_section("Added", &diff.added);
            print_diff_section("Removed", &diff.removed);
            print_diff_section("Changed", &diff.changed);
        }
        _ => unreachable!("subcommand required"),
    }
    Ok(())
}

fn name_arg<'a>(sub: &'a ArgMatches, kind: &SnapshotKind) -> anyhow::Result<&'a str> {
    let key = match kind {
        SnapshotKind::Archive => "version",
        SnapshotKind::Track => "name",
    };
    sub.get_one::<String>(key)
        .map(String::as_str)
        .with_context(|| format!("{} name is required", kind.noun()))
}

fn print_diff_section(label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{label}:");
    for item in items {
        println!("- {item}");
    }
}
