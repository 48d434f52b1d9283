// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! atkins — a local task/CI runner. The binary only wires flags onto the
//! Runner Entry in `atkins-engine`; the resolve/schedule/execute logic all
//! lives there.

mod color;
mod discovery;
mod display;
mod git;
mod report;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use atkins_core::{EventLogger, EventSink, IdGen, NullEventSink, Pipeline, RunMetadata, UuidIdGen};
use atkins_engine::{run_target, RunMode, RunnerConfig};
use atkins_exec::{ExecutorDefaults, OsProcessExecutor, ProcessExecutor};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "atkins", version, about = "A local task/CI pipeline runner")]
struct Cli {
    /// Change to this directory before doing anything.
    #[arg(short = 'C', long = "dir", global = true, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Override the discovered skills directory.
    #[arg(long = "skills-dir", global = true, value_name = "DIR")]
    skills_dir: Option<PathBuf>,

    /// Raise the default log level to `debug` (overridden by `RUST_LOG` if set).
    #[arg(long, global = true)]
    debug: bool,

    /// Write the structured run document to this path.
    #[arg(long = "log-file", global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a job and its dependency chain.
    Run {
        /// `<job>`, `<skill>:<job>`, `:<job>`, `:<skill>:<job>`, or a
        /// fuzzy substring. Defaults to the pipeline's
        /// `default` job.
        target: Option<String>,
    },
    /// Resolve a target and its dependency chain without running anything.
    Lint {
        target: Option<String>,
    },
    /// List jobs: a target's resolved chain, or every pipeline's catalog
    /// when no target is given.
    List {
        target: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{}", color::red(&format!("ERROR: {e:#}")));
        std::process::exit(exit_code_for(&e));
    }
}

/// An error carrying a process exit code, so `main` can propagate a
/// subprocess's own exit code through `anyhow::Error`.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct ExitError {
    message: String,
    code: i32,
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ExitError>().map_or(1, |e| e.code)
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(dir) = &cli.dir {
        let canonical = std::fs::canonicalize(dir)
            .with_context(|| format!("cannot change to directory '{}'", dir.display()))?;
        std::env::set_current_dir(&canonical)
            .with_context(|| format!("cannot change to directory '{}'", canonical.display()))?;
    }

    let cwd = std::env::current_dir().context("cannot read current directory")?;
    let pipeline_file = discovery::find_pipeline_file(&cwd).with_context(|| {
        format!(
            "no pipeline file found in '{}' or any parent directory",
            cwd.display()
        )
    })?;
    let project_root = discovery::project_root(&pipeline_file);

    let pipelines = load_pipelines(&pipeline_file, &project_root, cli.skills_dir.as_deref())?;

    let target = match &cli.command {
        Commands::Run { target } | Commands::Lint { target } | Commands::List { target } => {
            target.clone()
        }
    };

    if matches!(cli.command, Commands::List { .. }) && target.is_none() {
        print_catalog(&pipelines);
        return Ok(());
    }

    let executor: Arc<dyn ProcessExecutor> = Arc::new(OsProcessExecutor::new());

    let metadata = RunMetadata {
        source_file: Some(pipeline_file.clone()),
        module_path: Some(project_root.display().to_string()),
        git_info: git::capture(Some(&project_root)),
        ..RunMetadata::new(UuidIdGen.next(), pipelines[0].name.clone())
    };
    let logger = Arc::new(EventLogger::new(metadata));
    let event_sink: Arc<dyn EventSink> = if cli.log_file.is_some() {
        Arc::clone(&logger) as Arc<dyn EventSink>
    } else {
        Arc::new(NullEventSink)
    };

    let config = RunnerConfig {
        executor,
        event_sink,
        defaults: ExecutorDefaults::default(),
        cwd: Some(project_root.clone()),
        source_file: Some(pipeline_file.clone()),
    };

    let mode = match &cli.command {
        Commands::Run { .. } => RunMode::Run,
        Commands::Lint { .. } => RunMode::Lint,
        Commands::List { .. } => RunMode::List,
    };

    let outcome = run_target(pipelines, target.as_deref(), mode, config)
        .await
        .context("failed to run pipeline")?;

    match &cli.command {
        Commands::Lint { .. } => {
            println!(
                "{}",
                color::green(&format!(
                    "OK: {} resolves to {} job(s)",
                    outcome.pipeline_name,
                    outcome.jobs.len()
                ))
            );
            for job in &outcome.jobs {
                println!("  {job}");
            }
        }
        Commands::List { .. } => {
            println!("{}:", outcome.pipeline_name);
            for job in &outcome.jobs {
                println!("  {job}");
            }
        }
        Commands::Run { .. } => {
            let is_tty = std::io::stdout().is_terminal();
            if let Some(tree) = &outcome.tree {
                let frame = display::render_tree(tree);
                print!("{}", display::render_frame(&frame, is_tty));
            }

            if let Some(path) = &cli.log_file {
                write_log(&logger, &outcome, path)?;
            }

            if let Some(err) = &outcome.error {
                let output = match err {
                    atkins_core::AtkinsError::Exec(e) => e.output.clone(),
                    other => other.to_string(),
                };
                eprint!(
                    "{}",
                    display::failure_footer(&outcome.pipeline_name, outcome.exit_code(), &output)
                );
                bail!(ExitError {
                    message: err.to_string(),
                    code: outcome.exit_code(),
                });
            }

            if let Some(tree) = &outcome.tree {
                let (passed, total) = display::count_passed_steps(tree);
                println!("{}", display::success_footer(passed, total));
            }
        }
    }

    Ok(())
}

/// Loads the main pipeline (`id` empty) and every discovered skill
/// pipeline (`id` from filename). Adopted policy: always load discovered
/// skill files, filtering happens via `when.files` at run time.
fn load_pipelines(
    main_file: &std::path::Path,
    project_root: &std::path::Path,
    skills_dir_override: Option<&std::path::Path>,
) -> Result<Arc<[Pipeline]>> {
    let main = atkins_engine::load_pipeline_file(main_file, "")
        .with_context(|| format!("failed to load pipeline '{}'", main_file.display()))?;

    let mut pipelines = vec![main];

    let skill_files = match skills_dir_override {
        Some(dir) => {
            let mut files: Vec<_> = std::fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .filter_map(|e| e.ok())
                        .map(|e| e.path())
                        .filter(|p| {
                            p.extension()
                                .and_then(|e| e.to_str())
                                .is_some_and(|ext| ext == "yml" || ext == "yaml")
                        })
                        .collect()
                })
                .unwrap_or_default();
            files.sort();
            files
        }
        None => discovery::discover_skill_files(project_root),
    };

    for path in skill_files {
        let id = discovery::skill_id(&path);
        let skill = atkins_engine::load_pipeline_file(&path, &id)
            .with_context(|| format!("failed to load skill pipeline '{}'", path.display()))?;
        pipelines.push(skill);
    }

    if pipelines.is_empty() {
        bail!("no pipelines loaded");
    }
    Ok(pipelines.into())
}

fn print_catalog(pipelines: &[Pipeline]) {
    for pipeline in pipelines {
        let label = if pipeline.id.is_empty() {
            pipeline.name.clone()
        } else {
            format!("{} ({})", pipeline.name, pipeline.id)
        };
        println!("{}:", color::muted(&label));
        for job in pipeline.jobs().values() {
            let aliases = if job.aliases.is_empty() {
                String::new()
            } else {
                format!(" [{}]", job.aliases.join(", "))
            };
            let desc = if job.desc.is_empty() {
                String::new()
            } else {
                format!(" - {}", job.desc)
            };
            println!("  {}{aliases}{desc}", job.name);
        }
    }
}

fn write_log(logger: &Arc<EventLogger>, outcome: &atkins_engine::RunOutcome, path: &std::path::Path) -> Result<()> {
    let Some(state) = &outcome.tree else {
        return Ok(());
    };
    let doc = report::build(
        &logger.metadata,
        state,
        &logger.events(),
        outcome.summary.as_ref(),
    );
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create log file '{}'", path.display()))?;
    serde_json::to_writer_pretty(file, &doc).context("failed to write log file")?;
    Ok(())
}
