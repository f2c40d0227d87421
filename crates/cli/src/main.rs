//! gg command-line tool.
//!
//! Partitions the working tree's modified files across logical PR branches
//! and keeps one commit per branch in step with the assignment file.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use git2::Oid;
use tracing_subscriber::EnvFilter;

use gg_core::config::{GgConfig, CONFIG_FILE_NAME};
use gg_core::conflict::SyncState;
use gg_core::{BranchOutcome, GitClient, PullOutcome, ReconcileReport, SyncEngine};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Manage logical PR branches carved out of one working tree.
#[derive(Parser, Debug)]
#[command(name = "gg", version, about = "Split one working tree into per-PR branches")]
struct Cli {
    /// Working tree to operate on (default: discovered from the current directory).
    #[arg(short = 'C', long = "repo", global = true)]
    repo: Option<PathBuf>,

    /// Path to the TOML configuration file (default: `<repo>/.gg.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive the branch assignment from history and write it (no commits).
    #[command(name = "update-branch-map", visible_alias = "u")]
    UpdateBranchMap,

    /// Commit the persisted assignment, one commit per changed branch.
    #[command(name = "commit-all", visible_alias = "c")]
    CommitAll,

    /// Push every local branch to the remote.
    #[command(name = "push-all")]
    PushAll,

    /// Pull the mainline and replay local edits on top of it.
    Pull,

    /// Finish a conflicted pull once the files are fixed.
    Resolve,

    /// Assign one file to a branch (no commits).
    #[command(name = "set-branch")]
    SetBranch {
        /// File path, relative to the working-tree root.
        #[arg(short, long)]
        file: String,

        /// Target branch.
        #[arg(short, long)]
        branch: String,
    },

    /// Show the assignment, unclaimed files and sync state.
    Status {
        /// Print `branch<TAB>path` lines to stdout.
        #[arg(long)]
        porcelain: bool,
    },

    /// Write a default configuration file.
    Init,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let start = match &cli.repo {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("failed to read the current directory")?,
    };
    let client = GitClient::discover(&start).context("failed to open git repository")?;
    let root = client.workdir().to_path_buf();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| root.join(CONFIG_FILE_NAME));

    let verbose = cli.verbose;
    let open_engine = || -> Result<Engine> {
        let config = load_config(&config_path)?;
        init_logging(verbose, &config.log_level);
        Ok(SyncEngine::new(client, config, root))
    };

    match cli.command {
        Commands::Init => {
            init_logging(verbose, "warn");
            cmd_init(&config_path)
        }
        Commands::UpdateBranchMap => cmd_update_branch_map(&open_engine()?),
        Commands::CommitAll => cmd_commit_all(&open_engine()?),
        Commands::PushAll => cmd_push_all(&open_engine()?),
        Commands::Pull => cmd_pull(&open_engine()?),
        Commands::Resolve => cmd_resolve(&open_engine()?),
        Commands::SetBranch { file, branch } => cmd_set_branch(&open_engine()?, &file, &branch),
        Commands::Status { porcelain } => cmd_status(&open_engine()?, porcelain),
    }
}

/// `GG_LOG` wins; otherwise `--verbose` or the configured level.
fn init_logging(verbose: bool, configured: &str) {
    let filter = match std::env::var("GG_LOG") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) if verbose => EnvFilter::new("debug"),
        Err(_) => EnvFilter::new(configured),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn load_config(path: &Path) -> Result<GgConfig> {
    GgConfig::load_and_validate(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

type Engine = SyncEngine<GitClient>;

fn cmd_init(output: &Path) -> Result<()> {
    GgConfig::write_template(output).context("failed to write configuration")?;
    eprintln!(
        "{}",
        style::success(&format!("Default configuration written to {}", output.display()))
    );
    Ok(())
}

fn cmd_update_branch_map(engine: &Engine) -> Result<()> {
    let assignment = engine
        .update_branch_map()
        .context("failed to update the branch map")?;
    eprintln!(
        "{}",
        style::success(&format!(
            "Wrote {} ({} branches)",
            engine.store().path().display(),
            assignment.len()
        ))
    );
    Ok(())
}

fn cmd_commit_all(engine: &Engine) -> Result<()> {
    let report = engine.commit_all().context("commit-all failed")?;
    print_report(&report);
    Ok(())
}

fn cmd_push_all(engine: &Engine) -> Result<()> {
    let pushed = engine.push_all().context("push-all failed")?;
    for branch in &pushed {
        eprintln!("  {} {}", style::dim("pushed"), style::branch(branch));
    }
    eprintln!(
        "{}",
        style::success(&format!(
            "Pushed {} branches to {}",
            pushed.len(),
            engine.config().remote
        ))
    );
    Ok(())
}

fn cmd_pull(engine: &Engine) -> Result<()> {
    match engine.pull().context("pull failed")? {
        PullOutcome::Merged {
            before,
            after,
            report,
        } => {
            print_merge_base(before, after);
            print_report(&report);
        }
        PullOutcome::Conflicted {
            before,
            after,
            marker,
        } => {
            print_merge_base(before, after);
            for line in &marker.conflicts {
                eprintln!("  {}", line);
            }
            eprintln!(
                "{}",
                style::warn(&format!(
                    "{} conflicts recorded in {}. Fix them, then run `gg resolve`.",
                    marker.conflicts.len(),
                    engine.conflicts().path().display()
                ))
            );
        }
    }
    Ok(())
}

fn cmd_resolve(engine: &Engine) -> Result<()> {
    let report = engine.resolve().context("resolve failed")?;
    print_report(&report);
    Ok(())
}

fn cmd_set_branch(engine: &Engine, file: &str, branch: &str) -> Result<()> {
    engine
        .set_branch(file, branch)
        .with_context(|| format!("failed to assign '{}' to '{}'", file, branch))?;
    eprintln!(
        "{}",
        style::success(&format!("{} -> {}", file, style::branch(branch)))
    );
    Ok(())
}

fn cmd_status(engine: &Engine, porcelain: bool) -> Result<()> {
    let status = engine.status().context("failed to read status")?;
    let catch_all = &engine.config().catch_all;

    if porcelain {
        if let Some(assignment) = &status.assignment {
            for (branch, files) in assignment.iter() {
                if branch == catch_all.as_str() {
                    continue;
                }
                for file in files {
                    println!("{}\t{}", branch, file);
                }
            }
        }
        for file in &status.unclaimed {
            println!("{}\t{}", catch_all, file);
        }
        return Ok(());
    }

    match &status.assignment {
        Some(assignment) => {
            for (branch, files) in assignment.iter() {
                if branch == catch_all.as_str() {
                    continue;
                }
                eprintln!("{}", style::branch(branch));
                for file in files {
                    eprintln!("  {}", file);
                }
            }
        }
        None => eprintln!(
            "{}",
            style::warn(&format!(
                "{} does not exist; run `gg update-branch-map`",
                engine.store().path().display()
            ))
        ),
    }

    eprintln!("{}", style::header(catch_all));
    if status.unclaimed.is_empty() {
        eprintln!("  {}", style::dim("(none)"));
    }
    for file in &status.unclaimed {
        eprintln!("  {}", file);
    }

    eprintln!();
    match &status.state {
        SyncState::Clean => eprintln!("{}", style::state_clean()),
        SyncState::ConflictPending(marker) => {
            eprintln!(
                "{} {}",
                style::state_conflict(),
                style::dim(&format!("(base {})", marker.merge_base))
            );
            for line in &marker.conflicts {
                eprintln!("  {}", line);
            }
        }
    }
    Ok(())
}

fn print_merge_base(before: Oid, after: Oid) {
    eprintln!(
        "Merge-base: {} -> {}",
        style::commit(&before.to_string()),
        style::commit(&after.to_string())
    );
}

fn print_report(report: &ReconcileReport) {
    for outcome in &report.outcomes {
        match outcome {
            BranchOutcome::Skipped { branch, created } => {
                let note = if *created { ", created" } else { "" };
                eprintln!(
                    "  {} {}",
                    style::branch(branch),
                    style::dim(&format!("skipped, no new files to update{}", note))
                );
            }
            BranchOutcome::Committed {
                branch,
                created,
                commit,
                files,
                changed,
                removed,
            } => {
                let label = if *created { "created" } else { "committed" };
                eprintln!(
                    "  {} {} {}",
                    style::branch(branch),
                    style::dim(label),
                    style::commit(&commit.to_string())
                );
                eprintln!("    files:    {}", files.join(", "));
                if !changed.is_empty() {
                    eprintln!("    modified: {}", changed.join(", "));
                }
                if !removed.is_empty() {
                    eprintln!("    removed:  {}", removed.join(", "));
                }
            }
        }
    }
    eprintln!(
        "{}",
        style::success(&format!(
            "{} committed, {} skipped",
            report.committed_count(),
            report.skipped_count()
        ))
    );
}
