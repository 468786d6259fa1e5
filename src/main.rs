//! specboard - task boards and commit history for spec-driven projects
//!
//! Every subcommand prints JSON to stdout; diagnostics go to stderr.

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use specboard::{BoardError, Lane, ProjectConfig, SpecBoard};

#[derive(Parser)]
#[command(name = "specboard")]
#[command(version)]
#[command(about = "Task boards and commit history for spec-driven projects", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Upper bound on each query in milliseconds (overrides config)
    #[arg(long, global = true, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Parse boards fresh instead of using the in-memory cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List features with artifact and lane summaries
    Features,

    /// Show the board of a feature
    Board {
        /// Feature id (directory name under specs/)
        feature: String,
    },

    /// Show one task with content and dependencies
    Task {
        feature: String,
        task: String,

        /// Lane to look in first
        #[arg(long)]
        lane: Option<Lane>,
    },

    /// Print a file from a feature directory
    Artifact {
        feature: String,

        /// Path relative to the feature directory (e.g. plan.md)
        name: String,
    },

    /// List commits mentioning a task
    Commits { task: String },

    /// List files changed by a task's commits
    Files { task: String },

    /// Show the patch of one commit
    Diff { commit: String },

    /// List recent commits that reference no work package
    Untracked {
        /// Branch to scan (defaults to config, then HEAD)
        #[arg(short, long)]
        branch: Option<String>,

        /// Number of recent commits to scan
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show review decisions from a task's activity log
    Reviews { feature: String, task: String },

    /// Create a task in the planned lane
    Create {
        feature: String,

        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Move a work package to another lane
    Move {
        feature: String,
        task: String,

        /// planned, doing, for_review or done
        lane: Lane,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "specboard=debug,info"
    } else {
        "specboard=info,warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Resolve project path
    let project_path = cli.project.canonicalize().unwrap_or(cli.project.clone());

    if !project_path.exists() {
        fail(
            &format!("Project directory does not exist: {}", project_path.display()),
            1,
        );
    }

    let config = match ProjectConfig::load(&project_path) {
        Ok(config) => config,
        Err(e) => fail(&e.to_string(), e.exit_code()),
    };
    let timeout = Duration::from_millis(cli.timeout_ms.unwrap_or(config.dashboard.git_timeout_ms));
    let engine = Arc::new(SpecBoard::with_config(&project_path, config).with_cache(!cli.no_cache));

    match cli.command {
        Commands::Features => {
            let catalog = run_blocking(&engine, timeout, "features", |e| e.features()).await;
            print_json(&catalog)?;
        }

        Commands::Board { feature } => {
            let id = feature.clone();
            let board = run_blocking(&engine, timeout, "board", move |e| e.board(&id)).await;
            match board {
                Some(board) => print_json(&board)?,
                None => fail(&BoardError::feature_not_found(feature).to_string(), 1),
            }
        }

        Commands::Task {
            feature,
            task,
            lane,
        } => {
            let (f, t) = (feature.clone(), task.clone());
            let detail =
                run_blocking(&engine, timeout, "task", move |e| e.task_detail(&f, &t, lane)).await;
            match detail {
                Some(detail) => print_json(&detail)?,
                None => fail(&BoardError::task_not_found(feature, task).to_string(), 1),
            }
        }

        Commands::Artifact { feature, name } => {
            let (f, n) = (feature.clone(), name.clone());
            let content =
                run_blocking(&engine, timeout, "artifact", move |e| e.artifact(&f, &n)).await;
            match content {
                Some(content) => print_json(&serde_json::json!({
                    "feature": feature,
                    "name": name,
                    "content": content,
                }))?,
                None => fail(&format!("Artifact not found: {feature}/{name}"), 1),
            }
        }

        Commands::Commits { task } => {
            let commits =
                run_blocking(&engine, timeout, "commits", move |e| e.task_commits(&task)).await;
            print_json(&commits)?;
        }

        Commands::Files { task } => {
            let files = run_blocking(&engine, timeout, "files", move |e| e.task_files(&task)).await;
            print_json(&files)?;
        }

        Commands::Diff { commit } => {
            let sha = commit.clone();
            let diff = run_blocking(&engine, timeout, "diff", move |e| e.commit_diff(&sha)).await;
            match diff {
                Some(diff) => print_json(&serde_json::json!({
                    "commit": commit,
                    "diff": diff,
                }))?,
                None => fail(&format!("Commit not found: {commit}"), 1),
            }
        }

        Commands::Untracked { branch, limit } => {
            let commits = run_blocking(&engine, timeout, "untracked", move |e| {
                e.untracked_commits(branch.as_deref(), limit)
            })
            .await;
            print_json(&commits)?;
        }

        Commands::Reviews { feature, task } => {
            let reviews = run_blocking(&engine, timeout, "reviews", move |e| {
                e.task_reviews(&feature, &task)
            })
            .await;
            print_json(&reviews)?;
        }

        Commands::Create {
            feature,
            title,
            description,
        } => {
            let result = run_blocking(&engine, timeout, "create", move |e| {
                e.create_task(&feature, &title, &description)
            })
            .await;
            match result {
                Ok(task) => print_json(&task)?,
                Err(e) => fail(&e.to_string(), e.exit_code()),
            }
        }

        Commands::Move {
            feature,
            task,
            lane,
        } => {
            let result = run_blocking(&engine, timeout, "move", move |e| {
                e.move_task(&feature, &task, lane)
            })
            .await;
            match result {
                Ok(task) => print_json(&task)?,
                Err(e) => fail(&e.to_string(), e.exit_code()),
            }
        }
    }

    Ok(())
}

/// Run an engine call on a blocking thread, bounded by `timeout`.
///
/// A stalled git subprocess cannot be cancelled, so on timeout the process
/// exits instead of waiting for the blocking thread.
async fn run_blocking<T, F>(engine: &Arc<SpecBoard>, timeout: Duration, label: &str, call: F) -> T
where
    F: FnOnce(&SpecBoard) -> T + Send + 'static,
    T: Send + 'static,
{
    let engine = Arc::clone(engine);
    let query = tokio::task::spawn_blocking(move || call(&engine));

    match tokio::time::timeout(timeout, query).await {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => fail(&format!("{label} panicked: {e}"), 1),
        Err(_elapsed) => fail(
            &format!("{label} timed out after {}ms", timeout.as_millis()),
            1,
        ),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fail(message: &str, code: i32) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), message);
    std::process::exit(code);
}
