//! specboard - task boards and commit history for spec-driven projects
//!
//! Reads the markdown task artifacts under `specs/<feature>/` (and
//! `.worktrees/<name>/specs/<feature>/`), normalises them into lane-keyed
//! boards, and correlates tasks with git history.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`board`] - Board model, format detection, parsing, dependencies, mutations
//! - [`config`] - Project configuration loading
//! - [`engine`] - The [`SpecBoard`] facade hosts call into
//! - [`error`] - Custom error types and handling
//! - [`feature`] - Feature location and workspace scanning
//! - [`git`] - Commit correlation and untracked-commit detection
//! - [`review`] - Review decisions from activity logs
//! - [`testing`] - Testing infrastructure (mocks, fixtures)
//!
//! # Example
//!
//! ```rust,no_run
//! use specboard::{Lane, SpecBoard};
//!
//! let engine = SpecBoard::open(".")?;
//!
//! if let Some(board) = engine.board("001-auth") {
//!     for task in board.tasks(Lane::Doing) {
//!         println!("{} {}", task.id, task.title);
//!     }
//! }
//!
//! for commit in engine.untracked_commits(None, None) {
//!     println!("{} {}", commit.commit.short_hash, commit.commit.subject);
//! }
//! # Ok::<(), specboard::BoardError>(())
//! ```

pub mod board;
pub mod config;
pub mod engine;
pub mod error;
pub mod feature;
pub mod git;
pub mod review;
pub mod testing;

// Re-export commonly used types
pub use error::{BoardError, Result};

pub use board::{
    Board, BoardFormat, Dependency, Lane, LaneConflict, LaneCounts, Phase, Task, TaskDetail,
    TaskKind,
};
pub use config::{DashboardConfig, ProjectConfig, ProjectMode};
pub use engine::SpecBoard;
pub use feature::{Feature, FeatureCatalog, FeatureSummary, HotfixSummary, Workspace};
pub use git::{
    Commit, FileChange, GitClient, GitConfig, GitError, GitOperations, UntrackedCommit,
    UntrackedStats,
};
pub use review::{ReviewDecision, ReviewEntry};
pub use testing::MockGitOperations;
