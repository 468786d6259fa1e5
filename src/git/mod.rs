//! Commit history access.
//!
//! All history queries go through [`GitOperations`], which returns the raw
//! text of a handful of git commands. [`GitClient`] runs the real `git`
//! binary; `testing::MockGitOperations` serves canned output. Parsing of
//! that text lives next to the consumers in [`correlate`] and [`untracked`].

pub mod correlate;
pub mod migration;
pub mod untracked;

pub use correlate::CommitCorrelator;
pub use migration::MigrationLedger;
pub use untracked::{UntrackedCommit, UntrackedCommitDetector, UntrackedStats};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while querying git.
#[derive(Error, Debug)]
pub enum GitError {
    /// git is not installed or not in PATH.
    #[error("git unavailable: {0}")]
    Unavailable(String),

    /// The configured path is not inside a git work tree.
    #[error("not a git repository: {0}")]
    NotARepository(PathBuf),

    /// git exited with a failure status.
    #[error("git {operation} failed: {stderr}")]
    CommandFailed { operation: String, stderr: String },

    /// A ref or hash that git would read as an option or revision range.
    #[error("invalid revision '{0}'")]
    InvalidRevision(String),

    /// IO error while spawning git.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// Check if the query can be answered with an empty result instead.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::NotARepository(_) | Self::CommandFailed { .. }
        )
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the [`GitClient`].
#[derive(Debug, Clone)]
pub struct GitConfig {
    /// Working directory git runs in.
    pub repo_path: PathBuf,
    /// Path to the git binary.
    pub binary_path: PathBuf,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            repo_path: PathBuf::from("."),
            binary_path: PathBuf::from("git"),
        }
    }
}

impl GitConfig {
    /// Create a new config with the specified repository path.
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            ..Default::default()
        }
    }

    /// Set the path to the git binary.
    #[must_use]
    pub fn with_binary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary_path = path.into();
        self
    }
}

// ============================================================================
// Records
// ============================================================================

/// `git log` format: hash, subject, strict ISO committer date, author name,
/// separated by the ASCII unit separator so subjects may contain `|`.
pub const LOG_FORMAT: &str = "--format=%H%x1f%s%x1f%cI%x1f%an";

const FIELD_SEPARATOR: char = '\u{1f}';

/// A commit as listed by history queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub short_hash: String,
    pub subject: String,
    pub author: String,
    pub date: DateTime<FixedOffset>,
}

impl Commit {
    /// Parse one [`LOG_FORMAT`] line.
    #[must_use]
    pub fn from_log_line(line: &str) -> Option<Self> {
        let mut fields = line.splitn(4, FIELD_SEPARATOR);
        let hash = fields.next()?.trim();
        let subject = fields.next()?;
        let date = fields.next()?;
        let author = fields.next()?;

        if hash.is_empty() {
            return None;
        }
        let date = match DateTime::parse_from_rfc3339(date.trim()) {
            Ok(date) => date,
            Err(e) => {
                tracing::debug!(hash, error = %e, "skipping log line with unparsable date");
                return None;
            }
        };

        Some(Self {
            short_hash: short_hash(hash),
            hash: hash.to_string(),
            subject: subject.to_string(),
            author: author.trim_end().to_string(),
            date,
        })
    }
}

/// Every parsable commit in `git log` output, in output order.
#[must_use]
pub fn parse_log(output: &str) -> Vec<Commit> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(Commit::from_log_line)
        .collect()
}

/// First seven characters of a hash.
#[must_use]
pub fn short_hash(hash: &str) -> String {
    hash.chars().take(7).collect()
}

/// A path touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Short hash of the commit.
    pub commit: String,
    pub commit_hash: String,
    pub path: String,
    /// Source path of a rename or copy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_path: Option<String>,
    /// Single-letter status code (`A`, `M`, `D`, `R`, ...).
    pub action: String,
    pub date: DateTime<FixedOffset>,
    pub subject: String,
}

/// Whether `value` looks like an abbreviated or full object name.
#[must_use]
pub fn is_commit_hash(value: &str) -> bool {
    (4..=64).contains(&value.len()) && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Reject refs git would parse as an option or a revision range.
///
/// # Errors
///
/// Returns `GitError::InvalidRevision` for empty refs and refs starting with
/// `-` or containing `..` or whitespace.
pub fn validate_ref(value: &str) -> Result<(), GitError> {
    if value.is_empty()
        || value.starts_with('-')
        || value.contains("..")
        || value.chars().any(char::is_whitespace)
    {
        return Err(GitError::InvalidRevision(value.to_string()));
    }
    Ok(())
}

// ============================================================================
// Operations
// ============================================================================

/// Abstraction over the git commands the engine needs.
///
/// Each method returns the command's standard output verbatim.
pub trait GitOperations: Send + Sync {
    /// Whether the working directory is inside a git repository.
    fn is_repository(&self) -> bool;

    /// `git log --all` filtered to messages (subject or body) containing `needle`
    /// literally,
    /// in [`LOG_FORMAT`].
    ///
    /// # Errors
    ///
    /// Returns an error if git cannot run or exits unsuccessfully.
    fn search_log(&self, needle: &str) -> Result<String, GitError>;

    /// The newest `limit` commits reachable from `branch`, in [`LOG_FORMAT`].
    ///
    /// # Errors
    ///
    /// Returns an error if git cannot run or the branch does not resolve.
    fn recent_log(&self, branch: &str, limit: usize) -> Result<String, GitError>;

    /// `git show --name-status` for one commit, without the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit does not resolve.
    fn name_status(&self, commit: &str) -> Result<String, GitError>;

    /// Full `git show` patch for one commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit does not resolve.
    fn show(&self, commit: &str) -> Result<String, GitError>;

    /// `git show --stat` for one commit, without the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit does not resolve.
    fn stat(&self, commit: &str) -> Result<String, GitError>;
}

/// Runs the `git` binary as a subprocess.
///
/// Construction checks that the binary can be found; when it cannot, every
/// query reports [`GitError::Unavailable`].
#[derive(Debug, Clone)]
pub struct GitClient {
    config: GitConfig,
    available: bool,
}

impl GitClient {
    /// Create a new client with the given configuration.
    pub fn new(config: GitConfig) -> Self {
        let available = which::which(&config.binary_path).is_ok();
        if !available {
            tracing::debug!(binary = %config.binary_path.display(), "git binary not found");
        }
        Self { config, available }
    }

    /// Check if the git binary was found.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Get the client configuration.
    pub fn config(&self) -> &GitConfig {
        &self.config
    }

    fn run(&self, operation: &str, args: &[&str]) -> Result<String, GitError> {
        if !self.available {
            return Err(GitError::Unavailable(format!(
                "{} not found in PATH",
                self.config.binary_path.display()
            )));
        }

        let output = Command::new(&self.config.binary_path)
            .current_dir(&self.config.repo_path)
            .args(args)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::CommandFailed {
                operation: operation.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl GitOperations for GitClient {
    fn is_repository(&self) -> bool {
        self.run("rev-parse", &["rev-parse", "--git-dir"]).is_ok()
    }

    fn search_log(&self, needle: &str) -> Result<String, GitError> {
        let grep = format!("--grep={needle}");
        self.run(
            "log",
            &["log", "--all", "--fixed-strings", &grep, LOG_FORMAT],
        )
    }

    fn recent_log(&self, branch: &str, limit: usize) -> Result<String, GitError> {
        validate_ref(branch)?;
        let max_count = format!("--max-count={limit}");
        self.run("log", &["log", &max_count, LOG_FORMAT, branch, "--"])
    }

    fn name_status(&self, commit: &str) -> Result<String, GitError> {
        validate_ref(commit)?;
        self.run("show", &["show", "--name-status", "--format=", commit, "--"])
    }

    fn show(&self, commit: &str) -> Result<String, GitError> {
        validate_ref(commit)?;
        self.run("show", &["show", commit, "--"])
    }

    fn stat(&self, commit: &str) -> Result<String, GitError> {
        validate_ref(commit)?;
        self.run("show", &["show", "--stat=1000", "--format=", commit, "--"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Log Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_log_line() {
        let line = "0123456789abcdef0123456789abcdef01234567\u{1f}[WP01] add | pipe\u{1f}2024-03-01T10:00:00+09:00\u{1f}Alice Kim";
        let commit = Commit::from_log_line(line).unwrap();
        assert_eq!(commit.short_hash, "0123456");
        assert_eq!(commit.subject, "[WP01] add | pipe");
        assert_eq!(commit.author, "Alice Kim");
        assert_eq!(commit.date.to_rfc3339(), "2024-03-01T10:00:00+09:00");
    }

    #[test]
    fn test_parse_log_skips_malformed_lines() {
        let output = "abc\u{1f}only two\n\
                      def\u{1f}bad date\u{1f}yesterday\u{1f}Bob\n\
                      \n\
                      fedcba9\u{1f}ok\u{1f}2024-01-01T00:00:00Z\u{1f}Bob\n";
        let commits = parse_log(output);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].hash, "fedcba9");
    }

    // =========================================================================
    // Validation Tests
    // =========================================================================

    #[test]
    fn test_validate_ref() {
        assert!(validate_ref("HEAD").is_ok());
        assert!(validate_ref("feature/board").is_ok());
        assert!(validate_ref("--output=/tmp/x").is_err());
        assert!(validate_ref("main..HEAD").is_err());
        assert!(validate_ref("").is_err());
    }

    #[test]
    fn test_is_commit_hash() {
        assert!(is_commit_hash("abc1234"));
        assert!(!is_commit_hash("abc"));
        assert!(!is_commit_hash("HEAD"));
    }

    #[test]
    fn test_error_recoverable() {
        assert!(GitError::Unavailable("x".into()).is_recoverable());
        assert!(!GitError::InvalidRevision("-x".into()).is_recoverable());
    }

    // =========================================================================
    // Client Tests
    // =========================================================================

    #[test]
    fn test_missing_binary_is_unavailable() {
        let client = GitClient::new(GitConfig::new(".").with_binary_path("definitely-not-git-xyz"));
        assert!(!client.is_available());
        assert!(!client.is_repository());
        assert!(matches!(client.search_log("WP01"), Err(GitError::Unavailable(_))));
    }
}
