//! Mock implementations of testing traits.
//!
//! These mocks provide controllable test doubles for git, enabling
//! deterministic unit tests without a repository.

use crate::git::{GitError, GitOperations};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct MockCommit {
    hash: String,
    subject: String,
    body: String,
    date: String,
    author: String,
}

impl MockCommit {
    fn log_line(&self) -> String {
        format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}\n",
            self.hash, self.subject, self.date, self.author
        )
    }
}

/// Mock implementation of git operations.
///
/// Commits are listed newest first in the order they are added. Per-commit
/// outputs are looked up by full hash or any unique prefix of it.
///
/// # Example
///
/// ```
/// use specboard::git::GitOperations;
/// use specboard::testing::MockGitOperations;
///
/// let git = MockGitOperations::new()
///     .with_commit("abc1234def", "[WP01] add parser", "2024-01-01T00:00:00Z", "alice")
///     .with_diff("abc1234def", "diff --git a/x b/x\n");
///
/// assert!(git.search_log("WP01").unwrap().contains("add parser"));
/// assert!(git.show("abc1234").is_ok());
/// ```
#[derive(Debug)]
pub struct MockGitOperations {
    repository: bool,
    commits: Vec<MockCommit>,
    name_status: HashMap<String, String>,
    diffs: HashMap<String, String>,
    stats: HashMap<String, String>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockGitOperations {
    fn default() -> Self {
        Self {
            repository: true,
            commits: Vec::new(),
            name_status: HashMap::new(),
            diffs: HashMap::new(),
            stats: HashMap::new(),
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockGitOperations {
    /// Create a new mock inside a repository with no commits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the mock reports being inside a repository.
    #[must_use]
    pub fn with_repository(mut self, repository: bool) -> Self {
        self.repository = repository;
        self
    }

    /// Append a commit; `date` is written to the log verbatim.
    #[must_use]
    pub fn with_commit(mut self, hash: &str, subject: &str, date: &str, author: &str) -> Self {
        self.commits.push(MockCommit {
            hash: hash.to_string(),
            subject: subject.to_string(),
            body: String::new(),
            date: date.to_string(),
            author: author.to_string(),
        });
        self
    }

    /// Set the message body of a commit added earlier.
    ///
    /// The body is only searched, never printed, matching `%s` in the log
    /// format.
    #[must_use]
    pub fn with_body(mut self, hash: &str, body: &str) -> Self {
        if let Some(commit) = self.commits.iter_mut().find(|c| c.hash == hash) {
            commit.body = body.to_string();
        }
        self
    }

    /// Set the `--name-status` output for a commit.
    #[must_use]
    pub fn with_name_status(mut self, hash: &str, output: &str) -> Self {
        self.name_status.insert(hash.to_string(), output.to_string());
        self
    }

    /// Set the patch returned by `show` for a commit.
    #[must_use]
    pub fn with_diff(mut self, hash: &str, diff: &str) -> Self {
        self.diffs.insert(hash.to_string(), diff.to_string());
        self
    }

    /// Set the `--stat` output for a commit.
    #[must_use]
    pub fn with_stat(mut self, hash: &str, output: &str) -> Self {
        self.stats.insert(hash.to_string(), output.to_string());
        self
    }

    /// Make one operation (`search_log`, `recent_log`, `name_status`,
    /// `show`, `stat`) fail.
    #[must_use]
    pub fn with_failure(mut self, operation: &str) -> Self {
        self.failing.insert(operation.to_string());
        self
    }

    /// Operations invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, operation: &str) -> Result<(), GitError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(operation.to_string());
        }
        if self.failing.contains(operation) {
            return Err(GitError::CommandFailed {
                operation: operation.to_string(),
                stderr: "mock failure".to_string(),
            });
        }
        Ok(())
    }

    fn lookup(
        &self,
        operation: &str,
        table: &HashMap<String, String>,
        commit: &str,
    ) -> Result<String, GitError> {
        self.record(operation)?;
        let mut matches = table.iter().filter(|(hash, _)| hash.starts_with(commit));
        match (matches.next(), matches.next()) {
            (Some((_, output)), None) => Ok(output.clone()),
            _ => Err(GitError::CommandFailed {
                operation: operation.to_string(),
                stderr: format!("fatal: bad object {commit}"),
            }),
        }
    }
}

impl GitOperations for MockGitOperations {
    fn is_repository(&self) -> bool {
        self.repository
    }

    fn search_log(&self, needle: &str) -> Result<String, GitError> {
        self.record("search_log")?;
        Ok(self
            .commits
            .iter()
            .filter(|c| c.subject.contains(needle) || c.body.contains(needle))
            .map(MockCommit::log_line)
            .collect())
    }

    fn recent_log(&self, _branch: &str, limit: usize) -> Result<String, GitError> {
        self.record("recent_log")?;
        Ok(self
            .commits
            .iter()
            .take(limit)
            .map(MockCommit::log_line)
            .collect())
    }

    fn name_status(&self, commit: &str) -> Result<String, GitError> {
        self.lookup("name_status", &self.name_status, commit)
    }

    fn show(&self, commit: &str) -> Result<String, GitError> {
        self.lookup("show", &self.diffs, commit)
    }

    fn stat(&self, commit: &str) -> Result<String, GitError> {
        self.lookup("stat", &self.stats, commit)
    }
}
