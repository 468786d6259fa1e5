//! Detection of recent commits that reference no work package.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::{parse_log, validate_ref, Commit, GitOperations, MigrationLedger};

/// Work-package reference in a subject: `WP04`, `WP04.3`, `[WP04.3]`,
/// `feat: wp-04`.
static WORK_PACKAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\[?WP-?\d+(?:\.\d+)?\]?").expect("work package pattern")
});

const MERGE_PREFIX: &str = "Merge";
const CI_SKIP_MARKERS: [&str; 2] = ["[skip ci]", "[ci skip]"];

/// Why a commit was left out of the untracked report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    TaskReference,
    Merge,
    CiSkip,
    Migrated,
}

/// Change totals of one commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UntrackedStats {
    pub files_changed: usize,
    pub insertions: u64,
    pub deletions: u64,
}

/// A commit with no work-package reference, plus what it changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UntrackedCommit {
    #[serde(flatten)]
    pub commit: Commit,
    pub files: Vec<String>,
    pub stats: UntrackedStats,
}

/// Scans recent history for commits no task accounts for.
pub struct UntrackedCommitDetector<'a, G: GitOperations + ?Sized> {
    git: &'a G,
    ledger: MigrationLedger,
}

impl<'a, G: GitOperations + ?Sized> UntrackedCommitDetector<'a, G> {
    pub fn new(git: &'a G, ledger: MigrationLedger) -> Self {
        Self { git, ledger }
    }

    /// Reason `commit` is excluded, or `None` if it is untracked.
    #[must_use]
    pub fn exclusion(&self, commit: &Commit) -> Option<Exclusion> {
        let subject = &commit.subject;
        if WORK_PACKAGE_RE.is_match(subject) {
            Some(Exclusion::TaskReference)
        } else if subject.starts_with(MERGE_PREFIX) {
            Some(Exclusion::Merge)
        } else if CI_SKIP_MARKERS.iter().any(|marker| subject.contains(marker)) {
            Some(Exclusion::CiSkip)
        } else if self.ledger.contains(&commit.hash) {
            Some(Exclusion::Migrated)
        } else {
            None
        }
    }

    /// Untracked commits among the newest `limit` on `branch`, newest first.
    ///
    /// Returns an empty list when git is unavailable or the branch does not
    /// resolve. A commit whose stat query fails is kept with empty stats.
    #[must_use]
    pub fn scan(&self, branch: &str, limit: usize) -> Vec<UntrackedCommit> {
        if let Err(e) = validate_ref(branch) {
            tracing::warn!(error = %e, "rejecting branch");
            return Vec::new();
        }
        if limit == 0 || !self.git.is_repository() {
            return Vec::new();
        }

        let output = match self.git.recent_log(branch, limit) {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(branch, error = %e, "recent history unavailable");
                return Vec::new();
            }
        };

        parse_log(&output)
            .into_iter()
            .filter(|commit| match self.exclusion(commit) {
                Some(reason) => {
                    tracing::debug!(commit = %commit.short_hash, ?reason, "excluded from untracked");
                    false
                }
                None => true,
            })
            .map(|commit| {
                let (files, stats) = match self.git.stat(&commit.hash) {
                    Ok(stat) => parse_stat(&stat),
                    Err(e) => {
                        tracing::debug!(commit = %commit.short_hash, error = %e, "stat unavailable");
                        (Vec::new(), UntrackedStats::default())
                    }
                };
                UntrackedCommit {
                    commit,
                    files,
                    stats,
                }
            })
            .collect()
    }
}

/// Files and totals from `git show --stat` output.
///
/// Lines containing `|` name a changed file. The summary line (`N files
/// changed, X insertions(+), Y deletions(-)`) is read positionally: the
/// second number is insertions and the third deletions. git drops a term
/// whose count is zero, so a deletions-only commit reports its deletions as
/// insertions. Known limitation, kept as is.
#[must_use]
pub fn parse_stat(output: &str) -> (Vec<String>, UntrackedStats) {
    let mut files = Vec::new();
    let mut stats = UntrackedStats::default();

    for line in output.lines() {
        if let Some((path, _)) = line.split_once('|') {
            let path = path.trim();
            if !path.is_empty() {
                files.push(path.to_string());
            }
        } else if line.contains("file") && line.contains("changed") {
            let numbers: Vec<u64> = line
                .split(|c: char| !c.is_ascii_digit())
                .filter_map(|n| n.parse().ok())
                .collect();
            if numbers.len() >= 2 {
                stats.insertions = numbers[1];
                stats.deletions = numbers.get(2).copied().unwrap_or(0);
            }
        }
    }

    stats.files_changed = files.len();
    (files, stats)
}
