//! Task to commit correlation.

use super::{parse_log, validate_ref, Commit, FileChange, GitOperations};

/// Maps task ids to the commits that mention them.
///
/// Every query degrades to an empty result when git is missing, the
/// directory is not a repository, or a command fails.
pub struct CommitCorrelator<'a, G: GitOperations + ?Sized> {
    git: &'a G,
}

impl<'a, G: GitOperations + ?Sized> CommitCorrelator<'a, G> {
    pub fn new(git: &'a G) -> Self {
        Self { git }
    }

    /// Commits on any ref whose message contains `task_id`, newest first.
    ///
    /// The whole message is searched, body included. The match is a plain
    /// substring, so `WP01` also matches `WP012`.
    #[must_use]
    pub fn commits_for(&self, task_id: &str) -> Vec<Commit> {
        if task_id.trim().is_empty() || !self.git.is_repository() {
            return Vec::new();
        }
        match self.git.search_log(task_id) {
            Ok(output) => parse_log(&output),
            Err(e) => {
                tracing::debug!(task = task_id, error = %e, "commit search failed");
                Vec::new()
            }
        }
    }

    /// Paths changed by each commit of `task_id`.
    ///
    /// A commit whose file listing fails is skipped.
    #[must_use]
    pub fn files_for(&self, task_id: &str) -> Vec<FileChange> {
        let mut changes = Vec::new();
        for commit in self.commits_for(task_id) {
            match self.git.name_status(&commit.hash) {
                Ok(output) => changes.extend(parse_name_status(&output, &commit)),
                Err(e) => {
                    tracing::debug!(commit = %commit.short_hash, error = %e, "skipping commit file listing");
                }
            }
        }
        changes
    }

    /// Full patch text of one commit, or `None` if it cannot be resolved.
    #[must_use]
    pub fn diff_for(&self, commit: &str) -> Option<String> {
        if validate_ref(commit).is_err() {
            tracing::warn!(commit, "rejecting commit reference");
            return None;
        }
        if !self.git.is_repository() {
            return None;
        }
        match self.git.show(commit) {
            Ok(diff) => Some(diff),
            Err(e) => {
                tracing::debug!(commit, error = %e, "commit diff unavailable");
                None
            }
        }
    }
}

/// Parse `--name-status` lines (`M\tpath`, `R100\told\tnew`) for one commit.
#[must_use]
pub fn parse_name_status(output: &str, commit: &Commit) -> Vec<FileChange> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let status = fields.next()?.trim();
            let paths: Vec<&str> = fields.collect();
            let path = (*paths.last()?).to_string();
            let action = status.chars().next()?.to_string();
            let previous_path = (paths.len() > 1).then(|| paths[0].to_string());

            Some(FileChange {
                commit: commit.short_hash.clone(),
                commit_hash: commit.hash.clone(),
                path,
                previous_path,
                action,
                date: commit.date,
                subject: commit.subject.clone(),
            })
        })
        .collect()
}
