//! The query and mutation surface used by hosts.
//!
//! [`SpecBoard`] ties a [`Workspace`] to a git backend and an optional board
//! cache. Queries never fail: unknown features and tasks come back as
//! `None`, unavailable history as empty lists. Only mutations return
//! errors.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::board::detail::work_package_file;
use crate::board::{self, parse_board, Board, BoardCache, Lane, Task, TaskDetail};
use crate::config::{DashboardConfig, ProjectConfig};
use crate::error::{BoardError, Result};
use crate::feature::{Feature, FeatureCatalog, Workspace};
use crate::git::{
    Commit, CommitCorrelator, FileChange, GitClient, GitConfig, GitOperations, MigrationLedger,
    UntrackedCommit, UntrackedCommitDetector,
};
use crate::review::{parse_reviews, ReviewEntry};

/// Board and history queries over one project root.
pub struct SpecBoard {
    workspace: Workspace,
    settings: DashboardConfig,
    git: Box<dyn GitOperations>,
    cache: Option<Mutex<BoardCache>>,
}

impl std::fmt::Debug for SpecBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecBoard")
            .field("root", &self.workspace.root())
            .field("settings", &self.settings)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl SpecBoard {
    /// Open a project with its `.spec-mix/config.json` settings and the
    /// system git.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but is malformed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = ProjectConfig::load(&root)?;
        Ok(Self::with_config(root, config))
    }

    /// Build from an explicit configuration, using the system git.
    #[must_use]
    pub fn with_config(root: impl Into<PathBuf>, config: ProjectConfig) -> Self {
        let root = root.into();
        let git = GitClient::new(GitConfig::new(&root));
        let cache = config
            .dashboard
            .cache
            .then(|| Mutex::new(BoardCache::new()));
        Self {
            workspace: Workspace::new(root).with_mode(config.mode),
            settings: config.dashboard,
            git: Box::new(git),
            cache,
        }
    }

    /// Replace the git backend.
    #[must_use]
    pub fn with_git(mut self, git: impl GitOperations + 'static) -> Self {
        self.git = Box::new(git);
        self
    }

    /// Turn the board cache on or off.
    #[must_use]
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(|| Mutex::new(BoardCache::new()));
        self
    }

    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    #[must_use]
    pub fn settings(&self) -> &DashboardConfig {
        &self.settings
    }

    // =========================================================================
    // Board Queries
    // =========================================================================

    /// Every feature with its summary, plus the hotfix directory.
    #[must_use]
    pub fn features(&self) -> FeatureCatalog {
        self.workspace.scan_features_with(|root| self.load_board(root))
    }

    #[must_use]
    pub fn feature(&self, feature_id: &str) -> Option<Feature> {
        self.workspace.locate(feature_id)
    }

    /// The parsed board of a feature.
    #[must_use]
    pub fn board(&self, feature_id: &str) -> Option<Board> {
        let feature = self.workspace.locate(feature_id)?;
        Some(self.load_board(&feature.path))
    }

    /// Text of a file inside a feature directory.
    #[must_use]
    pub fn artifact(&self, feature_id: &str, name: &str) -> Option<String> {
        self.workspace.artifact(feature_id, name)
    }

    /// One task with content and resolved dependencies.
    #[must_use]
    pub fn task_detail(
        &self,
        feature_id: &str,
        task_id: &str,
        lane_hint: Option<Lane>,
    ) -> Option<TaskDetail> {
        let feature = self.workspace.locate(feature_id)?;
        board::task_detail(&feature.path, task_id, lane_hint)
    }

    /// Review entries from a task's activity log.
    #[must_use]
    pub fn task_reviews(&self, feature_id: &str, task_id: &str) -> Vec<ReviewEntry> {
        self.task_detail(feature_id, task_id, None)
            .map(|detail| parse_reviews(&detail.content))
            .unwrap_or_default()
    }

    // =========================================================================
    // History Queries
    // =========================================================================

    /// Commits whose message mentions `task_id`.
    #[must_use]
    pub fn task_commits(&self, task_id: &str) -> Vec<Commit> {
        CommitCorrelator::new(self.git.as_ref()).commits_for(task_id)
    }

    /// Files changed by the commits of `task_id`.
    #[must_use]
    pub fn task_files(&self, task_id: &str) -> Vec<FileChange> {
        CommitCorrelator::new(self.git.as_ref()).files_for(task_id)
    }

    /// Patch text of one commit.
    #[must_use]
    pub fn commit_diff(&self, commit: &str) -> Option<String> {
        CommitCorrelator::new(self.git.as_ref()).diff_for(commit)
    }

    /// Recent commits no work package accounts for.
    ///
    /// `branch` and `limit` default to the configured values.
    #[must_use]
    pub fn untracked_commits(&self, branch: Option<&str>, limit: Option<usize>) -> Vec<UntrackedCommit> {
        let branch = branch.unwrap_or(&self.settings.branch);
        let limit = limit.unwrap_or(self.settings.untracked_limit);
        let ledger = MigrationLedger::from_workspace(&self.workspace);
        UntrackedCommitDetector::new(self.git.as_ref(), ledger).scan(branch, limit)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a task in the `planned` lane of a feature.
    ///
    /// # Errors
    ///
    /// Returns `FeatureNotFound` for unknown features, or the underlying
    /// write error.
    pub fn create_task(&self, feature_id: &str, title: &str, description: &str) -> Result<Task> {
        let feature = self.require_feature(feature_id)?;
        let result = board::create_task(&feature.path, title, description);
        self.invalidate(&feature.path);
        result
    }

    /// Move a work package to another lane.
    ///
    /// # Errors
    ///
    /// Returns `FeatureNotFound` for unknown features, or the error from the
    /// move itself.
    pub fn move_task(&self, feature_id: &str, task_id: &str, lane: Lane) -> Result<Task> {
        let feature = self.require_feature(feature_id)?;
        let result = board::move_task(&feature.path, task_id, lane).map_err(|e| match e {
            BoardError::TaskNotFound { task_id, .. } => BoardError::task_not_found(feature_id, task_id),
            other => other,
        });
        self.invalidate(&feature.path);
        result
    }

    /// Whether a task has its own work-package file.
    #[must_use]
    pub fn has_work_package(&self, feature_id: &str, task_id: &str) -> bool {
        self.workspace
            .locate(feature_id)
            .and_then(|feature| work_package_file(&feature.path, task_id, None))
            .is_some()
    }

    // =========================================================================
    // Cache
    // =========================================================================

    fn load_board(&self, feature_root: &Path) -> Board {
        match &self.cache {
            Some(cache) => lock(cache).get_or_parse(feature_root),
            None => parse_board(feature_root),
        }
    }

    fn invalidate(&self, feature_root: &Path) {
        if let Some(cache) = &self.cache {
            lock(cache).invalidate(feature_root);
        }
    }

    fn require_feature(&self, feature_id: &str) -> Result<Feature> {
        self.workspace
            .locate(feature_id)
            .ok_or_else(|| BoardError::feature_not_found(feature_id))
    }
}

/// A poisoned cache only means a panic mid-parse; the map is still usable.
fn lock(cache: &Mutex<BoardCache>) -> MutexGuard<'_, BoardCache> {
    cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
