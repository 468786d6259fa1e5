//! Feature location and workspace scanning.
//!
//! Features live under `specs/<feature-id>/` in the project root, or under
//! `.worktrees/<name>/specs/<feature-id>/` for features developed in a
//! secondary worktree. The primary tree always wins; worktrees are searched
//! in name order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::board::format::{tasks_dir, tasks_file};
use crate::board::frontmatter::parse_frontmatter;
use crate::board::{is_plain_name, parse_board, Board, Lane, LaneCounts, Phase};
use crate::config::ProjectMode;

/// Directory under `specs/` that holds hotfix notes instead of a feature.
pub const HOTFIX_DIR: &str = "hotfix";

/// Markdown artifacts reported in a feature's artifact map, keyed by the
/// name used in the map.
const DOCUMENT_ARTIFACTS: [(&str, &str); 8] = [
    ("spec", "spec.md"),
    ("plan", "plan.md"),
    ("tasks", "tasks.md"),
    ("research", "research.md"),
    ("data-model", "data-model.md"),
    ("acceptance", "acceptance.md"),
    ("checklist", "checklist.md"),
    ("walkthrough", "walkthrough.md"),
];

/// A located feature directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub path: PathBuf,
    /// Worktree name when the feature was found outside the primary tree.
    pub worktree: Option<String>,
    pub mode: ProjectMode,
}

/// How a feature organises its tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskMode {
    Phase,
    Kanban,
}

/// Overview of one feature for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    pub worktree: Option<String>,
    pub mode: ProjectMode,
    pub artifacts: BTreeMap<String, bool>,
    pub fixes_count: usize,
    pub walkthrough_files: Vec<String>,
    pub lane_counts: LaneCounts,
    pub total_tasks: usize,
    pub task_mode: TaskMode,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub phases: Vec<Phase>,
}

impl FeatureSummary {
    /// Summarise a feature from its directory and already parsed board.
    #[must_use]
    pub fn build(feature: &Feature, board: &Board) -> Self {
        let root = &feature.path;
        let mut artifacts: BTreeMap<String, bool> = DOCUMENT_ARTIFACTS
            .iter()
            .map(|(key, file)| ((*key).to_string(), root.join(file).is_file()))
            .collect();

        let fixes_count = matching_files(&root.join("fixes"), |name| {
            name.starts_with("FIX") && name.ends_with(".md")
        })
        .len();
        artifacts.insert("fixes".to_string(), fixes_count > 0);
        artifacts.insert(
            "kanban".to_string(),
            tasks_dir(root).exists() || tasks_file(root).exists(),
        );

        let walkthrough_files = matching_files(root, |name| {
            name.starts_with("walkthrough-phase-") && name.ends_with(".md")
        });

        let lane_counts = board.counts();
        Self {
            id: feature.id.clone(),
            name: feature.id.clone(),
            path: feature.path.clone(),
            worktree: feature.worktree.clone(),
            mode: feature.mode,
            artifacts,
            fixes_count,
            walkthrough_files,
            total_tasks: lane_counts.total(),
            lane_counts,
            task_mode: if board.is_phase_mode() {
                TaskMode::Phase
            } else {
                TaskMode::Kanban
            },
            phases: board.phases.clone(),
        }
    }
}

/// One `HOTFIX-*.md` note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotfix {
    pub id: String,
    pub status: String,
    pub priority: String,
    pub path: PathBuf,
}

/// Overview of `specs/hotfix/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotfixSummary {
    pub path: PathBuf,
    pub hotfixes: Vec<Hotfix>,
    pub status_counts: BTreeMap<String, usize>,
    pub lane_counts: LaneCounts,
    pub total: usize,
}

impl HotfixSummary {
    /// Lane a hotfix status counts toward, if any.
    #[must_use]
    pub fn lane_for_status(status: &str) -> Option<Lane> {
        match status {
            "analyzing" | "planning" => Some(Lane::Planned),
            "implementing" => Some(Lane::Doing),
            "verifying" => Some(Lane::ForReview),
            "done" => Some(Lane::Done),
            _ => None,
        }
    }
}

/// Features listed by a workspace scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCatalog {
    pub features: Vec<FeatureSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotfix: Option<HotfixSummary>,
}

/// A project root containing `specs/` and optionally `.worktrees/`.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    mode: ProjectMode,
}

impl Workspace {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mode: ProjectMode::default(),
        }
    }

    /// Set the project mode reported on located features.
    #[must_use]
    pub fn with_mode(mut self, mode: ProjectMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn mode(&self) -> ProjectMode {
        self.mode
    }

    #[must_use]
    pub fn specs_dir(&self) -> PathBuf {
        self.root.join("specs")
    }

    /// `.worktrees/<name>/specs` directories, sorted by worktree name.
    fn worktree_specs(&self) -> Vec<(String, PathBuf)> {
        subdirectories(&self.root.join(".worktrees"))
            .into_iter()
            .map(|(name, path)| (name, path.join("specs")))
            .filter(|(_, specs)| specs.is_dir())
            .collect()
    }

    /// Resolve a feature id to its directory.
    ///
    /// Returns `None` for unknown ids and for ids that are not a single
    /// path component.
    #[must_use]
    pub fn locate(&self, feature_id: &str) -> Option<Feature> {
        if !is_plain_name(feature_id) {
            tracing::warn!(feature = feature_id, "rejecting feature id with path components");
            return None;
        }

        let primary = self.specs_dir().join(feature_id);
        if primary.is_dir() {
            return Some(self.feature(feature_id, primary, None));
        }

        self.worktree_specs().into_iter().find_map(|(worktree, specs)| {
            let candidate = specs.join(feature_id);
            candidate
                .is_dir()
                .then(|| self.feature(feature_id, candidate, Some(worktree)))
        })
    }

    /// Every feature, primary tree first, then each worktree.
    ///
    /// Dot-directories and the hotfix directory are skipped.
    #[must_use]
    pub fn features(&self) -> Vec<Feature> {
        let mut features: Vec<Feature> = subdirectories(&self.specs_dir())
            .into_iter()
            .filter(|(name, _)| name != HOTFIX_DIR)
            .map(|(name, path)| self.feature(&name, path, None))
            .collect();

        for (worktree, specs) in self.worktree_specs() {
            features.extend(
                subdirectories(&specs)
                    .into_iter()
                    .map(|(name, path)| self.feature(&name, path, Some(worktree.clone()))),
            );
        }
        features
    }

    /// Summaries of every feature plus the hotfix directory.
    #[must_use]
    pub fn scan_features(&self) -> FeatureCatalog {
        self.scan_features_with(parse_board)
    }

    /// Like [`Workspace::scan_features`], with the board supplied by the
    /// caller (e.g. from a cache).
    pub fn scan_features_with<F>(&self, mut board_for: F) -> FeatureCatalog
    where
        F: FnMut(&Path) -> Board,
    {
        let features = self
            .features()
            .iter()
            .map(|feature| FeatureSummary::build(feature, &board_for(&feature.path)))
            .collect();
        FeatureCatalog {
            features,
            hotfix: self.hotfix_summary(),
        }
    }

    /// Summary of `specs/hotfix/`, or `None` when it holds no hotfix notes.
    #[must_use]
    pub fn hotfix_summary(&self) -> Option<HotfixSummary> {
        let dir = self.specs_dir().join(HOTFIX_DIR);
        let files = matching_files(&dir, |name| name.starts_with("HOTFIX-") && name.ends_with(".md"));
        if files.is_empty() {
            return None;
        }

        let mut hotfixes = Vec::with_capacity(files.len());
        let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut lane_counts = LaneCounts::default();

        for name in &files {
            let path = dir.join(name);
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable hotfix");
                    continue;
                }
            };
            let meta = parse_frontmatter(&content);
            let status = meta.status.unwrap_or_else(|| "analyzing".to_string());
            let priority = meta.priority.unwrap_or_else(|| "P2".to_string());

            *status_counts.entry(status.clone()).or_default() += 1;
            if let Some(lane) = HotfixSummary::lane_for_status(&status) {
                lane_counts.add(lane, 1);
            }
            hotfixes.push(Hotfix {
                id: name.trim_end_matches(".md").to_string(),
                status,
                priority,
                path,
            });
        }

        Some(HotfixSummary {
            path: dir,
            total: files.len(),
            hotfixes,
            status_counts,
            lane_counts,
        })
    }

    /// Text of a file inside a feature directory.
    ///
    /// `name` may contain subdirectories but no `..`, root or prefix
    /// components.
    #[must_use]
    pub fn artifact(&self, feature_id: &str, name: &str) -> Option<String> {
        let feature = self.locate(feature_id)?;
        let relative = Path::new(name);
        if name.is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            tracing::warn!(feature = feature_id, artifact = name, "rejecting artifact path");
            return None;
        }

        let path = feature.path.join(relative);
        if !path.is_file() {
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read artifact");
                None
            }
        }
    }

    fn feature(&self, id: &str, path: PathBuf, worktree: Option<String>) -> Feature {
        Feature {
            id: id.to_string(),
            path,
            worktree,
            mode: self.mode,
        }
    }
}

/// Non-hidden subdirectories of `dir`, sorted by name.
fn subdirectories(dir: &Path) -> Vec<(String, PathBuf)> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            (!name.starts_with('.')).then(|| (name, entry.into_path()))
        })
        .collect()
}

/// Names of files directly in `dir` accepted by `keep`, sorted.
fn matching_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Vec<String> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| keep(name))
        .collect()
}
