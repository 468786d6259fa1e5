//! Dependency extraction and lane resolution.
//!
//! Dependency ids come from the metadata block's `dependencies` key when it
//! lists anything, otherwise from a `Dependencies:` / `Depends on:` /
//! `Requires:` line in the body. Each id is then looked up on the board.

use regex::Regex;
use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::format::{tasks_dir, tasks_file};
use super::frontmatter::parse_frontmatter;
use super::parsing::parse_tasks_markdown;
use super::{Board, Dependency, Lane};

static DEPENDENCY_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ims)^[ \t]*(?:Dependencies|Depends on|Requires):[ \t]*(.+?)(?:\r?\n[ \t]*\r?\n|\z)")
        .expect("dependency line pattern")
});

static DEPENDENCY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]+-?\d+)\b").expect("dependency id pattern"));

/// Dependency ids declared by a task file, in declaration order.
///
/// # Example
///
/// ```
/// use specboard::board::dependencies::dependency_ids;
///
/// let body = "# WP03\n\nDepends on: WP01 and WP-02\n\nMore text WP09\n";
/// assert_eq!(dependency_ids(body), vec!["WP01", "WP-02"]);
/// ```
#[must_use]
pub fn dependency_ids(content: &str) -> Vec<String> {
    if let Some(ids) = parse_frontmatter(content).dependencies {
        if !ids.is_empty() {
            return ids;
        }
    }
    body_dependency_ids(content)
}

/// Dependency ids from a free-text `Dependencies:` style line.
#[must_use]
pub fn body_dependency_ids(text: &str) -> Vec<String> {
    let Some(caps) = DEPENDENCY_LINE_RE.captures(text) else {
        return Vec::new();
    };
    let mut ids: Vec<String> = Vec::new();
    for m in DEPENDENCY_ID_RE.find_iter(&caps[1]) {
        if !ids.iter().any(|id| id == m.as_str()) {
            ids.push(m.as_str().to_string());
        }
    }
    ids
}

/// Looks up the current lane of task ids within one feature.
///
/// The single-file board is parsed at most once per resolver.
#[derive(Debug)]
pub struct DependencyResolver {
    feature_root: PathBuf,
    file_board: OnceCell<Option<Board>>,
}

impl DependencyResolver {
    #[must_use]
    pub fn new(feature_root: impl Into<PathBuf>) -> Self {
        Self {
            feature_root: feature_root.into(),
            file_board: OnceCell::new(),
        }
    }

    /// Current lane of `task_id`, or `None` when it is on no board.
    ///
    /// Lane directories are checked first in scan order, then `tasks.md`.
    #[must_use]
    pub fn find_lane(&self, task_id: &str) -> Option<Lane> {
        let dir = tasks_dir(&self.feature_root);
        if dir.is_dir() {
            let file_name = format!("{task_id}.md");
            if let Some(lane) = Lane::ALL
                .into_iter()
                .find(|lane| dir.join(lane.as_str()).join(&file_name).is_file())
            {
                return Some(lane);
            }
        }

        self.file_board()
            .and_then(|board| board.lane_of(task_id))
    }

    /// Resolve one id, defaulting to `planned` when it cannot be found.
    #[must_use]
    pub fn resolve(&self, task_id: &str) -> Dependency {
        let lane = self.find_lane(task_id).unwrap_or_else(|| {
            tracing::debug!(task = task_id, "unresolved dependency, defaulting to planned");
            Lane::Planned
        });
        Dependency {
            id: task_id.to_string(),
            lane,
        }
    }

    /// Resolve every id in order.
    #[must_use]
    pub fn resolve_all(&self, ids: &[String]) -> Vec<Dependency> {
        ids.iter().map(|id| self.resolve(id)).collect()
    }

    fn file_board(&self) -> Option<&Board> {
        self.file_board
            .get_or_init(|| {
                let file = tasks_file(&self.feature_root);
                let content = std::fs::read_to_string(&file).ok()?;
                Some(parse_tasks_markdown(&content, &file))
            })
            .as_ref()
    }
}

/// Extract and resolve the dependencies declared in `content`.
#[must_use]
pub fn resolve_dependencies(feature_root: &Path, content: &str) -> Vec<Dependency> {
    let ids = dependency_ids(content);
    if ids.is_empty() {
        return Vec::new();
    }
    DependencyResolver::new(feature_root).resolve_all(&ids)
}
