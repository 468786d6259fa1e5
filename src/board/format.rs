//! Board format detection.
//!
//! Precedence, first match wins:
//!
//! 1. `tasks/` with at least one lane subdirectory -> [`BoardFormat::DirectoryLanes`]
//! 2. `tasks.md` with `## Phase <N>: <name>` headings -> [`BoardFormat::PhaseSections`]
//! 3. `tasks.md` with lane-like `##` headings -> [`BoardFormat::LabeledSections`]
//! 4. any other `tasks.md` -> [`BoardFormat::Flat`]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::parsing::{LANE_SECTION_RE, PHASE_HEADING_RE};
use super::Lane;

/// Parsing strategy for a feature's task artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoardFormat {
    /// `tasks/<lane>/<id>.md`, one file per task.
    DirectoryLanes,
    /// `tasks.md` organised as numbered phases.
    PhaseSections,
    /// `tasks.md` organised under lane headings.
    LabeledSections,
    /// `tasks.md` with no structural headings.
    Flat,
}

impl BoardFormat {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectoryLanes => "directory-lanes",
            Self::PhaseSections => "phase-sections",
            Self::LabeledSections => "labeled-sections",
            Self::Flat => "flat",
        }
    }

    /// Whether tasks live in one file (everything except directory lanes).
    #[must_use]
    pub fn is_single_file(&self) -> bool {
        !matches!(self, Self::DirectoryLanes)
    }
}

impl fmt::Display for BoardFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path of the task directory for a feature.
#[must_use]
pub fn tasks_dir(feature_root: &Path) -> PathBuf {
    feature_root.join("tasks")
}

/// Path of the single-file task list for a feature.
#[must_use]
pub fn tasks_file(feature_root: &Path) -> PathBuf {
    feature_root.join("tasks.md")
}

/// Whether `feature_root/tasks/` holds at least one lane directory.
#[must_use]
pub fn has_lane_dirs(feature_root: &Path) -> bool {
    let dir = tasks_dir(feature_root);
    dir.is_dir() && Lane::ALL.iter().any(|lane| dir.join(lane.as_str()).is_dir())
}

/// Classify the content of a `tasks.md` file.
///
/// # Example
///
/// ```
/// use specboard::board::format::{detect_content_format, BoardFormat};
///
/// let content = "## Phase 1: Setup\n- [x] init\n\n## Done\n";
/// assert_eq!(detect_content_format(content), BoardFormat::PhaseSections);
/// assert_eq!(detect_content_format("- [ ] T001 a"), BoardFormat::Flat);
/// ```
#[must_use]
pub fn detect_content_format(content: &str) -> BoardFormat {
    if PHASE_HEADING_RE.is_match(content) {
        BoardFormat::PhaseSections
    } else if LANE_SECTION_RE.is_match(content) {
        BoardFormat::LabeledSections
    } else {
        BoardFormat::Flat
    }
}

/// Select the parsing strategy for a feature root.
///
/// Returns `None` when the feature has no task artifacts at all, or when
/// `tasks.md` cannot be read (logged, treated as absent).
#[must_use]
pub fn detect_format(feature_root: &Path) -> Option<BoardFormat> {
    if has_lane_dirs(feature_root) {
        return Some(BoardFormat::DirectoryLanes);
    }

    let file = tasks_file(feature_root);
    if !file.is_file() {
        return None;
    }

    match std::fs::read_to_string(&file) {
        Ok(content) => Some(detect_content_format(&content)),
        Err(e) => {
            tracing::warn!(path = %file.display(), error = %e, "failed to read tasks file");
            None
        }
    }
}
