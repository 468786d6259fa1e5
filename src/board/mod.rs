//! Kanban board model derived from a feature's task artifacts.
//!
//! A board is never stored: every query re-reads the feature's `tasks/`
//! directory or `tasks.md` file and rebuilds it.
//!
//! # Architecture
//!
//! ```text
//! Feature root
//!   ├── format::detect_format()   -> BoardFormat
//!   └── parsing::parse_board()    -> Board
//!         ├── lanes: planned | doing | for_review | done -> Vec<Task>
//!         ├── phases: Vec<Phase>          (phase-sections only)
//!         └── conflicts: Vec<LaneConflict>
//! ```
//!
//! Lane membership is always one of the four [`Lane`] values. Directory
//! placement wins over anything a task file says about itself.

pub mod cache;
pub mod dependencies;
pub mod detail;
pub mod format;
pub mod frontmatter;
pub mod mutation;
pub mod parsing;

pub use cache::BoardCache;
pub use dependencies::{resolve_dependencies, DependencyResolver};
pub use detail::{task_detail, TaskDetail};
pub use format::{detect_format, BoardFormat};
pub use mutation::{create_task, move_task};
pub use parsing::{parse_board, parse_tasks_markdown};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Lane
// ============================================================================

/// Workflow stage a task occupies.
///
/// Ordering follows the scan order used everywhere a lane has to be
/// chosen between duplicates: planned, doing, for_review, done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    Planned,
    Doing,
    ForReview,
    Done,
}

impl Lane {
    /// All lanes in scan order.
    pub const ALL: [Lane; 4] = [Lane::Planned, Lane::Doing, Lane::ForReview, Lane::Done];

    /// Directory name used for this lane under `tasks/`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Doing => "doing",
            Self::ForReview => "for_review",
            Self::Done => "done",
        }
    }

    /// Map free-text section heading to a lane.
    ///
    /// Anything unrecognised lands in `planned`.
    ///
    /// # Example
    ///
    /// ```
    /// use specboard::board::Lane;
    ///
    /// assert_eq!(Lane::from_heading("In Progress"), Lane::Doing);
    /// assert_eq!(Lane::from_heading("For Review"), Lane::ForReview);
    /// assert_eq!(Lane::from_heading("Completed"), Lane::Done);
    /// assert_eq!(Lane::from_heading("Backlog"), Lane::Planned);
    /// ```
    #[must_use]
    pub fn from_heading(heading: &str) -> Self {
        let name = heading.to_lowercase();
        if name.contains("doing") || name.contains("progress") {
            Self::Doing
        } else if name.contains("review") {
            Self::ForReview
        } else if name.contains("done") || name.contains("completed") {
            Self::Done
        } else {
            Self::Planned
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the four lane names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown lane '{0}' (expected planned, doing, for_review or done)")]
pub struct ParseLaneError(pub String);

impl FromStr for Lane {
    type Err = ParseLaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "planned" => Ok(Self::Planned),
            "doing" => Ok(Self::Doing),
            "for_review" => Ok(Self::ForReview),
            "done" => Ok(Self::Done),
            _ => Err(ParseLaneError(s.to_string())),
        }
    }
}

/// A single path component that cannot climb out of its parent directory.
pub(crate) fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0')
}

// ============================================================================
// Tasks and Phases
// ============================================================================

/// Where a task came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// One markdown file per task under `tasks/<lane>/`.
    WorkPackage,
    /// An entry inside a single `tasks.md` file.
    Embedded,
    /// A phase of a phase-structured `tasks.md`, surfaced as a lane item.
    Phase,
}

/// A reference from one task to another, with the target's current lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: String,
    pub lane: Lane,
}

/// A single card on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub lane: Lane,
    /// Artifact the task was read from.
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Task {
    /// Create a task with no dependencies or content.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        lane: Lane,
        path: impl Into<PathBuf>,
        kind: TaskKind,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            lane,
            path: path.into(),
            kind,
            dependencies: Vec::new(),
            content: None,
        }
    }
}

/// A numbered phase of a phase-structured `tasks.md`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// `Phase{N}`
    pub id: String,
    /// `Phase {N}: {name}`
    pub title: String,
    pub number: u32,
    /// Derived from checkbox completion; never `for_review`.
    pub status: Lane,
    pub completed: usize,
    pub total: usize,
    pub path: PathBuf,
}

impl Phase {
    /// Derive a phase from its checkbox counts.
    ///
    /// # Example
    ///
    /// ```
    /// use specboard::board::{Lane, Phase};
    ///
    /// let phase = Phase::from_counts(2, "Build", 1, 2, "tasks.md");
    /// assert_eq!(phase.status, Lane::Doing);
    /// assert_eq!(phase.progress(), "1/2");
    /// ```
    pub fn from_counts(
        number: u32,
        name: &str,
        completed: usize,
        total: usize,
        path: impl Into<PathBuf>,
    ) -> Self {
        let status = if total > 0 && completed == total {
            Lane::Done
        } else if completed > 0 {
            Lane::Doing
        } else {
            Lane::Planned
        };
        Self {
            id: format!("Phase{number}"),
            title: format!("Phase {number}: {name}"),
            number,
            status,
            completed,
            total,
            path: path.into(),
        }
    }

    /// Completion ratio as `completed/total`.
    #[must_use]
    pub fn progress(&self) -> String {
        format!("{}/{}", self.completed, self.total)
    }

    /// Lane-queryable view of this phase.
    #[must_use]
    pub fn to_task(&self) -> Task {
        Task::new(
            self.id.clone(),
            self.title.clone(),
            self.status,
            self.path.clone(),
            TaskKind::Phase,
        )
    }
}

// ============================================================================
// Board
// ============================================================================

/// Same task id found in more than one lane.
///
/// The first lane in scan order keeps the task; the rest are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneConflict {
    pub id: String,
    pub kept: Lane,
    pub dropped: Vec<Lane>,
}

/// Per-lane task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneCounts {
    pub planned: usize,
    pub doing: usize,
    pub for_review: usize,
    pub done: usize,
}

impl LaneCounts {
    /// Sum across all lanes.
    #[must_use]
    pub fn total(&self) -> usize {
        self.planned + self.doing + self.for_review + self.done
    }

    pub(crate) fn add(&mut self, lane: Lane, n: usize) {
        match lane {
            Lane::Planned => self.planned += n,
            Lane::Doing => self.doing += n,
            Lane::ForReview => self.for_review += n,
            Lane::Done => self.done += n,
        }
    }
}

/// Full set of lanes (and phases) derived for one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub format: BoardFormat,
    pub lanes: BTreeMap<Lane, Vec<Task>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<Phase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<LaneConflict>,
}

impl Board {
    /// Board with all four lanes present and empty.
    #[must_use]
    pub fn empty(format: BoardFormat) -> Self {
        Self {
            format,
            lanes: Lane::ALL.iter().map(|lane| (*lane, Vec::new())).collect(),
            phases: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// Append a task to a lane, overriding whatever lane the task carried.
    pub fn push(&mut self, lane: Lane, mut task: Task) {
        task.lane = lane;
        self.lanes.entry(lane).or_default().push(task);
    }

    /// Record a phase and surface it in the lane matching its status.
    pub fn push_phase(&mut self, phase: Phase) {
        self.push(phase.status, phase.to_task());
        self.phases.push(phase);
    }

    /// Tasks currently in `lane`.
    #[must_use]
    pub fn tasks(&self, lane: Lane) -> &[Task] {
        self.lanes.get(&lane).map(Vec::as_slice).unwrap_or_default()
    }

    /// Iterate every task in lane scan order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        Lane::ALL.iter().flat_map(move |lane| self.tasks(*lane).iter())
    }

    /// Find a task by id, first match in lane scan order.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Task> {
        self.iter().find(|task| task.id == id)
    }

    /// Lane of the task with `id`, if it is on the board.
    #[must_use]
    pub fn lane_of(&self, id: &str) -> Option<Lane> {
        self.find(id).map(|task| task.lane)
    }

    #[must_use]
    pub fn counts(&self) -> LaneCounts {
        let mut counts = LaneCounts::default();
        for lane in Lane::ALL {
            counts.add(lane, self.tasks(lane).len());
        }
        counts
    }

    #[must_use]
    pub fn total_tasks(&self) -> usize {
        self.counts().total()
    }

    #[must_use]
    pub fn is_phase_mode(&self) -> bool {
        self.format == BoardFormat::PhaseSections
    }

    /// Drop later duplicates of a task id, keeping the first in lane scan order.
    ///
    /// A repeated phase keeps only the copy whose status is the kept lane.
    pub(crate) fn resolve_conflicts(&mut self) {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut conflicts: Vec<LaneConflict> = Vec::new();

        for lane in Lane::ALL {
            let Some(tasks) = self.lanes.get_mut(&lane) else {
                continue;
            };
            tasks.retain(|task| match seen.get(&task.id) {
                Some(&idx) => {
                    let conflict = &mut conflicts[idx];
                    if conflict.kept != lane && !conflict.dropped.contains(&lane) {
                        conflict.dropped.push(lane);
                    }
                    false
                }
                None => {
                    seen.insert(task.id.clone(), conflicts.len());
                    conflicts.push(LaneConflict {
                        id: task.id.clone(),
                        kept: lane,
                        dropped: Vec::new(),
                    });
                    true
                }
            });
        }

        conflicts.retain(|c| !c.dropped.is_empty());
        for conflict in &conflicts {
            tracing::warn!(
                task = %conflict.id,
                kept = %conflict.kept,
                dropped = ?conflict.dropped,
                "task id appears in more than one lane"
            );
        }
        if !conflicts.is_empty() && !self.phases.is_empty() {
            let kept: HashMap<&str, Lane> =
                conflicts.iter().map(|c| (c.id.as_str(), c.kept)).collect();
            let mut placed: Vec<String> = Vec::new();
            self.phases.retain(|phase| match kept.get(phase.id.as_str()) {
                Some(&lane) if phase.status == lane && !placed.contains(&phase.id) => {
                    placed.push(phase.id.clone());
                    true
                }
                Some(_) => false,
                None => true,
            });
        }
        self.conflicts = conflicts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str) -> Task {
        Task::new(id, id, Lane::Planned, "tasks.md", TaskKind::Embedded)
    }

    // =========================================================================
    // Lane Tests
    // =========================================================================

    #[test]
    fn test_lane_scan_order() {
        let mut lanes = vec![Lane::Done, Lane::Planned, Lane::ForReview, Lane::Doing];
        lanes.sort();
        assert_eq!(lanes, Lane::ALL.to_vec());
    }

    #[test]
    fn test_lane_from_str() {
        assert_eq!("planned".parse::<Lane>().unwrap(), Lane::Planned);
        assert_eq!("for-review".parse::<Lane>().unwrap(), Lane::ForReview);
        assert_eq!("DONE".parse::<Lane>().unwrap(), Lane::Done);
        assert!("blocked".parse::<Lane>().is_err());
    }

    #[test]
    fn test_lane_serializes_as_directory_name() {
        assert_eq!(
            serde_json::to_string(&Lane::ForReview).unwrap(),
            "\"for_review\""
        );
        assert_eq!(Lane::ForReview.to_string(), "for_review");
    }

    #[test]
    fn test_lane_from_heading_review_variants() {
        assert_eq!(Lane::from_heading("Review"), Lane::ForReview);
        assert_eq!(Lane::from_heading("DOING (2)"), Lane::Doing);
        assert_eq!(Lane::from_heading("Planned"), Lane::Planned);
    }

    // =========================================================================
    // Phase Tests
    // =========================================================================

    #[test]
    fn test_phase_status_law() {
        assert_eq!(Phase::from_counts(1, "a", 1, 2, "t").status, Lane::Doing);
        assert_eq!(Phase::from_counts(1, "a", 2, 2, "t").status, Lane::Done);
        assert_eq!(Phase::from_counts(1, "a", 0, 2, "t").status, Lane::Planned);
        assert_eq!(Phase::from_counts(1, "a", 0, 0, "t").status, Lane::Planned);
    }

    #[test]
    fn test_phase_progress_and_ids() {
        let phase = Phase::from_counts(3, "Polish", 2, 2, "tasks.md");
        assert_eq!(phase.id, "Phase3");
        assert_eq!(phase.title, "Phase 3: Polish");
        assert_eq!(phase.progress(), "2/2");
        let as_task = phase.to_task();
        assert_eq!(as_task.kind, TaskKind::Phase);
        assert_eq!(as_task.lane, Lane::Done);
    }

    // =========================================================================
    // Board Tests
    // =========================================================================

    #[test]
    fn test_empty_board_has_all_lanes() {
        let board = Board::empty(BoardFormat::Flat);
        assert_eq!(board.lanes.len(), 4);
        assert_eq!(board.total_tasks(), 0);
        let json = serde_json::to_value(&board).unwrap();
        assert!(json["lanes"]["for_review"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_push_overrides_task_lane() {
        let mut board = Board::empty(BoardFormat::Flat);
        board.push(Lane::Done, task("T001"));
        assert_eq!(board.lane_of("T001"), Some(Lane::Done));
        assert_eq!(board.counts().done, 1);
    }

    #[test]
    fn test_push_phase_is_lane_queryable() {
        let mut board = Board::empty(BoardFormat::PhaseSections);
        board.push_phase(Phase::from_counts(1, "Setup", 1, 3, "tasks.md"));
        assert_eq!(board.phases.len(), 1);
        assert_eq!(board.lane_of("Phase1"), Some(Lane::Doing));
        assert!(board.is_phase_mode());
    }

    #[test]
    fn test_resolve_conflicts_keeps_first_lane() {
        let mut board = Board::empty(BoardFormat::DirectoryLanes);
        board.push(Lane::Done, task("WP01"));
        board.push(Lane::Doing, task("WP01"));
        board.push(Lane::Planned, task("WP02"));
        board.resolve_conflicts();

        assert_eq!(board.lane_of("WP01"), Some(Lane::Doing));
        assert_eq!(board.total_tasks(), 2);
        assert_eq!(
            board.conflicts,
            vec![LaneConflict {
                id: "WP01".to_string(),
                kept: Lane::Doing,
                dropped: vec![Lane::Done],
            }]
        );
    }

    #[test]
    fn test_resolve_conflicts_same_lane_duplicate() {
        let mut board = Board::empty(BoardFormat::Flat);
        board.push(Lane::Planned, task("T001"));
        board.push(Lane::Planned, task("T001"));
        board.resolve_conflicts();
        assert_eq!(board.total_tasks(), 1);
        // Same-lane duplicates are collapsed but are not a lane conflict.
        assert!(board.conflicts.is_empty());
    }
}
