//! Board parsing for the four task-artifact formats.
//!
//! Each format has its own entry point so it can be exercised on its own;
//! [`parse_board`] detects the format of a feature root and dispatches.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

use super::format::{detect_content_format, detect_format, tasks_dir, tasks_file, BoardFormat};
use super::{Board, Lane, Phase, Task, TaskKind};

// ============================================================================
// Patterns
// ============================================================================

/// `## Phase <N>: <name>`
pub(crate) static PHASE_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^## Phase (\d+):[ \t]*(.+?)[ \t\r]*$").expect("phase heading pattern")
});

/// Second-level heading naming a lane.
pub(crate) static LANE_SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^## (Planned|Doing|In Progress|For Review|Review|Done|Completed).*$")
        .expect("lane section pattern")
});

/// `- [ ] T001 title`, `- [x] WP-02 title`, `- [X] WP03: title`
pub(crate) static CHECKBOX_TASK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^- \[([ xX])\] ((?:T|WP-?)\d\S*)[ \t]*(.*?)[ \t\r]*$")
        .expect("checkbox task pattern")
});

/// `### WP-01: title`, `### T1.2: title`
pub(crate) static HEADER_TASK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^### ([A-Z]+-[\d.]+|T[\d.]+|WP\d+(?:\.\d+)?):[ \t]*(.+?)[ \t\r]*$")
        .expect("header task pattern")
});

static CHECKED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"- \[[xX]\]").expect("checked box pattern"));

static ANY_CHECKBOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"- \[[ xX]\]").expect("checkbox pattern"));

// ============================================================================
// Dispatch
// ============================================================================

/// Parse the board of a feature root.
///
/// A feature with no task artifacts gets an empty board. A `tasks.md` that
/// cannot be read also gets an empty board; the failure is only logged.
#[must_use]
pub fn parse_board(feature_root: &Path) -> Board {
    match detect_format(feature_root) {
        Some(BoardFormat::DirectoryLanes) => parse_directory_lanes(&tasks_dir(feature_root)),
        Some(format) => {
            let file = tasks_file(feature_root);
            match std::fs::read_to_string(&file) {
                Ok(content) => parse_tasks_markdown(&content, &file),
                Err(e) => {
                    tracing::warn!(path = %file.display(), error = %e, "skipping unreadable tasks file");
                    Board::empty(format)
                }
            }
        }
        None => Board::empty(BoardFormat::Flat),
    }
}

/// Parse the content of a single `tasks.md`, choosing the format from the
/// headings it contains.
///
/// # Example
///
/// ```
/// use specboard::board::{parse_tasks_markdown, Lane};
/// use std::path::Path;
///
/// let content = "## Doing\n- [ ] T002 Wire API\n\n## Done\n- [x] T001 Scaffold\n";
/// let board = parse_tasks_markdown(content, Path::new("tasks.md"));
/// assert_eq!(board.lane_of("T002"), Some(Lane::Doing));
/// assert_eq!(board.lane_of("T001"), Some(Lane::Done));
/// ```
#[must_use]
pub fn parse_tasks_markdown(content: &str, path: &Path) -> Board {
    let mut board = match detect_content_format(content) {
        BoardFormat::PhaseSections => parse_phase_sections(content, path),
        BoardFormat::LabeledSections => parse_labeled_sections(content, path),
        _ => parse_flat(content, path),
    };
    board.resolve_conflicts();
    board
}

// ============================================================================
// Directory Lanes
// ============================================================================

/// Parse `tasks/<lane>/*.md`, one task per file, lane from the directory.
#[must_use]
pub fn parse_directory_lanes(tasks_dir: &Path) -> Board {
    let mut board = Board::empty(BoardFormat::DirectoryLanes);

    for lane in Lane::ALL {
        for file in lane_files(&tasks_dir.join(lane.as_str())) {
            let Some(id) = file.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let title = match std::fs::read_to_string(&file) {
                Ok(content) => first_title(&content).unwrap_or_else(|| id.clone()),
                Err(e) => {
                    tracing::warn!(path = %file.display(), error = %e, "unreadable task file, using file name as title");
                    id.clone()
                }
            };
            board.push(lane, Task::new(id, title, lane, file, TaskKind::WorkPackage));
        }
    }

    board.resolve_conflicts();
    board
}

/// Markdown files directly inside a lane directory, sorted by name.
pub(crate) fn lane_files(lane_dir: &Path) -> Vec<PathBuf> {
    if !lane_dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(lane_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .collect()
}

/// Text of the first `# ` heading.
pub(crate) fn first_title(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

// ============================================================================
// Phase Sections
// ============================================================================

/// Parse `## Phase <N>: <name>` sections.
///
/// Each phase's status comes from the checkboxes between its heading and
/// the next phase heading.
#[must_use]
pub fn parse_phase_sections(content: &str, path: &Path) -> Board {
    let mut board = Board::empty(BoardFormat::PhaseSections);
    let headings: Vec<_> = PHASE_HEADING_RE.captures_iter(content).collect();

    for (i, caps) in headings.iter().enumerate() {
        let Some(whole) = caps.get(0) else { continue };
        let Ok(number) = caps[1].parse::<u32>() else {
            tracing::warn!(heading = whole.as_str(), "phase number out of range, skipping");
            continue;
        };
        let end = headings
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(content.len(), |m| m.start());
        let span = &content[whole.end()..end];

        let completed = CHECKED_RE.find_iter(span).count();
        let total = ANY_CHECKBOX_RE.find_iter(span).count();
        board.push_phase(Phase::from_counts(
            number,
            caps[2].trim(),
            completed,
            total,
            path,
        ));
    }

    board
}

// ============================================================================
// Labeled Sections
// ============================================================================

/// Parse a file sectioned by lane headings (`## Doing`, `## Done`, ...).
///
/// Tasks before the first lane heading are not on the board.
#[must_use]
pub fn parse_labeled_sections(content: &str, path: &Path) -> Board {
    let mut board = Board::empty(BoardFormat::LabeledSections);
    let sections: Vec<_> = LANE_SECTION_RE.captures_iter(content).collect();

    for (i, caps) in sections.iter().enumerate() {
        let Some(whole) = caps.get(0) else { continue };
        let lane = Lane::from_heading(&caps[1]);
        let end = sections
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(content.len(), |m| m.start());
        let span = &content[whole.end()..end];

        for (_, task) in checkbox_tasks(span, path) {
            board.push(lane, task);
        }
        for task in header_tasks(span, path) {
            board.push(lane, task);
        }
    }

    board
}

// ============================================================================
// Flat
// ============================================================================

/// Parse a file with no structural headings.
///
/// Checked boxes are `done`, unchecked are `planned`. Heading entries carry
/// no completion signal and are always `planned`.
#[must_use]
pub fn parse_flat(content: &str, path: &Path) -> Board {
    let mut board = Board::empty(BoardFormat::Flat);

    for (checked, task) in checkbox_tasks(content, path) {
        let lane = if checked { Lane::Done } else { Lane::Planned };
        board.push(lane, task);
    }
    for task in header_tasks(content, path) {
        board.push(Lane::Planned, task);
    }

    board
}

// ============================================================================
// Entry Scanners
// ============================================================================

/// Checkbox entries in `text`, paired with their checked state.
fn checkbox_tasks(text: &str, path: &Path) -> Vec<(bool, Task)> {
    CHECKBOX_TASK_RE
        .captures_iter(text)
        .map(|caps| {
            let checked = caps[1].eq_ignore_ascii_case("x");
            let id = caps[2].trim_end_matches(':').to_string();
            let title = match caps[3].trim() {
                "" => id.clone(),
                title => title.to_string(),
            };
            (
                checked,
                Task::new(id, title, Lane::Planned, path, TaskKind::Embedded),
            )
        })
        .collect()
}

/// `### <ID>: <title>` entries in `text`.
fn header_tasks(text: &str, path: &Path) -> Vec<Task> {
    HEADER_TASK_RE
        .captures_iter(text)
        .map(|caps| {
            Task::new(
                caps[1].trim(),
                caps[2].trim(),
                Lane::Planned,
                path,
                TaskKind::Embedded,
            )
        })
        .collect()
}
