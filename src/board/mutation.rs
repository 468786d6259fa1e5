//! Task creation and lane moves, the only writes the engine performs.
//!
//! There is no cross-process locking. Two writers racing to move the same
//! file both attempt a rename; the loser sees the filesystem's not-found.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use super::detail::work_package_file;
use super::format::{detect_format, has_lane_dirs, tasks_dir, tasks_file, BoardFormat};
use super::parsing::{first_title, parse_board, LANE_SECTION_RE};
use super::{is_plain_name, Board, Lane, Task, TaskKind};
use crate::error::{BoardError, Result};

/// Next free `T{nnn}` id: one past the board's task count, bumped past
/// anything already taken.
#[must_use]
pub fn next_task_id(board: &Board, feature_root: &Path) -> String {
    let mut n = board.total_tasks() + 1;
    loop {
        let id = format!("T{n:03}");
        let taken = board.find(&id).is_some()
            || Lane::ALL.iter().any(|lane| {
                tasks_dir(feature_root)
                    .join(lane.as_str())
                    .join(format!("{id}.md"))
                    .exists()
            });
        if !taken {
            return id;
        }
        n += 1;
    }
}

/// Create a task in the `planned` lane.
///
/// Directory boards get a new `tasks/planned/<id>.md`. Single-file boards
/// get a `### <id>: <title>` entry in `tasks.md`: at the end of the planned
/// section for lane-sectioned files, at the end of the file for flat ones.
/// A missing `tasks.md` is created with empty lane sections.
///
/// # Errors
///
/// Returns an error if the title is empty, the board is organised in
/// phases, or the file cannot be written.
pub fn create_task(feature_root: &Path, title: &str, description: &str) -> Result<Task> {
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        return Err(BoardError::invalid_identifier(title, "task title is empty"));
    }

    let board = parse_board(feature_root);
    let id = next_task_id(&board, feature_root);

    let task = if has_lane_dirs(feature_root) {
        let planned = tasks_dir(feature_root).join(Lane::Planned.as_str());
        std::fs::create_dir_all(&planned)?;
        let path = planned.join(format!("{id}.md"));

        // JSON strings are valid YAML scalars, so quoting survives colons.
        let quoted = serde_json::to_string(&title)?;
        let content = format!(
            "---\ntitle: {quoted}\nstatus: planned\n---\n\n# {id}: {title}\n\n{description}\n"
        );
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?
            .write_all(content.as_bytes())?;

        Task::new(&id, &title, Lane::Planned, path, TaskKind::WorkPackage)
    } else {
        let path = tasks_file(feature_root);
        let entry = format!("\n\n### {id}: {title}\n{}\n", inert_description(description));
        match detect_format(feature_root) {
            None => {
                std::fs::create_dir_all(feature_root)?;
                OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)?
                    .write_all(
                        format!("# Tasks\n\n## Planned{entry}\n\n## Doing\n\n## For Review\n\n## Done\n")
                            .as_bytes(),
                    )?;
            }
            Some(BoardFormat::LabeledSections) => {
                let content = std::fs::read_to_string(&path)?;
                std::fs::write(&path, insert_into_planned(&content, &entry))?;
            }
            Some(BoardFormat::PhaseSections) => {
                return Err(BoardError::unsupported("create task", BoardFormat::PhaseSections));
            }
            Some(_) => {
                OpenOptions::new()
                    .append(true)
                    .open(&path)?
                    .write_all(entry.as_bytes())?;
            }
        }

        Task::new(&id, &title, Lane::Planned, path, TaskKind::Embedded)
    };

    tracing::info!(task = %task.id, path = %task.path.display(), "created task");
    Ok(task)
}

/// Insert `entry` at the end of the first planned section. Without one, a
/// `## Planned` section holding the entry is opened before the first lane
/// heading.
fn insert_into_planned(content: &str, entry: &str) -> String {
    let headings: Vec<_> = LANE_SECTION_RE.captures_iter(content).collect();
    let planned = headings
        .iter()
        .position(|caps| Lane::from_heading(&caps[1]) == Lane::Planned);

    let Some(i) = planned else {
        let start = headings
            .first()
            .and_then(|caps| caps.get(0))
            .map_or(content.len(), |m| m.start());
        return format!("{}## Planned{entry}\n{}", &content[..start], &content[start..]);
    };

    let end = headings
        .get(i + 1)
        .and_then(|next| next.get(0))
        .map_or(content.len(), |m| m.start());

    let mut updated = format!("{}{entry}", content[..end].trim_end());
    let tail = &content[end..];
    if !tail.is_empty() {
        updated.push('\n');
        updated.push_str(tail);
    }
    updated
}

/// Indent description lines that would parse as headings or checkbox tasks,
/// so a description cannot re-section the file or add entries of its own.
fn inert_description(description: &str) -> String {
    description
        .lines()
        .map(|line| {
            if line.starts_with('#') {
                format!("    {line}")
            } else if line.starts_with("- [") {
                format!("  {line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Move a work-package file to another lane with a single rename.
///
/// Moving a task into the lane it already occupies is a no-op.
///
/// # Errors
///
/// - `UnsupportedMutation` for single-file boards
/// - `TaskNotFound` when no lane directory holds the task
/// - `LaneOccupied` when the target lane already has a file of that name
/// - `Io` when the rename fails, including a concurrent move winning first
pub fn move_task(feature_root: &Path, task_id: &str, lane: Lane) -> Result<Task> {
    let feature_id = feature_label(feature_root);
    if !is_plain_name(task_id) {
        return Err(BoardError::invalid_identifier(task_id, "task id must be a plain file name"));
    }
    if !has_lane_dirs(feature_root) {
        let format = detect_format(feature_root).unwrap_or(BoardFormat::Flat);
        return Err(BoardError::unsupported("move task", format));
    }

    let (from, source) = work_package_file(feature_root, task_id, None)
        .ok_or_else(|| BoardError::task_not_found(&feature_id, task_id))?;

    let target_dir = tasks_dir(feature_root).join(lane.as_str());
    let target = target_dir.join(format!("{task_id}.md"));

    if from != lane {
        if target.exists() {
            return Err(BoardError::LaneOccupied {
                task_id: task_id.to_string(),
                lane,
            });
        }
        std::fs::create_dir_all(&target_dir)?;
        std::fs::rename(&source, &target)?;
        tracing::info!(task = task_id, from = %from, to = %lane, "moved task");
    }

    let title = std::fs::read_to_string(&target)
        .ok()
        .and_then(|content| first_title(&content))
        .unwrap_or_else(|| task_id.to_string());
    Ok(Task::new(task_id, title, lane, target, TaskKind::WorkPackage))
}

fn feature_label(feature_root: &Path) -> String {
    feature_root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
