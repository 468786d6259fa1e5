//! Single-task lookup with content and resolved dependencies.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::dependencies::{body_dependency_ids, DependencyResolver};
use super::format::{tasks_dir, tasks_file};
use super::frontmatter::parse_frontmatter;
use super::parsing::{first_title, parse_tasks_markdown};
use super::{is_plain_name, Dependency, Lane, TaskKind};

/// Everything known about one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub id: String,
    pub title: String,
    pub lane: Lane,
    pub content: String,
    pub dependencies: Vec<Dependency>,
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: TaskKind,
}

/// Look up a task in a feature.
///
/// `lane_hint` is tried first for work-package files; the remaining lanes
/// follow in scan order. Falls back to an entry in `tasks.md`.
#[must_use]
pub fn task_detail(feature_root: &Path, task_id: &str, lane_hint: Option<Lane>) -> Option<TaskDetail> {
    if !is_plain_name(task_id) {
        tracing::warn!(task = task_id, "rejecting task id with path components");
        return None;
    }

    if let Some(found) = work_package_file(feature_root, task_id, lane_hint) {
        return work_package_detail(feature_root, task_id, found);
    }

    let file = tasks_file(feature_root);
    if !file.is_file() {
        return None;
    }
    match std::fs::read_to_string(&file) {
        Ok(content) => embedded_detail(feature_root, &file, &content, task_id, lane_hint),
        Err(e) => {
            tracing::warn!(path = %file.display(), error = %e, "failed to read tasks file");
            None
        }
    }
}

/// Locate `tasks/<lane>/<task_id>.md`, hint lane first.
pub(crate) fn work_package_file(
    feature_root: &Path,
    task_id: &str,
    lane_hint: Option<Lane>,
) -> Option<(Lane, PathBuf)> {
    let dir = tasks_dir(feature_root);
    if !dir.is_dir() {
        return None;
    }
    let file_name = format!("{task_id}.md");
    lane_hint
        .into_iter()
        .chain(Lane::ALL.into_iter().filter(|lane| Some(*lane) != lane_hint))
        .map(|lane| (lane, dir.join(lane.as_str()).join(&file_name)))
        .find(|(_, path)| path.is_file())
}

fn work_package_detail(
    feature_root: &Path,
    task_id: &str,
    (lane, path): (Lane, PathBuf),
) -> Option<TaskDetail> {
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read task file");
            return None;
        }
    };

    let meta = parse_frontmatter(&content);
    let title = meta
        .title
        .clone()
        .filter(|t| t != task_id)
        .or_else(|| first_title(&content))
        .unwrap_or_else(|| task_id.to_string());

    let ids = match meta.dependencies {
        Some(ids) if !ids.is_empty() => ids,
        _ => body_dependency_ids(&content),
    };
    let dependencies = DependencyResolver::new(feature_root).resolve_all(&ids);

    Some(TaskDetail {
        id: task_id.to_string(),
        title,
        lane,
        content,
        dependencies,
        path,
        kind: TaskKind::WorkPackage,
    })
}

fn embedded_detail(
    feature_root: &Path,
    file: &Path,
    content: &str,
    task_id: &str,
    lane_hint: Option<Lane>,
) -> Option<TaskDetail> {
    let escaped = regex::escape(task_id);
    let lane = parse_tasks_markdown(content, file)
        .lane_of(task_id)
        .or(lane_hint)
        .unwrap_or(Lane::Planned);

    let header_re = Regex::new(&format!(r"(?m)^### {escaped}(?::|[ \t])[ \t]*(.+?)[ \t\r]*$")).ok()?;
    if let Some(caps) = header_re.captures(content) {
        let title = caps[1].trim().to_string();
        let section_start = caps.get(0).map_or(content.len(), |m| m.end());
        let section = section_until_heading(&content[section_start..]);
        let ids = body_dependency_ids(section);
        let dependencies = DependencyResolver::new(feature_root).resolve_all(&ids);

        return Some(TaskDetail {
            id: task_id.to_string(),
            content: format!("# {task_id}: {title}\n\n{}", section.trim()),
            title,
            lane,
            dependencies,
            path: file.to_path_buf(),
            kind: TaskKind::Embedded,
        });
    }

    let checkbox_re =
        Regex::new(&format!(r"(?m)^- \[([ xX])\] {escaped}(?:[ \t:]+(.*?))?[ \t\r]*$")).ok()?;
    let caps = checkbox_re.captures(content)?;
    let done = caps[1].eq_ignore_ascii_case("x");
    let title = caps
        .get(2)
        .map(|m| m.as_str().trim())
        .filter(|t| !t.is_empty())
        .unwrap_or(task_id)
        .to_string();
    let status = if done { "Done" } else { "Pending" };

    Some(TaskDetail {
        id: task_id.to_string(),
        content: format!("# {task_id}\n\n{title}\n\n**Status**: {status}"),
        title,
        lane,
        dependencies: Vec::new(),
        path: file.to_path_buf(),
        kind: TaskKind::Embedded,
    })
}

/// Text up to the next `###` or `##` heading.
fn section_until_heading(text: &str) -> &str {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if offset > 0 && (line.starts_with("### ") || line.starts_with("## ")) {
            return &text[..offset];
        }
        offset += line.len();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_work_package_detail() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "tasks/done/WP01.md", "# WP01\n");
        write(
            temp.path(),
            "tasks/doing/WP02.md",
            "---\ntitle: Parser\ndependencies: [WP01, WP09]\n---\n# WP02: ignored\n",
        );

        let detail = task_detail(temp.path(), "WP02", None).unwrap();
        assert_eq!(detail.title, "Parser");
        assert_eq!(detail.lane, Lane::Doing);
        assert_eq!(detail.kind, TaskKind::WorkPackage);
        assert!(detail.content.contains("# WP02: ignored"));
        assert_eq!(
            detail.dependencies,
            vec![
                Dependency { id: "WP01".into(), lane: Lane::Done },
                Dependency { id: "WP09".into(), lane: Lane::Planned },
            ]
        );
    }

    #[test]
    fn test_work_package_title_falls_back_to_heading() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "tasks/planned/WP03.md", "# WP03: Render board\n\nRequires: WP01\n");
        let detail = task_detail(temp.path(), "WP03", Some(Lane::Done)).unwrap();
        assert_eq!(detail.title, "WP03: Render board");
        assert_eq!(detail.lane, Lane::Planned);
        assert_eq!(detail.dependencies.len(), 1);
    }

    #[test]
    fn test_lane_hint_wins_for_duplicates() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "tasks/planned/WP04.md", "# planned copy\n");
        write(temp.path(), "tasks/done/WP04.md", "# done copy\n");
        let hinted = task_detail(temp.path(), "WP04", Some(Lane::Done)).unwrap();
        assert_eq!(hinted.lane, Lane::Done);
        let unhinted = task_detail(temp.path(), "WP04", None).unwrap();
        assert_eq!(unhinted.lane, Lane::Planned);
    }

    #[test]
    fn test_embedded_header_detail() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "tasks.md",
            "## Doing\n### WP-01: Build API\nDo the thing.\n\nDepends on: WP-00\n\n### WP-02: Next\nother\n",
        );
        let detail = task_detail(temp.path(), "WP-01", None).unwrap();
        assert_eq!(detail.title, "Build API");
        assert_eq!(detail.lane, Lane::Doing);
        assert_eq!(
            detail.content,
            "# WP-01: Build API\n\nDo the thing.\n\nDepends on: WP-00"
        );
        assert_eq!(detail.dependencies[0].id, "WP-00");
        assert!(!detail.content.contains("other"));
    }

    #[test]
    fn test_embedded_checkbox_detail() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "tasks.md", "- [x] T0012 other\n- [x] T001 Setup repo\n");
        let detail = task_detail(temp.path(), "T001", None).unwrap();
        assert_eq!(detail.title, "Setup repo");
        assert_eq!(detail.lane, Lane::Done);
        assert_eq!(detail.content, "# T001\n\nSetup repo\n\n**Status**: Done");
    }

    #[test]
    fn test_missing_task_is_none() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "tasks.md", "- [ ] T001 a\n");
        assert!(task_detail(temp.path(), "T404", None).is_none());
    }

    #[test]
    fn test_path_like_task_id_rejected() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "secret.md", "# nope\n");
        assert!(task_detail(temp.path(), "../secret", None).is_none());
    }
}
