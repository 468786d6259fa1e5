//! Test fixtures for creating reproducible project trees.
//!
//! Provides pre-built feature layouts for each board format and an optional
//! real git repository.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A test fixture representing a temporary project directory.
///
/// Automatically cleans up when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new().with_directory_board("001-auth");
/// assert!(fixture.path().join("specs/001-auth/tasks/done/WP01.md").exists());
/// ```
pub struct TestFixture {
    temp_dir: TempDir,
    is_git_repo: bool,
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    /// Create an empty project.
    ///
    /// # Panics
    ///
    /// Panics if temporary directory creation fails.
    #[must_use]
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
            is_git_repo: false,
        }
    }

    /// Add a feature with a directory board: WP01 done, WP02 doing and
    /// depending on WP01, WP03 planned.
    ///
    /// # Panics
    ///
    /// Panics if file creation fails.
    #[must_use]
    pub fn with_directory_board(self, feature_id: &str) -> Self {
        let root = format!("specs/{feature_id}");
        self.write(&format!("{root}/spec.md"), "# Spec\n");
        self.write(&format!("{root}/tasks/done/WP01.md"), "# WP01: Scaffold\n");
        self.write(
            &format!("{root}/tasks/doing/WP02.md"),
            "---\ntitle: Parser\ndependencies: [WP01]\n---\n# WP02: Parser\n\n## Activity Log\n- 2024-01-01: [REVIEW] CHANGES REQUESTED by alice\n  - ❌ Missing tests\n",
        );
        self.write(&format!("{root}/tasks/planned/WP03.md"), "# WP03: Render\n\nDepends on: WP02\n");
        std::fs::create_dir_all(self.path().join(format!("{root}/tasks/for_review")))
            .expect("Failed to create lane directory");
        self
    }

    /// Add a feature whose `tasks.md` uses lane headings.
    ///
    /// # Panics
    ///
    /// Panics if file creation fails.
    #[must_use]
    pub fn with_labeled_board(self, feature_id: &str) -> Self {
        self.write(&format!("specs/{feature_id}/tasks.md"), Self::labeled_tasks_content());
        self
    }

    /// Add a feature whose `tasks.md` is organised in phases.
    ///
    /// # Panics
    ///
    /// Panics if file creation fails.
    #[must_use]
    pub fn with_phase_board(self, feature_id: &str) -> Self {
        self.write(&format!("specs/{feature_id}/tasks.md"), Self::phase_tasks_content());
        self
    }

    /// Initialize a git repository and commit the current tree.
    ///
    /// # Panics
    ///
    /// Panics if git initialization fails.
    #[must_use]
    pub fn with_git_repo(mut self) -> Self {
        self.git(&["init", "--quiet"]);
        self.git(&["config", "user.email", "test@example.com"]);
        self.git(&["config", "user.name", "Test User"]);
        self.git(&["config", "commit.gpgsign", "false"]);
        self.is_git_repo = true;
        self.make_commit("Initial commit");
        self
    }

    /// Get the path to the fixture directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path as a PathBuf (owned).
    #[must_use]
    pub fn path_buf(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    /// Path of a feature directory under `specs/`.
    #[must_use]
    pub fn feature_path(&self, feature_id: &str) -> PathBuf {
        self.path().join("specs").join(feature_id)
    }

    /// Check if this is a git repository.
    #[must_use]
    pub fn is_git_repo(&self) -> bool {
        self.is_git_repo && self.path().join(".git").exists()
    }

    /// Write a file relative to the fixture root, creating parents.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write(&self, relative_path: &str, content: &str) {
        let path = self.path().join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(path, content).expect("Failed to write fixture file");
    }

    /// Read a file relative to the fixture root.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read_file(&self, relative_path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.path().join(relative_path))
    }

    /// Stage everything and commit.
    ///
    /// # Panics
    ///
    /// Panics if not a git repo or commit fails.
    pub fn make_commit(&self, message: &str) {
        assert!(self.is_git_repo, "Not a git repository");
        self.git(&["add", "."]);
        self.git(&["commit", "--quiet", "--allow-empty", "-m", message]);
    }

    /// Get the current git commit hash.
    ///
    /// # Panics
    ///
    /// Panics if not a git repo or command fails.
    #[must_use]
    pub fn get_commit_hash(&self) -> String {
        assert!(self.is_git_repo, "Not a git repository");
        self.git(&["rev-parse", "HEAD"]).trim().to_string()
    }

    fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    // =========================================================================
    // Content Templates
    // =========================================================================

    fn labeled_tasks_content() -> &'static str {
        r"# Tasks

## Planned
- [ ] T003 Write docs
### WP-04: Packaging

## In Progress
- [ ] T002 Build API

## Done
- [x] T001 Setup repo
"
    }

    fn phase_tasks_content() -> &'static str {
        r"# Tasks

## Phase 1: Setup
- [x] T001 Create project
- [x] T002 Configure CI

## Phase 2: Core
- [x] T003 Parser
- [ ] T004 Renderer

## Phase 3: Polish
- [ ] T005 Docs
- [ ] T006 Release
"
    }
}

/// Whether a `git` binary is available for tests that need a real repository.
#[must_use]
pub fn git_available() -> bool {
    which::which("git").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_board_fixture() {
        let fixture = TestFixture::new().with_directory_board("001-auth");
        assert!(fixture.feature_path("001-auth").join("tasks/for_review").is_dir());
        assert!(fixture
            .read_file("specs/001-auth/tasks/doing/WP02.md")
            .unwrap()
            .contains("dependencies"));
    }

    #[test]
    fn test_git_repo_fixture() {
        if !git_available() {
            return;
        }
        let fixture = TestFixture::new().with_labeled_board("002-ui").with_git_repo();
        assert!(fixture.is_git_repo());
        assert_eq!(fixture.get_commit_hash().len(), 40);
    }
}
