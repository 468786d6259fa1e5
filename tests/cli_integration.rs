//! Integration tests for the specboard CLI

use assert_cmd::cargo;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a Command for the specboard binary
fn specboard() -> Command {
    Command::new(cargo::cargo_bin!("specboard"))
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Project with one directory-lane feature.
fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "specs/001-auth/spec.md", "# Auth\n");
    write(temp.path(), "specs/001-auth/tasks/done/WP01.md", "# WP01: Scaffold\n");
    write(
        temp.path(),
        "specs/001-auth/tasks/planned/WP02.md",
        "# WP02: Login\n\nDepends on: WP01\n",
    );
    temp
}

fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

#[test]
fn test_help() {
    specboard()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Task boards and commit history"));
}

#[test]
fn test_version() {
    specboard()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_features_lists_feature() {
    let temp = project();

    specboard()
        .arg("--project")
        .arg(temp.path())
        .arg("features")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"001-auth\""));
}

#[test]
fn test_board_outputs_lanes() {
    let temp = project();

    let output = specboard()
        .arg("--project")
        .arg(temp.path())
        .args(["board", "001-auth"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let board: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(board["format"], "directory-lanes");
    assert_eq!(board["lanes"]["done"][0]["id"], "WP01");
    assert_eq!(board["lanes"]["planned"][0]["id"], "WP02");
}

#[test]
fn test_unknown_feature_fails() {
    let temp = project();

    specboard()
        .arg("--project")
        .arg(temp.path())
        .args(["board", "404-missing"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_task_resolves_dependencies() {
    let temp = project();

    specboard()
        .arg("--project")
        .arg(temp.path())
        .args(["task", "001-auth", "WP02"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"lane\": \"done\""));
}

#[test]
fn test_move_renames_file() {
    let temp = project();

    specboard()
        .arg("--project")
        .arg(temp.path())
        .args(["move", "001-auth", "WP02", "doing"])
        .assert()
        .success();

    assert!(temp.path().join("specs/001-auth/tasks/doing/WP02.md").exists());
    assert!(!temp.path().join("specs/001-auth/tasks/planned/WP02.md").exists());
}

#[test]
fn test_move_rejects_unknown_lane() {
    let temp = project();

    specboard()
        .arg("--project")
        .arg(temp.path())
        .args(["move", "001-auth", "WP02", "archived"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown lane"));
}

#[test]
fn test_create_writes_planned_file() {
    let temp = project();

    specboard()
        .arg("--project")
        .arg(temp.path())
        .args(["create", "001-auth", "--title", "Logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"T003\""));

    assert!(temp.path().join("specs/001-auth/tasks/planned/T003.md").exists());
}

#[test]
fn test_malformed_config_fails() {
    let temp = project();
    write(temp.path(), ".spec-mix/config.json", "{ not json");

    specboard()
        .arg("--project")
        .arg(temp.path())
        .arg("features")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config"));
}

#[test]
fn test_untracked_outside_repository_is_empty() {
    let temp = project();

    specboard()
        .arg("--project")
        .arg(temp.path())
        .arg("untracked")
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}

#[test]
fn test_commits_from_real_repository() {
    if which::which("git").is_err() {
        return;
    }
    let temp = project();
    git(temp.path(), &["init", "--quiet"]);
    git(temp.path(), &["config", "user.email", "test@example.com"]);
    git(temp.path(), &["config", "user.name", "Test User"]);
    git(temp.path(), &["config", "commit.gpgsign", "false"]);
    git(temp.path(), &["add", "."]);
    git(temp.path(), &["commit", "--quiet", "-m", "[WP01] scaffold auth"]);
    write(temp.path(), "README.md", "hello\n");
    git(temp.path(), &["add", "."]);
    git(temp.path(), &["commit", "--quiet", "-m", "Add readme"]);

    specboard()
        .arg("--project")
        .arg(temp.path())
        .args(["commits", "WP01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[WP01] scaffold auth"))
        .stdout(predicate::str::contains("Add readme").not());

    specboard()
        .arg("--project")
        .arg(temp.path())
        .arg("untracked")
        .assert()
        .success()
        .stdout(predicate::str::contains("Add readme"))
        .stdout(predicate::str::contains("README.md"));
}
