//! Integration tests for the `cascade` CLI.
//!
//! Each test writes a snapshot file into a temp directory, runs `cascade`
//! against it as a subprocess, and verifies stdout and/or file contents.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

/// Get the path to the built `cascade` binary.
fn cascade_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("cascade");
    path
}

const SNAPSHOT: &str = r#"{
  "timezone": "UTC",
  "projects": [
    { "id": "p1", "name": "Home (=)" },
    { "id": "p2", "name": "Inbox" }
  ],
  "tasks": [
    { "id": "1", "project_id": "p1", "content": "Errands (-)", "child_order": 1 },
    { "id": "2", "project_id": "p1", "parent_id": "1", "content": "Buy stamps", "child_order": 1 },
    { "id": "3", "project_id": "p1", "parent_id": "1", "content": "Post letter", "child_order": 2 },
    { "id": "4", "project_id": "p2", "content": "Someday maybe", "child_order": 1 }
  ],
  "labels": [
    { "id": "NoDate", "name": "NoDate" }
  ]
}
"#;

/// Write the standard snapshot into `root` and return its path.
fn create_snapshot(root: &Path, content: &str) -> PathBuf {
    let path = root.join("tasks.json");
    fs::write(&path, content).unwrap();
    path
}

/// Run `cascade` with the given args in the given directory, returning (stdout, stderr, success).
fn run_cascade(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(cascade_bin())
        .args(args)
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir)
        .env_remove("RUST_LOG")
        .env_remove("TODOIST_API_KEY")
        .output()
        .expect("failed to run cascade");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `cascade` expecting success, return stdout.
fn run_cascade_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_cascade(dir, args);
    if !success {
        panic!(
            "cascade {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

fn task<'a>(snapshot: &'a Value, id: &str) -> &'a Value {
    snapshot["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["id"] == id)
        .unwrap()
}

fn labels(task: &Value) -> Vec<String> {
    task["labels"]
        .as_array()
        .map(|a| a.iter().map(|l| l.as_str().unwrap().to_string()).collect())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

#[test]
fn test_dump_text() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_snapshot(tmp.path(), SNAPSHOT);

    let out = run_cascade_ok(tmp.path(), &["--snapshot", "tasks.json", "dump"]);
    assert!(out.starts_with("Projects: 2, Tasks: 4"));
    assert!(out.contains("== Home (=) (p1) =="));
    assert!(out.contains("  [ ] 2 Buy stamps"));
    assert!(out.contains("[ ] 4 Someday maybe"));
}

#[test]
fn test_dump_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_snapshot(tmp.path(), SNAPSHOT);

    let out = run_cascade_ok(tmp.path(), &["--snapshot", "tasks.json", "--json", "dump"]);
    let json: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["project_count"], 2);
    assert_eq!(json["task_count"], 4);
    assert_eq!(json["tasks"].as_array().unwrap().len(), 4);
}

#[test]
fn test_plan_shows_verdicts_without_changing_the_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = create_snapshot(tmp.path(), SNAPSHOT);

    let out = run_cascade_ok(tmp.path(), &["--snapshot", "tasks.json", "plan"]);
    assert!(out.contains("[take] Errands (-) (tree activate, children serial)"));
    assert!(out.contains("    [activate] Buy stamps"));
    assert!(out.contains("    [take] Post letter"));
    assert!(out.contains("[inert] Someday maybe"));
    assert_eq!(fs::read_to_string(path).unwrap(), SNAPSHOT);
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

#[test]
fn test_dry_run_leaves_the_store_untouched() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = create_snapshot(tmp.path(), SNAPSHOT);

    let out = run_cascade_ok(tmp.path(), &["--snapshot", "tasks.json"]);
    assert!(out.contains("not committed"));
    assert_eq!(fs::read_to_string(path).unwrap(), SNAPSHOT);
}

#[test]
fn test_execute_commits_to_the_snapshot() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = create_snapshot(tmp.path(), SNAPSHOT);

    let out = run_cascade_ok(tmp.path(), &["--snapshot", "tasks.json", "--json", "run", "-x"]);
    let report: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["committed"], true);

    let after: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let stamps = task(&after, "2");
    assert_eq!(stamps["due"]["string"], "today");
    assert!(labels(stamps).is_empty());
    let letter = task(&after, "3");
    assert!(letter["due"].is_null());
    assert_eq!(labels(letter), vec!["NoDate"]);
    assert!(task(&after, "4")["labels"].as_array().unwrap().is_empty());

    // Converged: a second run has nothing to do
    let out = run_cascade_ok(tmp.path(), &["--snapshot", "tasks.json", "--json", "-x"]);
    let report: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["changes"], 0);
    assert_eq!(report["committed"], false);
}

#[test]
fn test_custom_markers_from_config_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_snapshot(
        tmp.path(),
        &SNAPSHOT
            .replace("Home (=)", "Home [p]")
            .replace("Errands (-)", "Errands [s]")
            .replace(r#""NoDate""#, r#""Waiting""#),
    );
    fs::write(
        tmp.path().join("cascade.toml"),
        r#"[markers]
parallel_suffix = "[p]"
serial_suffix = "[s]"
blocking_label = "Waiting"
"#,
    )
    .unwrap();

    let out = run_cascade_ok(
        tmp.path(),
        &["--config", "cascade.toml", "--snapshot", "tasks.json", "plan"],
    );
    assert!(out.contains("[take] Errands [s] (tree activate, children serial)"));
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn test_missing_blocking_label_is_fatal() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_snapshot(tmp.path(), SNAPSHOT);

    let (_, stderr, success) = run_cascade(tmp.path(), &["--snapshot", "tasks.json", "-l", "Blocked"]);
    assert!(!success);
    assert!(stderr.contains("\"Blocked\" doesn't exist"));
}

#[test]
fn test_missing_api_key_is_fatal() {
    let tmp = tempfile::TempDir::new().unwrap();

    let (_, stderr, success) = run_cascade(tmp.path(), &["run"]);
    assert!(!success);
    assert!(stderr.contains("no API key set"));
}

#[test]
fn test_failed_run_is_logged_and_skipped() {
    let tmp = tempfile::TempDir::new().unwrap();
    let broken = SNAPSHOT.replace(
        r#""content": "Someday maybe", "child_order": 1"#,
        r#""content": "Someday maybe", "child_order": 1, "due": { "date": "soon", "is_recurring": true }"#,
    );
    let path = create_snapshot(tmp.path(), &broken);

    let (stdout, stderr, success) = run_cascade(tmp.path(), &["--snapshot", "tasks.json", "-x"]);
    assert!(success, "stderr: {}", stderr);
    assert!(stdout.contains("run skipped: malformed due date"));
    assert!(stderr.contains("error trying to sync with the task store"));
    assert_eq!(fs::read_to_string(path).unwrap(), broken);
}

#[test]
fn test_unreadable_snapshot_fails() {
    let tmp = tempfile::TempDir::new().unwrap();

    let (_, stderr, success) = run_cascade(tmp.path(), &["--snapshot", "missing.json", "dump"]);
    assert!(!success);
    assert!(stderr.contains("error:"));
}
