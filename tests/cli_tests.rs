#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::str::contains as str_contains;
use tempfile::TempDir;

#[allow(deprecated)]
fn run_cli(dir: &TempDir, script: &str) -> assert_cmd::assert::Assert {
    let db = dir.path().join("cli.db");
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.current_dir(dir.path())
        .arg("--db")
        .arg(db)
        .arg("--pivot")
        .arg("2024-05-15")
        .write_stdin(script.to_string())
        .assert()
}

const SETUP: &str = "project new Demo\nadd Alpha\nsub 1 Beta\ndates 2 2024-05-10 2024-05-12\n";

#[test]
fn cli_builds_hierarchy() {
    let dir = TempDir::new().unwrap();
    run_cli(&dir, &format!("{SETUP}show\nquit\n"))
        .success()
        .stdout(str_contains("Created project Demo."))
        .stdout(str_contains("Added task Beta."))
        .stdout(str_contains("Dates set."))
        .stdout(str_contains("Beta [pending] 0% 2024-05-10 .. 2024-05-12"));
}

#[test]
fn cli_drag_moves_task_dates() {
    let dir = TempDir::new().unwrap();
    run_cli(&dir, &format!("{SETUP}drag 2 move 90\nquit\n"))
        .success()
        .stdout(str_contains("Dates now 2024-05-13 .. 2024-05-15."));
}

#[test]
fn cli_rejects_invalid_resize() {
    let dir = TempDir::new().unwrap();
    run_cli(&dir, &format!("{SETUP}drag 2 start 150\ndrag 1 move 30\nquit\n"))
        .success()
        .stdout(str_contains("No change."))
        .stdout(str_contains(
            "Task needs both a start and an end date to be dragged.",
        ));
}

#[test]
fn cli_timeline_window_follows_navigation() {
    let dir = TempDir::new().unwrap();
    run_cli(&dir, &format!("{SETUP}gantt\nnext\nquit\n"))
        .success()
        .stdout(str_contains("window 2024-04-01 .. 2024-07-31 (pivot 2024-05-15)"))
        .stdout(str_contains("window 2024-05-01 .. 2024-08-31 (pivot 2024-06-15)"));
}

#[test]
fn cli_daily_report_lists_todos() {
    let dir = TempDir::new().unwrap();
    let script = format!(
        "{SETUP}todo add 2 2024-05-10\ntodo new 2024-05-10 Call vendor\ntodo toggle 1 2024-05-10\nreport 2024-05-10 Busy day\nquit\n"
    );
    run_cli(&dir, &script)
        .success()
        .stdout(str_contains("# Daily Report - 2024-05-10"))
        .stdout(str_contains("- [x] Demo: Beta"))
        .stdout(str_contains("- [ ] Call vendor"))
        .stdout(str_contains("## Memo\nBusy day"));
}

#[test]
fn cli_exports_project_tasks() {
    let dir = TempDir::new().unwrap();
    let export = dir.path().join("tasks.json");
    let script = format!("{SETUP}export json {}\nquit\n", export.display());
    run_cli(&dir, &script)
        .success()
        .stdout(str_contains("Exported 2 tasks to"));

    let (project_id, tasks) = wbs_timeline::load_tasks_from_json(&export).unwrap();
    assert!(!project_id.is_empty());
    assert_eq!(tasks.len(), 2);
}

#[test]
fn cli_reports_invalid_dates() {
    let dir = TempDir::new().unwrap();
    run_cli(&dir, "project new Demo\nadd Alpha\ndates 1 2024-05-12 2024-05-10\nquit\n")
        .success()
        .stdout(str_contains("is after end date"));
}

#[test]
fn cli_lists_statuses_for_unknown_status() {
    let dir = TempDir::new().unwrap();
    run_cli(&dir, "project new Demo\nadd Alpha\nstatus 1 paused\nstatus 1 done\nquit\n")
        .success()
        .stdout(str_contains(
            "unknown task status 'paused' (expected one of: pending, in_progress, completed, cancelled)",
        ))
        .stdout(str_contains("Alpha [completed]"));
}
