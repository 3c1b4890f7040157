//! Integration tests for the liferpg binary.
//!
//! These tests verify end-to-end behavior including:
//! - Full session traversal in fast-forward auto mode
//! - Interactive commands fed through stdin
//! - Target recommendations from logged history
//! - CSV rollup and daily-log fold-in

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("liferpg"))
}

fn run_auto(data_dir: &Path, routine: &str) {
    cli()
        .arg("workout")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--routine")
        .arg(routine)
        .arg("--fast-forward")
        .arg("--auto-complete")
        .assert()
        .success();
}

fn wal_lines(data_dir: &Path) -> Vec<Value> {
    let content = fs::read_to_string(data_dir.join("wal/rep_history.wal")).unwrap_or_default();
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("valid WAL line"))
        .collect()
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Life RPG guided workout sessions"));
}

#[test]
fn test_auto_session_logs_every_segment() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli()
        .arg("workout")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--fast-forward")
        .arg("--auto-complete")
        .assert()
        .success()
        .stdout(predicate::str::contains("Last completed: Never"))
        .stdout(predicate::str::contains("FORM CHECK"))
        .stdout(predicate::str::contains("Session complete: base"));

    let records = wal_lines(data_dir);
    assert_eq!(records.len(), 12);
    assert_eq!(records[0]["exercise"], "Goblet Squats");
    assert_eq!(records[0]["reps"], 8);
    assert_eq!(records[11]["exercise"], "Plank");
}

#[test]
fn test_base_session_marks_workout_done() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run_auto(data_dir, "base");

    let log: Value =
        serde_json::from_str(&fs::read_to_string(data_dir.join("daily_log.json")).unwrap())
            .unwrap();
    let days = log["days"].as_object().unwrap();
    assert_eq!(days.len(), 1);
    let today = days.values().next().unwrap();
    assert_eq!(today["workout_done"], true);
    assert_eq!(today["reps"]["Push-ups"], 18);

    cli()
        .arg("last")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Last completed: Never").not());
}

#[test]
fn test_side_quest_recorded_separately() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run_auto(data_dir, "abs");

    assert_eq!(wal_lines(data_dir).len(), 5);

    let log: Value =
        serde_json::from_str(&fs::read_to_string(data_dir.join("daily_log.json")).unwrap())
            .unwrap();
    let today = log["days"].as_object().unwrap().values().next().unwrap().clone();
    assert_eq!(today["workout_done"], false);
    assert_eq!(today["side_quests"][0], "abs");

    cli()
        .arg("last")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Last completed: Never"));
}

#[test]
fn test_invalid_routine_rejected() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli()
        .arg("workout")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--routine")
        .arg("yoga")
        .arg("--auto-complete")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown routine: yoga"));

    assert!(wal_lines(data_dir).is_empty());
    assert!(!data_dir.join("daily_log.json").exists());
}

#[test]
fn test_target_follows_history() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli()
        .arg("target")
        .arg("Push-ups")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Push-ups: 8-12 reps"));

    // Set 1 takes the beginner 8, set 2 takes 8 + 2 = 10; avg(10, 8) + 2 = 11
    run_auto(data_dir, "base");

    cli()
        .arg("target")
        .arg("Push-ups")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Push-ups: 11 reps"));
}

#[test]
fn test_target_for_unknown_exercise() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("target")
        .arg("Turkish Get-up")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Turkish Get-up: 8-12 reps"));
}

#[test]
fn test_routines_listing() {
    cli()
        .arg("routines")
        .assert()
        .success()
        .stdout(predicate::str::contains("base"))
        .stdout(predicate::str::contains("12 segments"))
        .stdout(predicate::str::contains("swim-prep"))
        .stdout(predicate::str::contains("calisthenics"));
}

#[test]
fn test_rollup_creates_csv_and_keeps_targets() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run_auto(data_dir, "base");

    cli()
        .arg("rollup")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--cleanup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled up 12 rep records"))
        .stdout(predicate::str::contains("Cleaned up 1 processed WAL"));

    let csv_content = fs::read_to_string(data_dir.join("rep_history.csv")).unwrap();
    assert!(csv_content.starts_with("id,performed_at,exercise,reps"));
    assert!(wal_lines(data_dir).is_empty());

    cli()
        .arg("target")
        .arg("Push-ups")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Push-ups: 11 reps"));
}

#[test]
fn test_empty_rollup() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("rollup")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to roll up"));
}

#[test]
fn test_interactive_quit_from_preview() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli()
        .arg("workout")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--routine")
        .arg("base")
        .arg("--fast-forward")
        .write_stdin("q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session ended."));

    assert!(wal_lines(data_dir).is_empty());
    assert!(!data_dir.join("daily_log.json").exists());
}

#[test]
fn test_preview_only_starts_on_enter() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli()
        .arg("workout")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--routine")
        .arg("abs")
        .arg("--fast-forward")
        .write_stdin("p\n+\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unknown command: p"))
        .stdout(predicate::str::contains("Unknown command: +"))
        .stdout(predicate::str::contains("[p] pause").not())
        .stdout(predicate::str::contains("Session ended."));

    assert!(wal_lines(data_dir).is_empty());
}

#[test]
fn test_interactive_rejects_negative_reps() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    // start, mark done, bad count, good count, quit during rest
    cli()
        .arg("workout")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--routine")
        .arg("calisthenics")
        .arg("--fast-forward")
        .write_stdin("\n\n-3\n5\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid rep count: -3 is negative"))
        .stdout(predicate::str::contains("5 reps logged"))
        .stdout(predicate::str::contains("Session ended."));

    let records = wal_lines(data_dir);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["exercise"], "Pull-ups");
    assert_eq!(records[0]["reps"], 5);
}

#[test]
fn test_interactive_routine_prompt_retries() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("workout")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--fast-forward")
        .write_stdin("yoga\nabs\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unknown routine: yoga"))
        .stdout(predicate::str::contains("Crunches"));
}
