//! Corruption recovery tests for liferpg.
//!
//! These tests verify the system can handle:
//! - Corrupted daily log files
//! - Corrupted WAL lines
//! - Malformed CSV archive rows
//! - A history store that can't be written

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write as IoWrite;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("liferpg"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_corrupted_daily_log() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    fs::write(data_dir.join("daily_log.json"), "{ invalid json }}}}").unwrap();

    cli()
        .arg("workout")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--routine")
        .arg("swim-prep")
        .arg("--fast-forward")
        .arg("--auto-complete")
        .assert()
        .success()
        .stdout(predicate::str::contains("Last completed: Never"));

    // Rewritten as a valid log
    let content = fs::read_to_string(data_dir.join("daily_log.json")).unwrap();
    let log: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert!(log["days"].is_object());

    // The unreadable original is kept next to it
    let kept: Vec<_> = fs::read_dir(data_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_string_lossy()
                .starts_with("daily_log.json.corrupt-")
        })
        .collect();
    assert_eq!(kept.len(), 1);
    assert_eq!(
        fs::read_to_string(kept[0].path()).unwrap(),
        "{ invalid json }}}}"
    );
}

#[test]
fn test_corrupted_wal_lines_ignored() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    fs::create_dir_all(data_dir.join("wal")).unwrap();
    let wal_path = data_dir.join("wal/rep_history.wal");
    fs::write(&wal_path, "{ invalid json }\n{ more invalid }\n").unwrap();

    cli()
        .arg("target")
        .arg("Dips")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Dips: 8-12 reps"));

    cli()
        .arg("workout")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--routine")
        .arg("calisthenics")
        .arg("--fast-forward")
        .arg("--auto-complete")
        .assert()
        .success();

    // Valid lines appended after the garbage
    let content = fs::read_to_string(&wal_path).unwrap();
    assert_eq!(content.lines().count(), 2 + 4);
}

#[test]
fn test_partial_wal_write() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    fs::create_dir_all(data_dir.join("wal")).unwrap();
    let wal_path = data_dir.join("wal/rep_history.wal");
    let mut file = fs::File::create(&wal_path).unwrap();
    writeln!(
        file,
        r#"{{"id":"6f1c1f9e-3d5e-4a43-9a57-0d2a4c0b8f11","performed_at":"2026-10-18T07:00:00Z","exercise":"Dips","reps":10}}"#
    )
    .unwrap();
    write!(file, r#"{{"id":"truncated","perf"#).unwrap();
    drop(file);

    // avg(10) + 2
    cli()
        .arg("target")
        .arg("Dips")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Dips: 12 reps"));

    cli()
        .arg("rollup")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled up 1 rep records"));
}

#[test]
fn test_malformed_csv_rows_skipped() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    fs::write(
        data_dir.join("rep_history.csv"),
        "id,performed_at,exercise,reps\n\
         not-a-uuid,2026-10-18T07:00:00Z,Dips,40\n\
         6f1c1f9e-3d5e-4a43-9a57-0d2a4c0b8f11,2026-10-18T07:00:00Z,Dips,6\n",
    )
    .unwrap();

    cli()
        .arg("target")
        .arg("Dips")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Dips: 8 reps"));
}

#[cfg(unix)]
#[test]
fn test_unwritable_history_does_not_stop_session() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    // A directory where the WAL file should be makes every append fail
    fs::create_dir_all(data_dir.join("wal/rep_history.wal")).unwrap();

    cli()
        .arg("workout")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--routine")
        .arg("abs")
        .arg("--fast-forward")
        .arg("--auto-complete")
        .assert()
        .success()
        .stdout(predicate::str::contains("counted for this session"))
        .stdout(predicate::str::contains("Session complete: abs"))
        .stderr(predicate::str::contains("Could not save to history"));
}
