//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cogbattery() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("cogbattery").unwrap();
    cmd.env_remove("COGBATTERY_ENDPOINT");
    cmd
}

/// Write a config that keeps locks and results inside `dir`.
fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("cogbattery.toml");
    let content = format!(
        "lock_path = {:?}\noutput_dir = {:?}\n",
        dir.join("locks.json").display().to_string(),
        dir.join("results").display().to_string(),
    );
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();

    cogbattery()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created cogbattery.toml"));

    assert!(dir.path().join("cogbattery.toml").exists());

    cogbattery()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn status_of_fresh_week() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    cogbattery()
        .args(["status", "--participant", "1001", "--week", "2", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Participant 1001, week 2: not started"));
}

#[test]
fn status_reads_lock_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    std::fs::write(
        dir.path().join("locks.json"),
        r#"{"testlock_1001_week_1": "completed", "testlock_1001_week_2": "started"}"#,
    )
    .unwrap();

    cogbattery()
        .args(["status", "--participant", "1001", "--week", "1", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("week 1: completed"));

    cogbattery()
        .args(["status", "--participant", "1001", "--week", "2", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("week 2: started"));
}

#[test]
fn status_rejects_bad_participant() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    cogbattery()
        .args(["status", "--participant", "ab12", "--week", "1", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("digits only"));
}

#[test]
fn status_rejects_week_out_of_range() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    cogbattery()
        .args(["status", "--participant", "1", "--week", "4", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("from 1 to 3"));
}

#[test]
fn show_prints_summary_table() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.json");
    let results = serde_json::json!({
        "session_id": "00000000-0000-0000-0000-000000000000",
        "participant_id": "1001",
        "week": 2,
        "wordset_index": 1,
        "memory": {"rounds": [
            {"round": 1, "correct": 5},
            {"round": 2, "correct": 8},
            {"round": 3, "correct": 11}
        ]},
        "stroop": {
            "congruent": {"correct": 40, "responses": 41},
            "incongruent": {"correct": 30, "responses": 36}
        },
        "digit_span": {"best_length": 6},
        "reaction": {"latencies_ms": [], "misses": 20},
        "reaction_mean_ms": null,
        "completed_at": "2026-01-12T10:00:00Z"
    });
    std::fs::write(&path, serde_json::to_string_pretty(&results).unwrap()).unwrap();

    cogbattery()
        .args(["show", "--results"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Participant 1001 / week 2"))
        .stdout(predicate::str::contains("Memory round 3"))
        .stdout(predicate::str::contains("11/12"))
        .stdout(predicate::str::contains("Digit span best length"))
        .stdout(predicate::str::contains("no data"));
}

#[test]
fn show_missing_file_fails() {
    cogbattery()
        .args(["show", "--results", "nonexistent.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read results"));
}

#[test]
fn run_reports_invalid_setup_and_ends_on_eof() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    cogbattery()
        .args(["run", "--config"])
        .arg(&config)
        .write_stdin("abc 1\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("digits only"))
        .stderr(predicate::str::contains("Enter the participant ID and week again"))
        .stderr(predicate::str::contains("Session ended before completion"));
}

#[test]
fn run_blocks_completed_week() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    std::fs::write(
        dir.path().join("locks.json"),
        r#"{"testlock_7_week_1": "completed"}"#,
    )
    .unwrap();

    cogbattery()
        .args(["run", "--participant", "7", "--week", "1", "--config"])
        .arg(&config)
        .write_stdin("")
        .assert()
        .success()
        .stderr(predicate::str::contains("already completed week 1"))
        .stderr(predicate::str::contains("again").not());
}

#[test]
fn run_start_marks_week_started() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    cogbattery()
        .args(["run", "--participant", "8", "--week", "3", "--config"])
        .arg(&config)
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tasks remaining"));

    let locks = std::fs::read_to_string(dir.path().join("locks.json")).unwrap();
    assert!(locks.contains("\"testlock_8_week_3\": \"started\""));
}

#[test]
fn run_needs_both_setup_flags() {
    cogbattery()
        .args(["run", "--participant", "8"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be given together"));
}
