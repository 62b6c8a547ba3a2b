use assert_fs::prelude::*;
use predicates::prelude::*;
use std::fs;

const CHAIN_YAML: &str = r#"
name: Chain
start_date: 2026-03-02
activities:
  - id: A
    duration: 5
  - id: B
    duration: 3
    predecessors: [A]
  - id: C
    duration: 2
    predecessors: [B]
"#;

fn save_baseline(temp: &assert_fs::TempDir, slot: &str) -> assert_fs::fixture::ChildPath {
    let input_file = temp.child("project.yaml");
    input_file.write_str(CHAIN_YAML).unwrap();
    let output_file = temp.child("baselined.yaml");

    let mut cmd = assert_cmd::cargo_bin_cmd!("cpm-risk");
    cmd.args([
        "baseline",
        "-i",
        input_file.path().to_str().unwrap(),
        "-o",
        output_file.path().to_str().unwrap(),
        "--slot",
        slot,
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(format!("Saved baseline {slot} for 3 activities")));
    output_file
}

#[test]
fn baseline_is_written_to_the_project_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    let output_file = save_baseline(&temp, "1");

    let output = fs::read_to_string(output_file.path()).unwrap();
    assert!(output.contains("baselines:"));
    assert!(output.contains("- null"));
    assert!(output.contains("finish: 2026-03-09"));
    assert!(output.contains("calendar: 5day"));
}

#[test]
fn progress_compares_against_saved_baseline() {
    let temp = assert_fs::TempDir::new().unwrap();
    let baselined = save_baseline(&temp, "1");

    let mut cmd = assert_cmd::cargo_bin_cmd!("cpm-risk");
    cmd.args([
        "progress",
        "-i",
        baselined.path().to_str().unwrap(),
        "-d",
        "2026-03-04",
        "--slot",
        "1",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("As of: 2026-03-04"))
        .stdout(predicate::str::contains("A | 40.0 | 0.0 | -40.0"))
        .stdout(predicate::str::contains("B | 0.0 | 0.0 | +0.0"));
}

#[test]
fn clearing_a_baseline_leaves_nothing_to_compare() {
    let temp = assert_fs::TempDir::new().unwrap();
    let baselined = save_baseline(&temp, "0");

    let mut clear = assert_cmd::cargo_bin_cmd!("cpm-risk");
    clear.args(["baseline", "-i", baselined.path().to_str().unwrap(), "--clear"]);
    clear
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared baseline 0 on 3 activities"));

    let mut progress = assert_cmd::cargo_bin_cmd!("cpm-risk");
    progress.args(["progress", "-i", baselined.path().to_str().unwrap(), "-d", "2026-03-04"]);
    progress
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to compute progress"));
}

#[test]
fn progress_rejects_malformed_dates() {
    let temp = assert_fs::TempDir::new().unwrap();
    let baselined = save_baseline(&temp, "0");

    let mut cmd = assert_cmd::cargo_bin_cmd!("cpm-risk");
    cmd.args(["progress", "-i", baselined.path().to_str().unwrap(), "-d", "04.03.2026"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse date"));
}
