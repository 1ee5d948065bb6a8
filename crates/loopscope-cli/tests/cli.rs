use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn run_prints_console_output_in_scheduling_order() {
    Command::cargo_bin("loopscope")
        .unwrap()
        .arg("run")
        .arg(fixture("sample.js"))
        .assert()
        .success()
        .stdout("Start\nEnd\nPromise\nTimeout\n");
}

#[test]
fn run_with_json_emits_finished_snapshot() {
    Command::cargo_bin("loopscope")
        .unwrap()
        .args(["run", "--json"])
        .arg(fixture("sample.js"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"finished\": true"))
        .stdout(predicate::str::contains("call_stack_history"));
}

#[test]
fn run_with_trace_reports_steps_on_stderr() {
    Command::cargo_bin("loopscope")
        .unwrap()
        .args(["run", "--trace"])
        .arg(fixture("sample.js"))
        .assert()
        .success()
        .stderr(predicate::str::contains("step"))
        .stderr(predicate::str::contains("macro"));
}

#[test]
fn run_missing_file_fails() {
    Command::cargo_bin("loopscope")
        .unwrap()
        .args(["run", "no-such-file.js"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn sample_prints_script() {
    Command::cargo_bin("loopscope")
        .unwrap()
        .arg("sample")
        .assert()
        .success()
        .stdout(predicate::str::contains("setTimeout"))
        .stdout(predicate::str::contains("Promise.resolve"));
}

#[test]
fn parse_error_is_reported_not_crashed() {
    let dir = std::env::temp_dir().join("loopscope-cli-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("broken.js");
    std::fs::write(&path, "let = 5;").unwrap();

    Command::cargo_bin("loopscope")
        .unwrap()
        .arg("run")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Error: "));
}
