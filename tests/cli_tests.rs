//! CLI integration tests using assert_cmd.
//!
//! These tests invoke the actual `report-runner` binary and verify its output.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

#[allow(deprecated)]
fn runner_cmd() -> Command {
    let mut cmd = Command::cargo_bin("report-runner").expect("binary should exist");
    cmd.env_remove("REPORT_RUNNER_CONFIG")
        .env_remove("REPORT_RUNNER_QUERY_TOKEN");
    cmd
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn test_version_flag() {
    runner_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_help_flag() {
    runner_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Report Runner"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_run_help_shows_options() {
    runner_cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--json"))
        .stdout(predicate::str::contains("--strict"));
}

#[test]
fn test_serve_help_shows_options() {
    runner_cmd()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--host"))
        .stdout(predicate::str::contains("--port"));
}

#[test]
fn test_no_subcommand_shows_help() {
    runner_cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_list_prints_report_names() {
    let config = write_config(
        r#"{
            "reports": [
                {"name": "bed_type_usage", "query": "SELECT 1"},
                {"name": "department_load", "query": "SELECT 2"}
            ]
        }"#,
    );

    runner_cmd()
        .args(["list", "--config"])
        .arg(config.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("bed_type_usage"))
        .stdout(predicate::str::contains("department_load"));
}

#[test]
fn test_list_json() {
    let config = write_config(r#"{"reports": [{"name": "bed_stay", "query": "SELECT 3"}]}"#);

    runner_cmd()
        .args(["list", "--json", "-c"])
        .arg(config.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"bed_stay\""))
        .stdout(predicate::str::contains("\"query\": \"SELECT 3\""));
}

#[test]
fn test_missing_config_file_fails() {
    runner_cmd()
        .args(["list", "--config", "/nonexistent/report-runner.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_invalid_config_rejected() {
    let config = write_config(
        r#"{
            "reports": [
                {"name": "dup", "query": "SELECT 1"},
                {"name": "dup", "query": "SELECT 2"}
            ]
        }"#,
    );

    runner_cmd()
        .args(["list", "--config"])
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("dup"));
}

#[test]
fn test_run_with_unreachable_gateway_strict_fails() {
    let storage = tempfile::TempDir::new().expect("temp dir");
    let config = write_config(&format!(
        r#"{{
            "query_endpoint": "http://127.0.0.1:9",
            "storage_root": {:?},
            "reports": [{{"name": "bed_stay", "query": "SELECT 1"}}]
        }}"#,
        storage.path()
    ));

    runner_cmd()
        .args(["run", "--strict", "--config"])
        .arg(config.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("SubmissionFailed"))
        .stdout(predicate::str::contains("0 of 1 reports saved (1 failed)"))
        .stderr(predicate::str::contains("1 report(s) were not saved"));
}

#[test]
fn test_run_without_strict_exits_zero_on_failure() {
    let storage = tempfile::TempDir::new().expect("temp dir");
    let config = write_config(&format!(
        r#"{{
            "query_endpoint": "http://127.0.0.1:9",
            "storage_root": {:?},
            "reports": [{{"name": "bed_stay", "query": "SELECT 1"}}]
        }}"#,
        storage.path()
    ));

    runner_cmd()
        .args(["run", "--json", "--config"])
        .arg(config.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"SubmissionFailed\""));
}
