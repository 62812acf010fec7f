//! CLI integration tests for forum-migrate.
//!
//! These tests cover argument parsing, help output and the exit codes
//! reported for configuration, detection and state errors.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};

/// Get a command for the forum-migrate binary.
fn cmd() -> Command {
    Command::cargo_bin("forum-migrate").unwrap()
}

/// Write a config migrating between two SQLite files inside `dir`.
fn sqlite_config(dir: &Path) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
source:
  type: sqlite
  database: {source}
  prefix: flux_
target:
  type: sqlite
  database: {target}
  prefix: fork_
migration:
  limit: 50
  state_dir: {state}
"#,
        source = dir.join("source.db").display(),
        target = dir.join("target.db").display(),
        state = dir.join("state").display(),
    )
    .unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("step"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("cleanup"));
}

#[test]
fn test_step_subcommand_help() {
    cmd()
        .args(["step", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--run"));
}

#[test]
fn test_cleanup_subcommand_help() {
    cmd()
        .args(["cleanup", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--run"))
        .stdout(predicate::str::contains("tracking columns"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("forum-migrate"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_global_flag_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: config.yaml]"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("[default: info]"))
        .stdout(predicate::str::contains("--state-dir"))
        .stdout(predicate::str::contains("--output-json"));
}

#[test]
fn test_no_subcommand_fails() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_file_exits_1() {
    let dir = TempDir::new().unwrap();
    cmd()
        .args(["-c"])
        .arg(dir.path().join("missing.yaml"))
        .arg("detect")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn test_invalid_yaml_exits_2() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "source: [unterminated").unwrap();

    cmd()
        .args(["-c"])
        .arg(file.path())
        .arg("detect")
        .assert()
        .code(2);
}

#[test]
fn test_invalid_config_values_exit_2() {
    let dir = TempDir::new().unwrap();
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
source:
  type: sqlite
  database: {db}
  prefix: flux_
target:
  type: sqlite
  database: {db}
  prefix: flux_
"#,
        db = dir.path().join("same.db").display(),
    )
    .unwrap();

    cmd()
        .args(["-c"])
        .arg(file.path())
        .arg("detect")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be the same database"));
}

#[test]
fn test_unknown_log_format_exits_2() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path());

    cmd()
        .args(["--log-format", "xml", "-c"])
        .arg(config.path())
        .arg("status")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown log format"));
}

#[test]
fn test_detect_unrecognised_source_exits_3() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path());

    cmd()
        .args(["-c"])
        .arg(config.path())
        .arg("detect")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No driver recognises"))
        .stderr(predicate::str::contains("fluxbb"));
}

#[test]
fn test_status_of_unknown_run_exits_5() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path());

    cmd()
        .args(["-c"])
        .arg(config.path())
        .args(["status", "--run", "0123456789abcdef"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("not found"));
}

// =============================================================================
// State Commands
// =============================================================================

#[test]
fn test_status_without_runs() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path());

    cmd()
        .args(["-c"])
        .arg(config.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No runs"));
}

#[test]
fn test_status_json_without_runs() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path());

    cmd()
        .args(["--output-json", "-c"])
        .arg(config.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_cleanup_without_runs() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path());

    cmd()
        .args(["-c"])
        .arg(config.path())
        .arg("cleanup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 run record(s)"));
}

#[test]
fn test_state_dir_override() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path());
    let other = dir.path().join("elsewhere");

    cmd()
        .args(["-c"])
        .arg(config.path())
        .arg("--state-dir")
        .arg(&other)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("elsewhere"));
}
