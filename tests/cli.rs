// ABOUTME: Integration tests for the strata CLI commands.
// ABOUTME: Validates --help output and init command behavior.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn strata_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("strata"))
}

#[test]
fn help_shows_commands() {
    strata_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("rollback"))
        .stdout(predicate::str::contains("step-back"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("strata.yml");

    strata_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--project", "acme"])
        .assert()
        .success();

    assert!(config_path.exists(), "strata.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(
        content.contains("project: acme"),
        "Config should have project field"
    );
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("strata.yml");

    fs::write(&config_path, "existing: config").unwrap();

    strata_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn apply_without_config_reports_discovery_failure() {
    let temp_dir = tempfile::tempdir().unwrap();

    strata_cmd()
        .current_dir(temp_dir.path())
        .args(["apply", "qa"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}
