//! Integration tests for the flagtrail CLI.

#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn flagtrail_bin() -> Command {
    Command::cargo_bin("flagtrail").expect("binary should be built")
}

#[test]
fn test_version_command() {
    flagtrail_bin()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("flagtrail"));
}

#[test]
fn test_help_command() {
    flagtrail_bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("init")
                .and(predicate::str::contains("config"))
                .and(predicate::str::contains("doctor"))
                .and(predicate::str::contains("record"))
                .and(predicate::str::contains("simulate")),
        );
}

#[test]
fn test_invalid_command() {
    flagtrail_bin()
        .arg("invalid-command-that-does-not-exist")
        .assert()
        .failure();
}

#[test]
fn test_init_creates_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("flagtrail.toml");

    flagtrail_bin()
        .arg("init")
        .arg("--path")
        .arg(temp_dir.path())
        .assert()
        .success();

    assert!(config_path.exists(), "Config file was not created");

    let content = std::fs::read_to_string(&config_path).expect("Failed to read config");
    assert!(content.contains("[general]"));
    assert!(content.contains("[flags]"));
    assert!(content.contains("capacity = 100"));
}

#[test]
fn test_init_twice_keeps_existing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    flagtrail_bin()
        .arg("init")
        .arg("--path")
        .arg(temp_dir.path())
        .assert()
        .success();

    flagtrail_bin()
        .arg("init")
        .arg("--path")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_config_shows_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    flagtrail_bin()
        .arg("--config")
        .arg(temp_dir.path().join("missing.toml"))
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("showing defaults").and(predicate::str::contains("[flags]")));
}

#[test]
fn test_doctor_reports_zero_capacity() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("flagtrail.toml");
    std::fs::write(&config_path, "[flags]\ncapacity = 0\n").unwrap();

    flagtrail_bin()
        .arg("--config")
        .arg(&config_path)
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("capacity must be at least 1"));
}

#[test]
fn test_record_fails_on_zero_capacity() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("flagtrail.toml");
    std::fs::write(&config_path, "[flags]\ncapacity = 0\n").unwrap();

    flagtrail_bin()
        .arg("--config")
        .arg(&config_path)
        .args(["record", "a=true", "b=false", "c=true"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("capacity must be at least 1"));
}

#[test]
fn test_invalid_config_is_not_replaced_by_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("flagtrail.toml");
    std::fs::write(
        &config_path,
        "[general]\nlog_level = \"loud\"\n\n[flags]\ncapacity = 2\n",
    )
    .unwrap();

    flagtrail_bin()
        .arg("--config")
        .arg(&config_path)
        .args(["record", "a=true", "b=false", "c=true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown log level 'loud'"));
}

#[test]
fn test_record_prints_report() {
    let output = flagtrail_bin()
        .args(["record", "hello=false", "world=true", "hello=true"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");

    assert_eq!(
        report["contexts"]["flags"]["values"],
        serde_json::json!([
            {"flag": "world", "result": true},
            {"flag": "hello", "result": true},
        ])
    );
}

#[test]
fn test_record_rejects_malformed_flag() {
    flagtrail_bin()
        .args(["record", "not-a-flag"])
        .assert()
        .failure();
}

#[test]
fn test_record_respects_capacity_from_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("flagtrail.toml");
    std::fs::write(&config_path, "[flags]\ncapacity = 2\n").unwrap();

    let output = flagtrail_bin()
        .arg("--config")
        .arg(&config_path)
        .args(["record", "a=true", "b=true", "c=false"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let values = report["contexts"]["flags"]["values"].as_array().unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values[0]["flag"], "b");
    assert_eq!(values[1]["flag"], "c");
}

#[test]
fn test_simulate_small_run() {
    flagtrail_bin()
        .args(["-q", "simulate", "--writes", "20000", "--snapshots", "200", "--capacity", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No inconsistent snapshots"));
}

#[test]
fn test_verbose_flag() {
    flagtrail_bin().arg("-v").arg("version").assert().success();
}
