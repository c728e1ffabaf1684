//! End-to-end tests of the `pdn` binary

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn repo_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join(relative)
}

fn project(name: &str) -> String {
    repo_path(&format!("test_data/projects/{name}.json"))
        .to_str()
        .unwrap()
        .to_string()
}

/// `pdn` with HOME pointed at an empty directory so no user settings leak in
fn pdn(home: &tempfile::TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("pdn");
    cmd.env("HOME", home.path());
    cmd
}

#[test]
fn test_compute_table() {
    let home = tempdir().unwrap();
    pdn(&home)
        .args(["compute", &project("buck_chain")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scenario: Typical"))
        .stdout(predicate::str::contains("11.1111"))
        .stdout(predicate::str::contains("Diagnostics: No issues"))
        .stdout(predicate::str::contains("memo").not());
}

#[test]
fn test_compute_json() {
    let home = tempdir().unwrap();
    let output = pdn(&home)
        .args(["compute", &project("buck_chain"), "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let p_in = value["nodes"]["buck"]["p_in"].as_f64().unwrap();
    assert!((p_in - 10.0 / 0.9).abs() < 1e-9);
    assert_eq!(value["nodes"]["buck"]["eta"].as_f64(), Some(0.9));
    // An empty issue list is omitted
    assert!(value["global_warnings"].get("issues").is_none());
}

#[test]
fn test_scenario_override() {
    let home = tempdir().unwrap();
    let output = pdn(&home)
        .args([
            "compute",
            &project("buck_chain"),
            "--scenario",
            "max",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let p_in = value["nodes"]["buck"]["p_in"].as_f64().unwrap();
    assert!((p_in - 15.0 / 0.9).abs() < 1e-9);
}

#[test]
fn test_range_violation_is_reported() {
    let home = tempdir().unwrap();
    pdn(&home)
        .args(["compute", &project("range_violation")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Converter Vin Range Violation"))
        .stdout(predicate::str::contains("(e1)"));
}

#[test]
fn test_cycle_is_reported_without_failing() {
    let home = tempdir().unwrap();
    pdn(&home)
        .args(["compute", &project("cycle")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cycle detected"))
        .stdout(predicate::str::contains("1 error"));
}

#[test]
fn test_aggregate_rolls_up_subsystems() {
    let home = tempdir().unwrap();
    pdn(&home)
        .args(["aggregate", &project("subsystem_rack")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Critical load power"))
        .stdout(predicate::str::contains("24.0000 W"))
        .stdout(predicate::str::contains("36.0000 W"));
}

#[test]
fn test_aggregate_json() {
    let home = tempdir().unwrap();
    let output = pdn(&home)
        .args(["aggregate", &project("subsystem_rack"), "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!((value["critical_load_power"].as_f64().unwrap() - 24.0).abs() < 1e-9);
    assert!((value["non_critical_load_power"].as_f64().unwrap() - 12.0).abs() < 1e-9);
}

#[test]
fn test_efficiency_preview() {
    let home = tempdir().unwrap();
    let model = repo_path("test_data/models/curve.json");
    pdn(&home)
        .args(["efficiency", model.to_str().unwrap(), "--iout", "2", "--vout", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("eta = 0.8500"));
}

#[test]
fn test_efficiency_fallback_json() {
    let home = tempdir().unwrap();
    let model = repo_path("test_data/models/empty_curve.json");
    let output = pdn(&home)
        .args([
            "efficiency",
            model.to_str().unwrap(),
            "--iout",
            "1",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["eta"].as_f64(), Some(0.9));
    assert!(value["fallback"].is_string());
}

#[test]
fn test_efficiency_fallback_follows_config() {
    let home = tempdir().unwrap();
    let config = home.path().join("pdn.toml");
    fs::write(&config, "[engine]\ndefault_efficiency = 0.8\n").unwrap();
    let model = repo_path("test_data/models/empty_curve.json");

    let output = pdn(&home)
        .args([
            "efficiency",
            model.to_str().unwrap(),
            "--iout",
            "1",
            "--format",
            "json",
            "--config",
            config.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["eta"].as_f64(), Some(0.8));
}

#[test]
fn test_project_from_stdin() {
    let home = tempdir().unwrap();
    let json = fs::read_to_string(project("buck_chain")).unwrap();
    pdn(&home)
        .args(["compute", "-"])
        .write_stdin(json)
        .assert()
        .success()
        .stdout(predicate::str::contains("11.1111"));
}

#[test]
fn test_missing_project_fails() {
    let home = tempdir().unwrap();
    pdn(&home)
        .args(["compute", "does/not/exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn test_non_object_snapshot_fails() {
    let home = tempdir().unwrap();
    pdn(&home)
        .args(["compute", "-"])
        .write_stdin("[1, 2, 3]")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse project"));
}

#[test]
fn test_config_decimal_places() {
    let home = tempdir().unwrap();
    let config = home.path().join("pdn.toml");
    fs::write(&config, "[output]\ndecimal_places = 2\n").unwrap();

    pdn(&home)
        .args([
            "compute",
            &project("buck_chain"),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("11.11"))
        .stdout(predicate::str::contains("11.1111").not());
}

#[test]
fn test_config_init_and_show() {
    let home = tempdir().unwrap();
    let config = home.path().join("nested").join("config.toml");
    let path = config.to_str().unwrap();

    pdn(&home)
        .args(["config", "init", "--config", path])
        .assert()
        .success();
    assert!(config.exists());

    pdn(&home)
        .args(["config", "init", "--config", path])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    pdn(&home)
        .args(["config", "show", "--config", path])
        .assert()
        .success()
        .stdout(predicate::str::contains("decimal_places = 4"))
        .stdout(predicate::str::contains("max_subsystem_depth = 64"));
}

#[test]
fn test_config_init_default_location() {
    let home = tempdir().unwrap();
    pdn(&home).args(["config", "init"]).assert().success();
    assert!(home.path().join(".pdn").join("config.toml").exists());
}
