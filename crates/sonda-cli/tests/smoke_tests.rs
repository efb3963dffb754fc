//! Smoke tests for the sonda CLI

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const CONTACT: &str = r##"base_url: https://example.com
scenarios:
  - name: contact form
    tags: [smoke, forms]
    steps:
      - action: navigate
        url: /#contact
      - action: fill
        locate: [{css: "#name"}, {test_id: name}]
        text: Jane
  - name: admin login
    skip: needs credentials
    steps: []
"##;

fn sonda() -> Command {
    Command::cargo_bin("sonda").expect("sonda binary should exist")
}

fn scenario_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("contact.yaml"), CONTACT).unwrap();
    dir
}

#[test]
fn test_help_flag() {
    sonda()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_version_flag() {
    sonda()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_args_fails() {
    sonda().assert().failure();
}

#[test]
fn test_run_subcommand_help() {
    sonda()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--base-url"))
        .stdout(predicate::str::contains("--fail-fast"));
}

#[test]
fn test_list_scenarios() {
    let dir = scenario_dir();
    sonda()
        .arg("list")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("contact form [smoke, forms]"))
        .stdout(predicate::str::contains("admin login (skip: needs credentials)"));
}

#[test]
fn test_validate_good_file() {
    let dir = scenario_dir();
    sonda()
        .args(["--color", "never", "validate"])
        .arg(dir.path().join("contact.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("2 scenario(s) valid"));
}

#[test]
fn test_validate_bad_file_exits_one() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("bad.yaml"),
        "scenarios:\n  - name: x\n    steps:\n      - action: teleport\n",
    )
    .unwrap();
    sonda()
        .arg("validate")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("bad.yaml"));
}

#[test]
fn test_run_missing_path_exits_one() {
    let dir = TempDir::new().unwrap();
    sonda()
        .arg("run")
        .arg(dir.path().join("nothing-here.yaml"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no scenario files"));
}

#[test]
fn test_run_filter_matching_nothing_exits_one() {
    let dir = scenario_dir();
    sonda()
        .current_dir(dir.path())
        .args(["run", "contact.yaml", "--filter", "checkout"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no scenarios match"));
}
