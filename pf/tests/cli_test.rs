//! Command-line tests for the `pf` binary
//!
//! Each test runs with HOME and the XDG directories pointed at a temp dir so
//! no real session, config or log is touched.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn pf(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pf").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("NO_COLOR", "1")
        .env_remove("GEMINI_API_KEY");
    cmd
}

#[test]
fn test_build_without_images_fails_validation() {
    let home = TempDir::new().unwrap();
    pf(&home)
        .args(["build", "--name", "Aero Buds"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Add at least one product image"));
}

#[test]
fn test_build_without_api_key_fails_after_validation() {
    let home = TempDir::new().unwrap();
    let image = home.path().join("front.png");
    std::fs::write(&image, b"\x89PNG\r\n\x1a\n").unwrap();

    pf(&home)
        .args(["build", "--name", "Aero Buds", "--image"])
        .arg(&image)
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}

#[test]
fn test_show_on_fresh_session() {
    let home = TempDir::new().unwrap();
    pf(&home)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("No slides yet"));
}

#[test]
fn test_edit_requires_a_field() {
    let home = TempDir::new().unwrap();
    pf(&home)
        .args(["edit", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to change"));
}

#[test]
fn test_edit_out_of_range_on_empty_session() {
    let home = TempDir::new().unwrap();
    pf(&home)
        .args(["edit", "3", "--copy", "New"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Edit failed"));
}

#[test]
fn test_slide_number_zero_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    pf(&home)
        .args(["edit", "0", "--copy", "X"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("0"));
}

#[test]
fn test_learn_records_knowledge() {
    let home = TempDir::new().unwrap();
    pf(&home)
        .args(["learn", "--strategy", "Lead with the hero shot", "--critique", "Spec page too dense"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 project(s)"));

    pf(&home)
        .args(["learn", "-s", "Short copy", "-x", "Too dark"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 project(s)"));
}
