//! Command-line behaviour of the `tabata` binary.
//!
//! Only invocations that never reach the daemon are exercised here; anything
//! that connects would start a background daemon.

use assert_cmd::Command;
use predicates::prelude::*;

fn tabata() -> Command {
    Command::cargo_bin("tabata").unwrap()
}

#[test]
fn test_no_arguments_is_usage_error() {
    tabata()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_start_needs_three_values() {
    tabata()
        .args(["start", "1", "2"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_start_rejects_zero() {
    tabata().args(["start", "0", "1", "1"]).assert().code(1);
}

#[test]
fn test_start_rejects_text() {
    tabata().args(["start", "ten", "5", "2"]).assert().code(1);
}

#[test]
fn test_unknown_subcommand() {
    tabata().arg("bogus").assert().code(1);
}

#[test]
fn test_help_succeeds() {
    tabata()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("quit"));
}

#[test]
fn test_start_help_lists_arguments() {
    tabata()
        .args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("WORK_SEC"))
        .stdout(predicate::str::contains("REST_SEC"))
        .stdout(predicate::str::contains("ROUNDS"));
}

#[test]
fn test_version() {
    tabata()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
