// CLI surface: help, version, fatal diagnostics and exit statuses.

mod common;

use assert_cmd::Command;
use common::Project;
use predicates::prelude::*;
use predicates::str::contains;

#[test]
fn help_lists_the_options() {
    Command::cargo_bin("opcheck")
        .unwrap()
        .arg("-h")
        .assert()
        .success()
        .stdout(
            contains("--quiet")
                .and(contains("--logfile"))
                .and(contains("--version"))
                .and(contains("[OPERATION]")),
        );
}

#[test]
fn version_reads_the_marker_file() {
    let project = Project::new();
    project.write("VERSION", "2.3.1\n");
    project
        .opcheck()
        .arg("-v")
        .assert()
        .success()
        .stdout("2.3.1\n");
}

#[test]
fn version_without_marker_is_unknown() {
    let project = Project::new();
    project
        .opcheck()
        .arg("--version")
        .assert()
        .success()
        .stdout("unknown\n");
}

#[test]
fn malformed_config_is_a_diagnostic() {
    let project = Project::new();
    project.write("opcheck.yaml", "strategy: [not, a, strategy]\n");
    project
        .opcheck()
        .assert()
        .code(2)
        .stderr(contains("opcheck::config::parse"));
    assert!(project.log().is_empty());
}

#[test]
fn missing_explicit_config_is_fatal() {
    let project = Project::new();
    project
        .opcheck()
        .args(["--config", "nope.yaml"])
        .assert()
        .code(2)
        .stderr(contains("opcheck::config::read"));
}

#[test]
fn unopenable_log_is_fatal_before_any_operation() {
    let project = Project::new();
    project.write("blocker", "a file, not a directory\n");
    project.script("touch.sh", "touch ran");
    project
        .opcheck()
        .args(["--logfile", "blocker/run.log", "touch.sh"])
        .assert()
        .code(2)
        .stderr(contains("opcheck::log::open"));
    assert!(!project.path().join("ran").exists());
}

#[test]
fn unknown_flags_are_usage_errors() {
    Command::cargo_bin("opcheck")
        .unwrap()
        .arg("--frobnicate")
        .assert()
        .code(2);
}

#[test]
fn quiet_and_confirm_conflict() {
    Command::cargo_bin("opcheck")
        .unwrap()
        .args(["--quiet", "--confirm"])
        .assert()
        .code(2);
}
