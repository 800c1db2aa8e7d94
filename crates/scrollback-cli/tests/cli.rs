//! Integration tests for the scrollback binary.
//!
//! These tests pipe NDJSON event streams into the compiled binary using
//! `assert_cmd`. Stdout is not a terminal here, so only committed text is
//! printed and every run ends with the final frame.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a `Command` for the scrollback binary with colors disabled.
fn scrollback_cmd() -> Command {
    let mut cmd = assert_cmd::cargo_bin_cmd!("scrollback");
    cmd.env("NO_COLOR", "1").arg("--no-color");
    cmd
}

/// Join event lines into an NDJSON document.
fn ndjson(lines: &[&str]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// Basic CLI tests
// ---------------------------------------------------------------------------

#[test]
fn test_help_output() {
    scrollback_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scrollback"))
        .stdout(predicate::str::contains("--server"))
        .stdout(predicate::str::contains("--throttle-ms"));
}

#[test]
fn test_version_flag() {
    scrollback_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("scrollback"));
}

#[test]
fn test_empty_input_prints_nothing() {
    scrollback_cmd()
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_missing_config_file_fails() {
    scrollback_cmd()
        .args(["--config", "/nonexistent/scrollback.json"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config"));
}

// ---------------------------------------------------------------------------
// Live view
// ---------------------------------------------------------------------------

#[test]
fn test_progress_and_messages() {
    let input = ndjson(&[
        r#"{"name":"progress","status":"resolving_content","pkgId":"registry/foo/1.0.0"}"#,
        r#"{"name":"progress","status":"fetched","pkgId":"registry/foo/1.0.0"}"#,
        r#"{"name":"other","level":"warn","message":"peer missing"}"#,
        "not json at all",
        r#"{"name":"stage","message":"resolution_done"}"#,
    ]);
    scrollback_cmd()
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("WARN peer missing"))
        .stdout(predicate::str::contains(
            "Resolving: total 1, reused 0, downloaded 1, done",
        ));
}

#[test]
fn test_already_up_to_date() {
    scrollback_cmd()
        .write_stdin(ndjson(&[r#"{"name":"stage","message":"resolution_done"}"#]))
        .assert()
        .success()
        .stdout(predicate::str::contains("Already up-to-date"));
}

#[test]
fn test_summary_lists_package_changes() {
    let input = ndjson(&[
        r#"{"name":"package-json","initial":{"dependencies":{"foo":"^0.1.0"}}}"#,
        r#"{"name":"deprecation","pkgName":"bar","pkgVersion":"2.0.0","pkgId":"registry/bar/2.0.0","deprecated":"use baz","depth":0}"#,
        r#"{"name":"root","removed":{"dependencyType":"prod","name":"foo","version":"0.1.0"}}"#,
        r#"{"name":"root","added":{"dependencyType":"prod","name":"foo","version":"1.0.0","id":"registry/foo/1.0.0"}}"#,
        r#"{"name":"root","added":{"dependencyType":"prod","name":"bar","version":"2.0.0","id":"registry/bar/2.0.0"}}"#,
        r#"{"name":"package-json","updated":{"dependencies":{"foo":"^1.0.0","bar":"^2.0.0"}}}"#,
        r#"{"name":"summary"}"#,
    ]);
    let output = scrollback_cmd()
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("WARN deprecated bar@2.0.0: use baz"))
        .stdout(predicate::str::contains("dependencies:"))
        .stdout(predicate::str::contains("+ bar 2.0.0 deprecated"))
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).expect("utf8 output");
    let removed = stdout.find("- foo 0.1.0").expect("removal listed");
    let added = stdout.find("+ foo 1.0.0").expect("addition listed");
    assert!(removed < added, "removal should precede addition:\n{stdout}");
}

#[test]
fn test_recursive_hides_project_panels() {
    let input = ndjson(&[
        r#"{"name":"root","added":{"dependencyType":"prod","name":"foo","version":"1.0.0","id":"registry/foo/1.0.0"}}"#,
        r#"{"name":"summary"}"#,
        r#"{"name":"other","message":"still shown"}"#,
    ]);
    scrollback_cmd()
        .args(["--cmd", "recursive"])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("still shown"))
        .stdout(predicate::str::contains("+ foo").not());
}

#[test]
fn test_stats_bar_for_install() {
    let input = ndjson(&[
        r#"{"name":"stats","added":2}"#,
        r#"{"name":"stats","removed":1}"#,
    ]);
    scrollback_cmd()
        .args(["--width", "20"])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Packages: -1 +2"))
        .stdout(predicate::str::contains("-++"));
}

#[test]
fn test_error_message_is_printed() {
    scrollback_cmd()
        .write_stdin(ndjson(&[
            r#"{"name":"other","level":"error","message":"lockfile is broken"}"#,
        ]))
        .assert()
        .success()
        .stdout(predicate::str::contains("ERROR lockfile is broken"));
}

// ---------------------------------------------------------------------------
// Server mode
// ---------------------------------------------------------------------------

#[test]
fn test_server_mode_prints_raw_lines() {
    let input = ndjson(&[
        r#"{"name":"progress","status":"fetching_started","pkgId":"registry/foo/1.0.0","size":100}"#,
        r#"{"name":"progress","status":"fetched","pkgId":"registry/foo/1.0.0"}"#,
        r#"{"name":"progress","status":"resolving_content","pkgId":"registry/foo/1.0.0"}"#,
        r#"{"name":"other","level":"debug","message":"hidden"}"#,
        r#"{"name":"registry","level":"warn","message":"slow registry"}"#,
    ]);
    scrollback_cmd()
        .arg("--server")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(
            "fetching_started registry/foo/1.0.0\n\
             fetched registry/foo/1.0.0\n\
             WARN slow registry\n",
        );
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[test]
fn test_log_dir_receives_log_file() {
    let dir = TempDir::new().unwrap();
    scrollback_cmd()
        .env("SCROLLBACK_LOG", "debug")
        .arg("--log-dir")
        .arg(dir.path())
        .write_stdin(ndjson(&[r#"{"name":"other","message":"hello"}"#]))
        .assert()
        .success()
        .stdout(predicate::str::contains("hello"));

    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("scrollback"))
        .collect();
    assert_eq!(files.len(), 1, "expected one log file");
    let log = std::fs::read_to_string(files[0].path()).unwrap();
    assert!(log.contains("starting reporter"), "log was:\n{log}");
}

#[test]
fn test_log_dir_defaults_to_warnings_only() {
    let dir = TempDir::new().unwrap();
    scrollback_cmd()
        .env_remove("SCROLLBACK_LOG")
        .env_remove("RUST_LOG")
        .arg("--log-dir")
        .arg(dir.path())
        .write_stdin(ndjson(&[r#"{"name":"other","message":"hello"}"#]))
        .assert()
        .success();

    for entry in std::fs::read_dir(dir.path()).unwrap() {
        let log = std::fs::read_to_string(entry.unwrap().path()).unwrap();
        assert!(!log.contains("starting reporter"), "log was:\n{log}");
    }
}
