//! E2E tests for the `quill` binary.
//!
//! No search cluster is available here, so backend-facing commands point at
//! a closed local port and must fail cleanly with a structured error.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

/// Nothing listens on the discard port.
const CLOSED_BACKEND: &str = "http://127.0.0.1:9";

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the quill binary, rooted in `dir` with no
/// user-level config or backend environment leaking in.
fn quill_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("quill"));
    cmd.current_dir(dir);
    cmd.env("QUILL_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir);
    cmd.env("HOME", dir);
    for var in [
        "QUILL_BACKEND_URL",
        "ELASTICSEARCH_URL",
        "QUILL_API_KEY",
        "ELASTIC_API_KEY",
        "QUILL_FORMAT",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn stderr_json(output: &std::process::Output) -> Value {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let start = stderr.find('{').expect("stderr should contain a JSON error");
    let end = stderr.rfind('}').expect("stderr should contain a JSON error");
    serde_json::from_str(&stderr[start..=end]).expect("valid JSON error")
}

// ---------------------------------------------------------------------------
// Help and completions
// ---------------------------------------------------------------------------

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().expect("tempdir");
    quill_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("search")
                .and(predicate::str::contains("serve"))
                .and(predicate::str::contains("show")),
        );
}

#[test]
fn version_prints_package_version() {
    let dir = TempDir::new().expect("tempdir");
    quill_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn completions_for_bash() {
    let dir = TempDir::new().expect("tempdir");
    quill_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("quill"));
}

// ---------------------------------------------------------------------------
// Backend failures
// ---------------------------------------------------------------------------

#[test]
fn search_against_closed_port_reports_backend_unavailable() {
    let dir = TempDir::new().expect("tempdir");
    let output = quill_cmd(dir.path())
        .args([
            "search",
            "to be or not to be",
            "--mode",
            "lexical",
            "--backend-url",
            CLOSED_BACKEND,
            "--json",
        ])
        .output()
        .expect("search should not crash");

    assert!(!output.status.success());
    let err = stderr_json(&output);
    assert_eq!(err["error"]["error_code"], "E6001");
    assert!(err["error"]["suggestion"].is_string());
}

#[test]
fn json_failure_writes_exactly_one_document() {
    let dir = TempDir::new().expect("tempdir");
    let output = quill_cmd(dir.path())
        .args(["show", "34229", "--backend-url", CLOSED_BACKEND, "--json"])
        .output()
        .expect("show should not crash");

    assert_eq!(output.status.code(), Some(1));
    let err: Value = serde_json::from_slice(&output.stderr).expect("stderr is one JSON document");
    assert_eq!(err["error"]["error_code"], "E6001");
    assert!(!String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn hybrid_search_fails_when_both_sides_are_down() {
    let dir = TempDir::new().expect("tempdir");
    quill_cmd(dir.path())
        .args(["search", "love", "--backend-url", CLOSED_BACKEND, "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("search backend unavailable"));
}

#[test]
fn show_against_closed_port_fails() {
    let dir = TempDir::new().expect("tempdir");
    quill_cmd(dir.path())
        .args(["show", "34229", "--backend-url", CLOSED_BACKEND, "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn backend_url_from_environment_is_used() {
    let dir = TempDir::new().expect("tempdir");
    let output = quill_cmd(dir.path())
        .env("QUILL_BACKEND_URL", CLOSED_BACKEND)
        .args(["search", "rose", "--mode", "dense", "--json"])
        .output()
        .expect("search should not crash");

    assert!(!output.status.success());
    assert_eq!(stderr_json(&output)["error"]["error_code"], "E6001");
}

// ---------------------------------------------------------------------------
// Argument and config validation
// ---------------------------------------------------------------------------

#[test]
fn zero_page_size_is_invalid_config() {
    let dir = TempDir::new().expect("tempdir");
    let output = quill_cmd(dir.path())
        .args([
            "search",
            "rose",
            "--size",
            "0",
            "--backend-url",
            CLOSED_BACKEND,
            "--json",
        ])
        .output()
        .expect("search should not crash");

    assert!(!output.status.success());
    assert_eq!(stderr_json(&output)["error"]["error_code"], "E1002");
}

#[test]
fn unknown_mode_is_a_usage_error() {
    let dir = TempDir::new().expect("tempdir");
    quill_cmd(dir.path())
        .args(["search", "rose", "--mode", "fuzzy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown search mode"));
}

#[test]
fn missing_explicit_config_fails() {
    let dir = TempDir::new().expect("tempdir");
    quill_cmd(dir.path())
        .args(["--config", "nope.toml", "search", "rose", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn malformed_local_config_fails() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("quill.toml"), "[backend\nurl = 1").expect("write config");

    let output = quill_cmd(dir.path())
        .args(["search", "rose", "--json"])
        .output()
        .expect("search should not crash");

    assert!(!output.status.success());
    assert_eq!(stderr_json(&output)["error"]["error_code"], "E1001");
}

#[test]
fn local_config_backend_is_used() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join("quill.toml"),
        format!("[backend]\nurl = \"{CLOSED_BACKEND}\"\ntimeout_secs = 2\n"),
    )
    .expect("write config");

    let output = quill_cmd(dir.path())
        .args(["show", "1", "--json"])
        .output()
        .expect("show should not crash");

    assert!(!output.status.success());
    assert_eq!(stderr_json(&output)["error"]["error_code"], "E6001");
}
