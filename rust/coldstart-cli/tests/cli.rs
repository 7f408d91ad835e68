//! Integration tests for the `coldstart` binary.
//!
//! Only paths that fail before any AWS call are exercised here.

use std::path::Path;
use std::process::{Command, Output};

fn coldstart(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_coldstart"))
        .args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to spawn coldstart")
}

// =============================================================================
// Argument handling
// =============================================================================

#[test]
fn help_lists_window_flags() {
    let dir = tempfile::tempdir().unwrap();
    let output = coldstart(dir.path(), &["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--function-name"));
    assert!(stdout.contains("--start-time"));
    assert!(stdout.contains("--since"));
}

#[test]
fn missing_function_name_fails_before_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let output = coldstart(dir.path(), &["--since", "1h"]);
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: --function-name is required"));
    assert!(output.stdout.is_empty());
}

#[test]
fn invalid_start_time_is_rejected_by_parser() {
    let dir = tempfile::tempdir().unwrap();
    let output = coldstart(dir.path(), &["-f", "hello-dev", "--start-time", "yesterday"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid start time"));
}

// =============================================================================
// Files
// =============================================================================

#[test]
fn unreadable_event_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let output = coldstart(dir.path(), &["--event", "missing.json"]);
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot read 'missing.json'"));
}

#[test]
fn malformed_event_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("event.json"), r#"{"functionName": "x"}"#).unwrap();

    let output = coldstart(dir.path(), &["--event", "event.json"]);
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid analysis event"));
    assert!(stderr.contains("caused by:"));
}

#[test]
fn broken_config_exits_with_config_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("coldstart.toml"), "[report\n").unwrap();

    let output = coldstart(dir.path(), &["-f", "hello-dev", "--since", "1h"]);
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config"));
    assert!(stderr.contains("coldstart.toml"));
}
