//! CLI contract tests
//!
//! Drives the built binary through init, calibrate, thresholds and analyze.

mod common;

use std::path::Path;
use std::process::{Command, Output};

fn pathsentry_bin() -> &'static str {
    env!("CARGO_BIN_EXE_pathsentry")
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(pathsentry_bin())
        .args(["--log-level", "warn"])
        .args(args)
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("PATHSENTRY_MODEL_PATH")
        .env_remove("PATHSENTRY_SOURCE_DIR")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn test_init_writes_config_once() {
    let dir = tempfile::tempdir().unwrap();

    let first = run(dir.path(), &["init"]);
    assert!(first.status.success());
    let config = dir.path().join("pathsentry.toml");
    let content = std::fs::read_to_string(&config).unwrap();
    assert!(content.contains("[distance]"));

    std::fs::write(&config, "# edited\n").unwrap();
    let second = run(dir.path(), &["init"]);
    assert!(second.status.success());
    assert!(String::from_utf8_lossy(&second.stdout).contains("already exists"));
    assert_eq!(std::fs::read_to_string(&config).unwrap(), "# edited\n");
}

#[test]
fn test_calibrate_then_analyze_with_saved_model() {
    let fixture = common::setup();
    let root = fixture.root();

    let calibrate = run(root, &["calibrate", "-o", "model.json"]);
    assert!(
        calibrate.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&calibrate.stderr)
    );
    assert!(root.join("model.json").exists());

    let thresholds = run(root, &["thresholds", "--model", "model.json", "--format", "json"]);
    assert!(thresholds.status.success());
    let value: serde_json::Value = serde_json::from_slice(&thresholds.stdout).unwrap();
    let rows = value["thresholds"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["defect_class"], "CWE-121");

    let analyze = run(
        root,
        &[
            "analyze",
            "--paths",
            "paths.jsonl",
            "--source-dir",
            "src",
            "--model",
            "model.json",
            "--out-dir",
            "reports",
            "--format",
            "json",
        ],
    );
    assert!(
        analyze.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&analyze.stderr)
    );
    let report: serde_json::Value = serde_json::from_slice(&analyze.stdout).unwrap();
    assert_eq!(report["summary"]["findings"], 2);
    assert_eq!(report["summary"]["merged_findings"], 1);
    assert!(root.join("reports").join("report.json").exists());
    assert!(root.join("reports").join("merged_report.json").exists());
}

#[test]
fn test_saved_model_analyzes_without_config() {
    let fixture = common::setup();
    let calibrate = run(fixture.root(), &["calibrate", "-o", "model.json"]);
    assert!(calibrate.status.success());

    // Fresh directory holding only the model, the export and the source
    let scoring = tempfile::tempdir().unwrap();
    let dir = scoring.path();
    std::fs::copy(fixture.root().join("model.json"), dir.join("model.json")).unwrap();
    std::fs::copy(fixture.paths(), dir.join("paths.jsonl")).unwrap();
    std::fs::create_dir_all(dir.join("src")).unwrap();
    std::fs::copy(fixture.source_dir().join("f.c"), dir.join("src").join("f.c")).unwrap();
    assert!(!dir.join("pathsentry.toml").exists());

    let analyze = run(
        dir,
        &[
            "analyze",
            "--paths",
            "paths.jsonl",
            "--source-dir",
            "src",
            "--model",
            "model.json",
            "--format",
            "json",
        ],
    );
    assert!(
        analyze.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&analyze.stderr)
    );
    let report: serde_json::Value = serde_json::from_slice(&analyze.stdout).unwrap();
    assert_eq!(report["summary"]["findings"], 2);
    assert_eq!(report["summary"]["merged_findings"], 1);
    assert!(dir.join("merged_report.json").exists());
}

#[test]
fn test_analyze_text_output_calibrates_in_process() {
    let fixture = common::setup();
    let root = fixture.root();

    let analyze = run(
        root,
        &["analyze", "--paths", "paths.jsonl", "--source-dir", "src", "--out-dir", "out"],
    );
    assert!(analyze.status.success());
    let stdout = String::from_utf8_lossy(&analyze.stdout);
    assert!(stdout.contains("CWE-121"));
    assert!(stdout.contains("Reports written to"));
    assert!(root.join("out").join("merged_report.json").exists());
}

#[test]
fn test_explicit_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["--config", "nope.toml", "calibrate"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.toml"));
}

#[test]
fn test_workers_out_of_range_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["--workers", "0", "calibrate"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("workers must be at least 1"));
}
