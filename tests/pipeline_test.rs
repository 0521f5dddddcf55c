//! End-to-end pipeline tests against a small synthetic export

mod common;

use pathsentry::calibrate::CalibratedModel;
use pathsentry::config::ProjectConfig;
use pathsentry::models::DefectClass;
use pathsentry::pipeline::Pipeline;
use pathsentry::reporters::{read_findings, report_with_format, OutputFormat};

fn pipeline_for(fixture: &common::Fixture) -> Pipeline {
    let config = ProjectConfig::from_toml(&common::config_toml(&fixture.labeled())).unwrap();
    let settings = config.distance.validate().unwrap();
    Pipeline::new(settings, fixture.source_dir(), fixture.out_dir())
}

#[test]
fn test_calibration_skips_sparse_classes() {
    let fixture = common::setup();
    let model = pipeline_for(&fixture).calibrate().unwrap();

    assert_eq!(model.scored_classes(), vec![DefectClass(121)]);
    assert!(model.threshold(DefectClass(78)).is_none());
    assert_eq!(model.dimension, 5);

    let record = model.threshold(DefectClass(121)).unwrap();
    assert!(record.scaled_threshold > 0.0);
    assert!((record.scaled_threshold - record.optimal_threshold * 2.0).abs() < 1e-12);
    assert!(record.auc > 0.0);
}

#[test]
fn test_analyze_flags_and_merges() {
    let fixture = common::setup();
    let pipeline = pipeline_for(&fixture);
    let model = pipeline.calibrate().unwrap();
    let outcome = pipeline.analyze(&fixture.paths(), &model).unwrap();

    let summary = &outcome.report.summary;
    assert_eq!(summary.paths_loaded, 4);
    assert_eq!(summary.paths_valid, 3);
    assert_eq!(summary.classes_calibrated, 1);
    assert_eq!(summary.findings, 2);
    assert_eq!(summary.merged_findings, 1);

    // The far path is not flagged
    for finding in &outcome.report.findings {
        assert!(finding.stats.contains_key("CWE-121"));
        assert_ne!(finding.original_path.nodes[0].id, "30");
    }

    let merged = &outcome.report.merged[0];
    assert_eq!(merged.merged_count, 2);
    assert_eq!(merged.highlighted_lines, vec![10, 12, 15]);
    assert_eq!(merged.filenames, vec!["f.c"]);
    assert_eq!(merged.original_path.nodes[0].id, "10");
    assert!(merged.code.starts_with("/* Extracted from: f.c */"));
    assert!(merged.code.contains("stmt_9;"));
    assert!(merged.code.contains("stmt_16;"));
}

#[test]
fn test_analyze_writes_both_reports() {
    let fixture = common::setup();
    let pipeline = pipeline_for(&fixture);
    let model = pipeline.calibrate().unwrap();
    let outcome = pipeline.analyze(&fixture.paths(), &model).unwrap();

    assert!(outcome.files.report.starts_with(fixture.out_dir()));
    let findings = read_findings(&outcome.files.report).unwrap();
    let merged = read_findings(&outcome.files.merged_report).unwrap();
    assert_eq!(findings.len(), 2);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].merged_count, 2);

    let json = report_with_format(&outcome.report, OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["summary"]["merged_findings"], 1);
    assert_eq!(value["findings"].as_array().unwrap().len(), 1);
}

#[test]
fn test_saved_model_scores_like_fresh_one() {
    let fixture = common::setup();
    let pipeline = pipeline_for(&fixture);
    let model = pipeline.calibrate().unwrap();

    let model_path = fixture.root().join("models").join(CalibratedModel::FILENAME);
    model.save(&model_path).unwrap();
    let loaded = CalibratedModel::load(&model_path).unwrap();
    assert_eq!(loaded.scored_classes(), model.scored_classes());

    let outcome = pipeline.analyze(&fixture.paths(), &loaded).unwrap();
    assert_eq!(outcome.report.summary.findings, 2);
    assert_eq!(outcome.report.summary.merged_findings, 1);
}

#[test]
fn test_scoring_pipeline_needs_only_the_window() {
    let fixture = common::setup();
    let model = pipeline_for(&fixture).calibrate().unwrap();

    let scoring = Pipeline::for_saved_model(1, fixture.source_dir(), fixture.out_dir());
    assert!(scoring.settings().is_none());
    assert!(scoring.calibrate().is_err());

    let outcome = scoring.analyze(&fixture.paths(), &model).unwrap();
    assert_eq!(outcome.report.summary.findings, 2);
    assert_eq!(outcome.report.merged[0].highlighted_lines, vec![10, 12, 15]);
    assert!(outcome.report.merged[0].code.contains("stmt_16;"));
}

#[test]
fn test_empty_export_produces_empty_reports() {
    let fixture = common::setup();
    let empty = fixture.root().join("empty.jsonl");
    std::fs::write(&empty, "").unwrap();

    let pipeline = pipeline_for(&fixture);
    let model = pipeline.calibrate().unwrap();
    let outcome = pipeline.analyze(&empty, &model).unwrap();

    assert_eq!(outcome.report.summary.paths_loaded, 0);
    assert!(outcome.report.findings.is_empty());
    assert!(read_findings(&outcome.files.report).unwrap().is_empty());
}

#[test]
fn test_missing_store_is_an_error() {
    let fixture = common::setup();
    let config =
        ProjectConfig::from_toml(&common::config_toml(&fixture.root().join("absent.jsonl"))).unwrap();
    let settings = config.distance.validate().unwrap();
    let pipeline = Pipeline::new(settings, fixture.source_dir(), fixture.out_dir());

    let err = pipeline.calibrate().unwrap_err();
    assert!(format!("{:#}", err).contains("absent.jsonl"));
}
