//! Triage pipeline
//!
//! Orchestrates a full run:
//! 1. Load labeled paths, filter classes, calibrate (or load a saved model)
//! 2. Ingest and validate the query export
//! 3. Embed and score every valid path
//! 4. Attach source context to flagged paths
//! 5. Merge near-duplicates and write both report files

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::calibrate::{self, CalibratedModel};
use crate::classifier::scorer::stats_from_matches;
use crate::classifier::ScoredPath;
use crate::config::DistanceSettings;
use crate::embed::PathEmbedder;
use crate::ingest::{load_labeled_paths, PathIngestor};
use crate::merge::PathMerger;
use crate::models::{Embedding, Finding, IcfgPath, RunSummary};
use crate::reporters::{AnalysisReport, ReportFiles, ReportWriter};
use crate::source::SourceContextExtractor;

/// Result of [`Pipeline::analyze`]
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    pub files: ReportFiles,
}

/// Full calibration and scoring pipeline.
pub struct Pipeline {
    /// Absent when scoring with a saved model
    settings: Option<DistanceSettings>,
    source_code_delta: u32,
    /// Root that debug-location file names resolve against
    source_dir: PathBuf,
    out_dir: PathBuf,
}

impl Pipeline {
    pub fn new(
        settings: DistanceSettings,
        source_dir: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_code_delta: settings.source_code_delta,
            settings: Some(settings),
            source_dir: source_dir.into(),
            out_dir: out_dir.into(),
        }
    }

    /// Scoring-only pipeline. A saved model carries everything scoring
    /// needs except the source window width.
    pub fn for_saved_model(
        source_code_delta: u32,
        source_dir: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings: None,
            source_code_delta,
            source_dir: source_dir.into(),
            out_dir: out_dir.into(),
        }
    }

    pub fn settings(&self) -> Option<&DistanceSettings> {
        self.settings.as_ref()
    }

    /// Load the labeled store and build a calibrated model from it
    pub fn calibrate(&self) -> Result<CalibratedModel> {
        let settings = self
            .settings
            .as_ref()
            .context("Calibration needs a validated [distance] configuration")?;
        let store = settings.labeled_store()?;
        let labeled = load_labeled_paths(store)
            .with_context(|| format!("Failed to load labeled paths from {}", store.display()))?;
        let labeled = settings.class_filter.apply(labeled);

        let model = calibrate::calibrate(&labeled, settings)?;
        info!(
            "Calibrated {} classes ({} with thresholds)",
            model.centroids.len(),
            model.thresholds.len()
        );
        Ok(model)
    }

    /// Score the query export at `paths_file` and write the reports
    pub fn analyze(&self, paths_file: &Path, model: &CalibratedModel) -> Result<AnalysisOutcome> {
        let ingest = PathIngestor::new()
            .read_file(paths_file)
            .with_context(|| format!("Failed to read paths from {}", paths_file.display()))?;
        if ingest.paths.is_empty() {
            warn!("No valid paths to analyze in {}", paths_file.display());
        }
        if let Some(settings) = self.settings.as_ref().filter(|s| s.node_property != model.node_property) {
            warn!(
                "Model was calibrated on {}, configured property {} is ignored",
                model.node_property, settings.node_property
            );
        }

        let embeddings = embed_for_model(&ingest.paths, model);
        let scored = model.scorer().score_batch(&embeddings);

        let extractor = SourceContextExtractor::new(&self.source_dir, self.source_code_delta);
        let findings = build_findings(&ingest.paths, &embeddings, &scored, &extractor);
        let merged = PathMerger::new(&extractor).merge(findings.clone());

        info!(
            "In total {} paths were analyzed, {} were close to a class centroid ({} after merging)",
            ingest.paths.len(),
            findings.len(),
            merged.len()
        );

        let files = ReportWriter::new(&self.out_dir).write(&findings, &merged)?;

        let summary = RunSummary {
            paths_loaded: ingest.total,
            paths_valid: ingest.paths.len(),
            classes_calibrated: model.scored_classes().len(),
            findings: findings.len(),
            merged_findings: merged.len(),
        };
        Ok(AnalysisOutcome {
            report: AnalysisReport {
                summary,
                findings,
                merged,
            },
            files,
        })
    }
}

/// Embed query paths in the model's embedding space
pub fn embed_for_model(paths: &[IcfgPath], model: &CalibratedModel) -> Vec<Embedding> {
    let refs: Vec<&IcfgPath> = paths.iter().collect();
    PathEmbedder::new(model.node_property)
        .embed_batch_min_len(&refs, model.dimension)
        .vectors
}

/// One finding per flagged path, in batch order
pub fn build_findings(
    paths: &[IcfgPath],
    embeddings: &[Embedding],
    scored: &[ScoredPath],
    extractor: &SourceContextExtractor,
) -> Vec<Finding> {
    scored
        .par_iter()
        .map(|s| {
            let path = &paths[s.index];
            let context = extractor.extract(&path.source_locations());
            Finding {
                original_path: path.clone(),
                embedding: embeddings[s.index].clone(),
                stats: stats_from_matches(&s.matches),
                matches: s.matches.clone(),
                code: context.code,
                line_map: context.line_map,
                highlighted_lines: context.highlighted_lines,
                filenames: context.filenames,
                merged_count: 1,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::scorer::class_match;
    use crate::models::{DefectClass, Node};

    #[test]
    fn test_build_findings_attaches_source() {
        let dir = tempfile::tempdir().unwrap();
        let content: String = (1..=10).map(|i| format!("line {}\n", i)).collect();
        std::fs::write(dir.path().join("f.c"), content).unwrap();
        let extractor = SourceContextExtractor::new(dir.path(), 1);

        let paths = vec![
            IcfgPath::new("main", vec![Node::default()]),
            IcfgPath::new(
                "main",
                vec![Node {
                    debug_location: "{ ln: 5  cl: 3  fl: f.c }".into(),
                    ..Default::default()
                }],
            ),
        ];
        let embeddings = vec![vec![0.0], vec![1.0]];
        let scored = vec![ScoredPath {
            index: 1,
            matches: vec![class_match(DefectClass(121), 1.0, 4.0)],
        }];

        let findings = build_findings(&paths, &embeddings, &scored, &extractor);
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.embedding, vec![1.0]);
        assert_eq!(f.highlighted_lines, vec![5]);
        assert_eq!(f.filenames, vec!["f.c"]);
        assert_eq!(f.code, "/* Extracted from: f.c */\nline 4\nline 5\nline 6");
        assert!((f.stats["CWE-121"] - 75.0).abs() < 1e-9);
    }
}
