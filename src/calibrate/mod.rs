//! Model calibration
//!
//! Embeds the labeled store as one batch, splits it per label, clusters the
//! configured basis of the training half, and sweeps thresholds on the
//! held-out half.

mod model;

pub use model::CalibratedModel;

use crate::classifier::{CalibrationSample, CentroidModel, ThresholdCalibrator};
use crate::config::DistanceSettings;
use crate::dataset::DatasetSplitter;
use crate::embed::PathEmbedder;
use crate::error::{EngineError, EngineResult};
use crate::models::{IcfgPath, LabeledPath};
use tracing::info;

/// Build a calibrated model from labeled paths
pub fn calibrate(
    labeled: &[LabeledPath],
    settings: &DistanceSettings,
) -> EngineResult<CalibratedModel> {
    if labeled.is_empty() {
        return Err(EngineError::NoLabeledPaths);
    }

    let embedder = PathEmbedder::new(settings.node_property);
    let paths: Vec<&IcfgPath> = labeled.iter().map(|l| &l.path).collect();
    let batch = embedder.embed_batch(&paths);
    let padding_value = batch.padding_value();
    let dimension = batch.dimension;
    info!(
        "Embedded {} labeled paths on {} (dimension {})",
        labeled.len(),
        settings.node_property,
        dimension
    );

    let samples: Vec<CalibrationSample> = labeled
        .iter()
        .zip(batch.vectors)
        .map(|(l, embedding)| CalibrationSample {
            defect_class: l.defect_class,
            label: l.label,
            embedding,
        })
        .collect();

    let split = DatasetSplitter::new(settings.train_size, settings.seed).split(&samples, |s| s.label);
    info!(
        "Split: train {} safe / {} unsafe, test {} safe / {} unsafe",
        split.train_safe.len(),
        split.train_unsafe.len(),
        split.test_safe.len(),
        split.test_unsafe.len()
    );

    let centroid_model = CentroidModel::new(
        settings.clustering,
        settings.expected_clusters,
        settings.seed,
    );
    let centroids = centroid_model.build(split.train(settings.basis.label()));
    if centroids.is_empty() {
        return Err(EngineError::NoCentroids);
    }

    let calibrator = ThresholdCalibrator::new(
        settings.basis.comparison(),
        settings.threshold_scaling,
        padding_value,
    );
    let thresholds = calibrator.calibrate(&centroids, &split.test());

    Ok(CalibratedModel {
        version: CalibratedModel::VERSION,
        generated_at: chrono::Utc::now().to_rfc3339(),
        node_property: settings.node_property,
        basis: settings.basis,
        dimension,
        padding_value,
        scaling_factor: settings.threshold_scaling,
        centroids,
        thresholds,
    })
}
