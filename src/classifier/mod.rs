//! Centroid-distance classifier
//!
//! Labeled paths are embedded and split per class. The training half is
//! clustered into per-class prototypes, the held-out half calibrates a
//! distance cutoff per class, and unseen paths are scored against both.

pub mod centroids;
pub mod distance;
pub mod kmeans;
pub mod scorer;
pub mod thresholds;

pub use centroids::{CentroidBasis, CentroidModel, CentroidSet, ClusteringAlgorithm, Comparison};
pub use scorer::{ScoredPath, Scorer};
pub use thresholds::{RocCurve, ThresholdCalibrator, ThresholdRecord};

use crate::models::{DefectClass, Embedding, Label};

/// An embedded labeled path
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSample {
    pub defect_class: DefectClass,
    pub label: Label,
    pub embedding: Embedding,
}
