//! Persisted calibration result

use crate::classifier::{CentroidBasis, CentroidSet, Scorer, ThresholdRecord};
use crate::embed::NodeProperty;
use crate::error::{EngineError, EngineResult};
use crate::models::DefectClass;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Centroids, thresholds, and the embedding geometry they were built in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedModel {
    pub version: u32,
    /// RFC 3339 timestamp of the calibration run
    pub generated_at: String,
    pub node_property: NodeProperty,
    pub basis: CentroidBasis,
    /// Embedding length of the calibration batch
    pub dimension: usize,
    /// Padding sentinel after the calibration batch was normalized
    pub padding_value: f64,
    pub scaling_factor: f64,
    pub centroids: Vec<CentroidSet>,
    pub thresholds: Vec<ThresholdRecord>,
}

impl CalibratedModel {
    pub const VERSION: u32 = 1;
    pub const FILENAME: &'static str = "model.json";

    /// Load a saved model, rejecting other format versions
    pub fn load(path: &Path) -> EngineResult<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        let model: Self = serde_json::from_str(&data)
            .map_err(|e| EngineError::json(path.display().to_string(), e))?;
        if model.version != Self::VERSION {
            return Err(EngineError::ModelVersion {
                found: model.version,
                expected: Self::VERSION,
            });
        }
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> EngineResult<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| EngineError::io(dir, e))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::json("calibrated model", e))?;
        std::fs::write(path, json).map_err(|e| EngineError::io(path, e))?;
        Ok(())
    }

    pub fn threshold(&self, class: DefectClass) -> Option<&ThresholdRecord> {
        self.thresholds.iter().find(|t| t.defect_class == class)
    }

    /// Classes that have both centroids and a threshold
    pub fn scored_classes(&self) -> Vec<DefectClass> {
        self.centroids
            .iter()
            .map(|c| c.defect_class)
            .filter(|c| self.threshold(*c).is_some())
            .collect()
    }

    pub fn scorer(&self) -> Scorer<'_> {
        Scorer::new(&self.centroids, &self.thresholds, self.padding_value)
    }
}
