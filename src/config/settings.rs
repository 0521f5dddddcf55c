//! Validated run settings

use super::project_config::{DistanceConfig, ModelSelection};
use crate::classifier::{CentroidBasis, ClusteringAlgorithm};
use crate::dataset::{DEFAULT_SEED, DEFAULT_TRAIN_SIZE};
use crate::embed::NodeProperty;
use crate::error::{EngineError, EngineResult};
use crate::ingest::ClassFilter;
use crate::models::DefectClass;
use std::path::{Path, PathBuf};

pub const DEFAULT_SOURCE_CODE_DELTA: u32 = 4;
pub const DEFAULT_THRESHOLD_SCALING: f64 = 1.0;

/// Immutable settings for one calibration and scoring run
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceSettings {
    pub model_path: Option<PathBuf>,
    pub node_property: NodeProperty,
    pub source_code_delta: u32,
    pub class_filter: ClassFilter,
    pub basis: CentroidBasis,
    pub expected_clusters: usize,
    pub clustering: ClusteringAlgorithm,
    pub threshold_scaling: f64,
    pub train_size: f64,
    pub seed: u64,
}

impl DistanceSettings {
    /// Labeled store path, required only when calibrating
    pub fn labeled_store(&self) -> EngineResult<&Path> {
        self.model_path
            .as_deref()
            .ok_or(EngineError::MissingConfig("model_path"))
    }
}

impl DistanceConfig {
    /// Source window half-width; the only `[distance]` key a saved model
    /// still reads
    pub fn window_delta(&self) -> u32 {
        self.source_code_delta.unwrap_or(DEFAULT_SOURCE_CODE_DELTA)
    }

    /// Check required keys and ranges, then resolve into settings
    pub fn validate(&self) -> EngineResult<DistanceSettings> {
        let basis: CentroidBasis = self
            .centroids
            .as_deref()
            .ok_or(EngineError::MissingConfig("centroids"))?
            .parse()?;

        let expected_clusters = self
            .expected_clusters
            .ok_or(EngineError::MissingConfig("expected_clusters"))?;
        if expected_clusters == 0 {
            return Err(EngineError::InvalidConfig(
                "distance.expected_clusters must be at least 1".into(),
            ));
        }

        let clustering: ClusteringAlgorithm = self
            .clustering_type
            .as_deref()
            .ok_or(EngineError::MissingConfig("clustering_type"))?
            .parse()?;

        let node_property = match self.node_property.as_deref() {
            Some(name) => name.parse()?,
            None => NodeProperty::default(),
        };

        let threshold_scaling = self.threshold_scaling.unwrap_or(DEFAULT_THRESHOLD_SCALING);
        if !(threshold_scaling.is_finite() && threshold_scaling > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "distance.threshold_scaling must be positive, got {}",
                threshold_scaling
            )));
        }

        let train_size = self.train_size.unwrap_or(DEFAULT_TRAIN_SIZE);
        if !(train_size > 0.0 && train_size < 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "distance.train_size must be between 0 and 1, got {}",
                train_size
            )));
        }

        Ok(DistanceSettings {
            model_path: self.model_path.clone(),
            node_property,
            source_code_delta: self.window_delta(),
            class_filter: self.class_filter()?,
            basis,
            expected_clusters,
            clustering,
            threshold_scaling,
            train_size,
            seed: self.seed.unwrap_or(DEFAULT_SEED),
        })
    }

    fn class_filter(&self) -> EngineResult<ClassFilter> {
        match (&self.include_models, &self.exclude_models) {
            (Some(ModelSelection::Keyword(word)), _) => {
                if word.trim().eq_ignore_ascii_case("all") {
                    Ok(ClassFilter::All)
                } else {
                    Ok(ClassFilter::Include(vec![parse_class(word)?]))
                }
            }
            (Some(ModelSelection::List(list)), _) if !list.is_empty() => {
                Ok(ClassFilter::Include(parse_classes(list)?))
            }
            (_, Some(list)) if !list.is_empty() => Ok(ClassFilter::Exclude(parse_classes(list)?)),
            _ => Err(EngineError::NoClassesSelected),
        }
    }
}

fn parse_class(raw: &str) -> EngineResult<DefectClass> {
    raw.parse::<DefectClass>().map_err(EngineError::InvalidConfig)
}

fn parse_classes(list: &[String]) -> EngineResult<Vec<DefectClass>> {
    list.iter().map(|c| parse_class(c)).collect()
}
