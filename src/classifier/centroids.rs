//! Per-class prototype clusters

use super::kmeans::{self, KMeansParams};
use super::CalibrationSample;
use crate::error::EngineError;
use crate::models::{DefectClass, Label};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{info, warn};

/// Supported clustering strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusteringAlgorithm {
    KMeans,
}

impl FromStr for ClusteringAlgorithm {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kmeans" | "k-means" | "k_means" => Ok(ClusteringAlgorithm::KMeans),
            _ => Err(EngineError::UnsupportedClustering(s.to_string())),
        }
    }
}

impl std::fmt::Display for ClusteringAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusteringAlgorithm::KMeans => write!(f, "kmeans"),
        }
    }
}

impl ClusteringAlgorithm {
    /// Fit exactly `k` centroids, or `None` with fewer than `k` points
    pub fn fit(&self, points: &[&[f64]], k: usize, seed: u64) -> Option<(Vec<Vec<f64>>, f64)> {
        match self {
            ClusteringAlgorithm::KMeans => {
                kmeans::fit(points, &KMeansParams::new(k, seed)).map(|f| (f.centroids, f.inertia))
            }
        }
    }
}

/// How a path's distance is read as "predicted safe" during calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Close to safe prototypes means safe
    LessThan,
    /// Far from unsafe prototypes means safe
    GreaterThan,
}

impl Comparison {
    pub fn predicts_safe(&self, distance: f64, threshold: f64) -> bool {
        match self {
            Comparison::LessThan => distance < threshold,
            Comparison::GreaterThan => distance > threshold,
        }
    }
}

/// Which training samples the prototypes are built on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CentroidBasis {
    /// Built on unsafe ("bad") samples
    #[serde(rename = "bad", alias = "unsafe")]
    Unsafe,
    /// Built on safe ("good") samples
    #[serde(rename = "good", alias = "safe")]
    Safe,
}

impl CentroidBasis {
    pub fn label(&self) -> Label {
        match self {
            CentroidBasis::Unsafe => Label::Unsafe,
            CentroidBasis::Safe => Label::Safe,
        }
    }

    /// Calibration comparison fixed by the basis
    pub fn comparison(&self) -> Comparison {
        match self {
            CentroidBasis::Unsafe => Comparison::GreaterThan,
            CentroidBasis::Safe => Comparison::LessThan,
        }
    }
}

impl FromStr for CentroidBasis {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bad" | "unsafe" => Ok(CentroidBasis::Unsafe),
            "good" | "safe" => Ok(CentroidBasis::Safe),
            _ => Err(EngineError::InvalidConfig(format!(
                "distance.centroids must be 'bad' or 'good', got '{}'",
                s
            ))),
        }
    }
}

impl std::fmt::Display for CentroidBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CentroidBasis::Unsafe => write!(f, "bad"),
            CentroidBasis::Safe => write!(f, "good"),
        }
    }
}

/// The k prototypes of one defect class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidSet {
    pub defect_class: DefectClass,
    pub centroids: Vec<Vec<f64>>,
    /// Training samples the set was fitted on
    pub samples: usize,
    pub inertia: f64,
}

/// Builds one centroid set per class from a training subset
#[derive(Debug, Clone, Copy)]
pub struct CentroidModel {
    pub algorithm: ClusteringAlgorithm,
    pub k: usize,
    pub seed: u64,
}

impl CentroidModel {
    pub fn new(algorithm: ClusteringAlgorithm, k: usize, seed: u64) -> Self {
        Self { algorithm, k, seed }
    }

    /// Cluster every class present in `training`. Classes with fewer than
    /// `k` samples are skipped with a warning. Output is ordered by class.
    pub fn build(&self, training: &[&CalibrationSample]) -> Vec<CentroidSet> {
        let mut by_class: BTreeMap<DefectClass, Vec<&[f64]>> = BTreeMap::new();
        for sample in training {
            by_class
                .entry(sample.defect_class)
                .or_default()
                .push(sample.embedding.as_slice());
        }

        let mut sets: Vec<CentroidSet> = by_class
            .into_par_iter()
            .filter_map(|(class, points)| {
                if points.len() < self.k {
                    warn!(
                        "Not enough samples for {} ({} < {} clusters), skipping this class",
                        class,
                        points.len(),
                        self.k
                    );
                    return None;
                }
                let (centroids, inertia) = self.algorithm.fit(&points, self.k, self.seed)?;
                Some(CentroidSet {
                    defect_class: class,
                    centroids,
                    samples: points.len(),
                    inertia,
                })
            })
            .collect();
        sets.sort_by_key(|s| s.defect_class);

        info!("Built centroid sets for {} classes", sets.len());
        sets
    }
}
