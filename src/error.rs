//! Engine error taxonomy
//!
//! Only fatal conditions are errors. Per-path problems (unbalanced
//! call/return stacks) and per-class problems (too few samples) are
//! logged and degrade the output instead.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised by the triage engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Missing required configuration key: distance.{0}")]
    MissingConfig(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Clustering algorithm not supported: {0}")]
    UnsupportedClustering(String),

    #[error("No CWE classes were selected to initialize the model (set distance.include_models or distance.exclude_models)")]
    NoClassesSelected,

    #[error("No labeled paths left after loading and class filtering")]
    NoLabeledPaths,

    #[error("No class had enough samples to build centroids")]
    NoCentroids,

    #[error("Calibrated model version mismatch: found {found}, expected {expected}")]
    ModelVersion { found: u32, expected: u32 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
