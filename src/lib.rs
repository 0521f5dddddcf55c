//! pathsentry - centroid-distance triage of ICFG defect paths
//!
//! Paths exported from an interprocedural control-flow graph are embedded
//! as fixed-length vectors and compared against per-CWE prototypes built
//! from labeled samples. Paths that fall under a class's calibrated
//! distance threshold become findings with their source context attached.

pub mod calibrate;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod embed;
pub mod error;
pub mod ingest;
pub mod merge;
pub mod models;
pub mod pipeline;
pub mod reporters;
pub mod source;

pub use error::{EngineError, EngineResult};
