//! Configuration module for pathsentry
//!
//! This module handles:
//! - Project-level configuration (pathsentry.toml)
//! - Environment overrides
//! - Validation into immutable run settings

mod project_config;
mod settings;

pub use project_config::{
    init_project_config, load_config, CliDefaults, DistanceConfig, ModelSelection, ProjectConfig,
    ENV_MODEL_PATH, ENV_SOURCE_DIR, PROJECT_CONFIG_FILE,
};
pub use settings::{DistanceSettings, DEFAULT_SOURCE_CODE_DELTA, DEFAULT_THRESHOLD_SCALING};
