//! Project-level configuration support
//!
//! Loads configuration from an explicit `--config` file, `pathsentry.toml`
//! in the working directory, or the user config directory, in that order.
//! A relative `distance.model_path` is taken relative to the file it was
//! read from.
//!
//! # Configuration Format
//!
//! ```toml
//! # pathsentry.toml
//!
//! [distance]
//! model_path = "data/labeled_paths.jsonl"
//! node_property = "node_type"
//! source_code_delta = 4
//! include_models = ["CWE-121", "CWE-122"]   # or "all"
//! centroids = "bad"
//! expected_clusters = 5
//! clustering_type = "kmeans"
//! threshold_scaling = 1.0
//!
//! [defaults]
//! format = "text"
//! workers = 8
//! out_dir = "reports"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = "pathsentry.toml";

/// Environment variable overriding `distance.model_path`
pub const ENV_MODEL_PATH: &str = "PATHSENTRY_MODEL_PATH";

/// Environment variable overriding `defaults.source_dir`
pub const ENV_SOURCE_DIR: &str = "PATHSENTRY_SOURCE_DIR";

/// Top-level configuration file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProjectConfig {
    /// Distance classifier settings
    #[serde(default)]
    pub distance: DistanceConfig,

    /// Default CLI flags
    #[serde(default)]
    pub defaults: CliDefaults,
}

/// `include_models` is either the string `"all"` or a list of classes
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ModelSelection {
    Keyword(String),
    List(Vec<String>),
}

/// Raw `[distance]` table; validated into
/// [`DistanceSettings`](super::DistanceSettings)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DistanceConfig {
    /// Labeled-path store used for calibration
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Node property embedded per node (default: node_type)
    #[serde(default)]
    pub node_property: Option<String>,

    /// Source lines shown before and after each highlighted line
    #[serde(default)]
    pub source_code_delta: Option<u32>,

    #[serde(default)]
    pub include_models: Option<ModelSelection>,

    #[serde(default)]
    pub exclude_models: Option<Vec<String>>,

    /// Centroid basis: "bad" or "good"
    #[serde(default)]
    pub centroids: Option<String>,

    /// Number of clusters per class
    #[serde(default)]
    pub expected_clusters: Option<usize>,

    #[serde(default)]
    pub clustering_type: Option<String>,

    /// Multiplier applied to every optimal threshold
    #[serde(default)]
    pub threshold_scaling: Option<f64>,

    /// Fraction of each label subset used for training
    #[serde(default)]
    pub train_size: Option<f64>,

    #[serde(default)]
    pub seed: Option<u64>,
}

/// Default CLI flags that can be set in project config
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliDefaults {
    /// Default output format (text, json)
    #[serde(default)]
    pub format: Option<String>,

    /// Default number of workers
    #[serde(default)]
    pub workers: Option<usize>,

    /// Where report files are written
    #[serde(default)]
    pub out_dir: Option<PathBuf>,

    /// Root that debug-location file names are resolved against
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
}

impl ProjectConfig {
    /// Parse a TOML configuration string
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides using `lookup` to read variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_MODEL_PATH).filter(|v| !v.is_empty()) {
            debug!("{} overrides distance.model_path", ENV_MODEL_PATH);
            self.distance.model_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup(ENV_SOURCE_DIR).filter(|v| !v.is_empty()) {
            debug!("{} overrides defaults.source_dir", ENV_SOURCE_DIR);
            self.defaults.source_dir = Some(PathBuf::from(dir));
        }
    }

    /// Anchor a relative `distance.model_path` at the config file's directory
    pub fn resolve_relative_to(&mut self, base: &Path) {
        if let Some(path) = self.distance.model_path.as_mut().filter(|p| p.is_relative()) {
            *path = base.join(&*path);
        }
    }

    /// Per-user config file location
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pathsentry").join("config.toml"))
    }
}

/// Load configuration, then apply environment overrides.
///
/// An explicit path must exist and parse. Without one, the working
/// directory's `pathsentry.toml` is tried, then the user config; with
/// neither present the defaults are used.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<ProjectConfig> {
    let mut config = match explicit {
        Some(path) => load_toml_config(path)?,
        None => discover_config()?,
    };
    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

fn discover_config() -> anyhow::Result<ProjectConfig> {
    let local = PathBuf::from(PROJECT_CONFIG_FILE);
    if local.exists() {
        return load_toml_config(&local);
    }

    if let Some(user) = ProjectConfig::user_config_path().filter(|p| p.exists()) {
        return load_toml_config(&user);
    }

    debug!("No config file found, using defaults");
    Ok(ProjectConfig::default())
}

/// Load configuration from a TOML file
fn load_toml_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    use anyhow::Context;

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let mut config = ProjectConfig::from_toml(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    if let Some(base) = path.parent() {
        config.resolve_relative_to(base);
    }
    info!("Loaded config from {}", path.display());
    Ok(config)
}

const EXAMPLE_CONFIG: &str = r#"# pathsentry configuration

[distance]
# Labeled calibration paths (JSON lines: {"cwe": 121, "safe": false, "path": [...]})
model_path = "labeled_paths.jsonl"

# Node property embedded per node
node_property = "node_type"

# Source lines shown around each highlighted line
source_code_delta = 4

# Classes used to build the model: "all" or a list
include_models = "all"
# exclude_models = ["CWE-401"]

# Build centroids on "bad" (unsafe) or "good" (safe) samples
centroids = "bad"
expected_clusters = 5
clustering_type = "kmeans"

# Multiplier applied to every calibrated threshold
threshold_scaling = 1.0

# train_size = 0.5
# seed = 42

[defaults]
# format = "text"
# workers = 8
# out_dir = "pathsentry-reports"
# source_dir = "."
"#;

/// Write an example `pathsentry.toml` into `dir` unless one exists
pub fn init_project_config(dir: &Path) -> anyhow::Result<(PathBuf, bool)> {
    let config_path = dir.join(PROJECT_CONFIG_FILE);
    if config_path.exists() {
        return Ok((config_path, false));
    }
    std::fs::create_dir_all(dir)?;
    std::fs::write(&config_path, EXAMPLE_CONFIG)?;
    Ok((config_path, true))
}
