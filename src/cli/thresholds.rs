//! Thresholds command - show per-class cutoffs

use anyhow::Result;
use std::path::Path;

use pathsentry::config::ProjectConfig;
use pathsentry::reporters::{thresholds_with_format, OutputFormat};

/// Run the thresholds command
pub fn run(config: &ProjectConfig, model: Option<&Path>, format: OutputFormat) -> Result<()> {
    let model = super::obtain_model(config, model)?;
    println!("{}", thresholds_with_format(&model, format)?);
    Ok(())
}
