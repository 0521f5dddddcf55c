//! Calibrate command - build and save a model

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use pathsentry::config::ProjectConfig;

/// Run the calibrate command
pub fn run(config: &ProjectConfig, output: &Path) -> Result<()> {
    let model = super::obtain_model(config, None)?;
    model
        .save(output)
        .with_context(|| format!("Failed to save model to {}", output.display()))?;

    println!(
        "{} Calibrated {} classes on {} ({} with thresholds)",
        style("✓").green(),
        model.centroids.len(),
        model.node_property,
        model.thresholds.len()
    );
    println!("  Model saved to {}", style(output.display()).cyan());
    Ok(())
}
