//! Init command - write an example configuration

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use pathsentry::config::init_project_config;

/// Run the init command
pub fn run(dir: &Path) -> Result<()> {
    let (config_path, created) = init_project_config(dir)
        .with_context(|| format!("Failed to write config into {}", dir.display()))?;

    if created {
        println!(
            "{} Created {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        println!(
            "\nSet {} to your labeled store, then run {}",
            style("distance.model_path").bold(),
            style("pathsentry calibrate").bold()
        );
    } else {
        println!(
            "{} Config already exists at {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
    }

    Ok(())
}
