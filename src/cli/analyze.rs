//! Analyze command - score exported paths and write reports

use anyhow::Result;
use console::style;
use std::path::{Path, PathBuf};

use pathsentry::config::ProjectConfig;
use pathsentry::pipeline::Pipeline;
use pathsentry::reporters::{report_with_format, OutputFormat};

/// Run the analyze command
pub fn run(
    config: &ProjectConfig,
    paths: &Path,
    source_dir: Option<&Path>,
    model: Option<&Path>,
    out_dir: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let source_dir = resolve_dir(source_dir, config.defaults.source_dir.as_deref());
    let out_dir = resolve_dir(out_dir, config.defaults.out_dir.as_deref());

    // A saved model needs no calibration keys
    let (pipeline, model) = match model {
        Some(path) => (
            Pipeline::for_saved_model(config.distance.window_delta(), source_dir, out_dir),
            super::load_model(path)?,
        ),
        None => {
            let pipeline = Pipeline::new(config.distance.validate()?, source_dir, out_dir);
            let model = super::calibrate_model(&pipeline)?;
            (pipeline, model)
        }
    };

    let bar = super::spinner("Scoring paths...");
    let outcome = pipeline.analyze(paths, &model);
    bar.finish_and_clear();
    let outcome = outcome?;

    print!("{}", report_with_format(&outcome.report, format)?);
    if format == OutputFormat::Text {
        println!(
            "{} Reports written to {} and {}",
            style("✓").green(),
            style(outcome.files.report.display()).cyan(),
            style(outcome.files.merged_report.display()).cyan()
        );
    }
    Ok(())
}

/// Flag, then config, then the working directory
fn resolve_dir(flag: Option<&Path>, configured: Option<&Path>) -> PathBuf {
    flag.or(configured)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
