//! CLI command definitions and handlers

mod analyze;
mod calibrate;
mod init;
mod thresholds;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

use pathsentry::calibrate::CalibratedModel;
use pathsentry::config::{load_config, ProjectConfig};
use pathsentry::pipeline::Pipeline;
use pathsentry::reporters::OutputFormat;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// pathsentry - centroid-distance triage of ICFG defect paths
#[derive(Parser, Debug)]
#[command(name = "pathsentry")]
#[command(
    version,
    about = "Rank ICFG defect paths by their distance to calibrated CWE prototypes",
    long_about = "pathsentry embeds paths exported from an interprocedural control-flow \
graph, calibrates per-CWE distance thresholds on labeled samples, and reports the \
paths that fall close to known defect prototypes together with their source context.",
    after_help = "\
Examples:
  pathsentry init                                    Write an example pathsentry.toml
  pathsentry calibrate -o model.json                 Calibrate and save the model
  pathsentry analyze --paths paths.jsonl --source-dir src --model model.json
  pathsentry thresholds --model model.json           Show the per-class thresholds"
)]
pub struct Cli {
    /// Config file (default: ./pathsentry.toml, then the user config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers (1-64)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a pathsentry.toml config file with example settings
    Init {
        /// Directory to write the config into
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Build centroids and thresholds from the labeled store and save them
    Calibrate {
        /// Where to write the calibrated model
        #[arg(long, short = 'o', default_value = "model.json")]
        output: PathBuf,
    },

    /// Score exported paths and write report.json and merged_report.json
    #[command(after_help = "\
Examples:
  pathsentry analyze --paths paths.jsonl --source-dir ./src
  pathsentry analyze --paths paths.jsonl --source-dir ./src --model model.json --format json
  pathsentry analyze --paths paths.jsonl --out-dir reports/")]
    Analyze {
        /// Query export (JSON lines, one path per line)
        #[arg(long)]
        paths: PathBuf,

        /// Root that debug-location file names are resolved against
        #[arg(long)]
        source_dir: Option<PathBuf>,

        /// Saved model; calibrates in-process when omitted
        #[arg(long)]
        model: Option<PathBuf>,

        /// Directory for report files
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, short = 'f', value_parser = ["text", "json"])]
        format: Option<String>,
    },

    /// Print the calibrated threshold of every class
    Thresholds {
        /// Saved model; calibrates in-process when omitted
        #[arg(long)]
        model: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { dir } = &cli.command {
        return init::run(dir);
    }

    let config = load_config(cli.config.as_deref())?;
    configure_workers(cli.workers.or(config.defaults.workers));

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Calibrate { output } => calibrate::run(&config, &output),
        Commands::Analyze {
            paths,
            source_dir,
            model,
            out_dir,
            format,
        } => {
            let format = resolve_format(format.as_deref(), &config)?;
            analyze::run(
                &config,
                &paths,
                source_dir.as_deref(),
                model.as_deref(),
                out_dir.as_deref(),
                format,
            )
        }
        Commands::Thresholds { model, format } => {
            thresholds::run(&config, model.as_deref(), format.parse()?)
        }
    }
}

/// Size the global rayon pool; the default pool is kept when unset
fn configure_workers(workers: Option<usize>) {
    let Some(n) = workers else {
        return;
    };
    if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(n).build_global() {
        tracing::debug!("Worker pool already initialized: {}", e);
    }
}

fn resolve_format(flag: Option<&str>, config: &ProjectConfig) -> Result<OutputFormat> {
    match flag.or(config.defaults.format.as_deref()) {
        Some(f) => f.parse(),
        None => Ok(OutputFormat::default()),
    }
}

/// Create spinner progress style
fn create_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Start a spinner for a long-running phase
fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(create_spinner_style());
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Load a saved model, or calibrate from the configured store
fn obtain_model(config: &ProjectConfig, model: Option<&Path>) -> Result<CalibratedModel> {
    match model {
        Some(path) => load_model(path),
        None => calibrate_model(&Pipeline::new(config.distance.validate()?, ".", ".")),
    }
}

fn load_model(path: &Path) -> Result<CalibratedModel> {
    let bar = spinner("Loading calibrated model...");
    let loaded = CalibratedModel::load(path);
    bar.finish_and_clear();
    loaded.with_context(|| format!("Failed to load model {}", path.display()))
}

fn calibrate_model(pipeline: &Pipeline) -> Result<CalibratedModel> {
    let bar = spinner("Calibrating centroids and thresholds...");
    let result = pipeline.calibrate();
    bar.finish_and_clear();
    result
}
