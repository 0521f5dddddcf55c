//! Output reporters for pathsentry results
//!
//! Supports two output formats for the terminal:
//! - `text` - Summary table with colors
//! - `json` - Machine-readable JSON
//!
//! Report files (`report.json`, `merged_report.json`) are always JSON and
//! are written by [`ReportWriter`].

mod json;
mod text;
mod writer;

pub use writer::{read_findings, ReportFiles, ReportWriter, MERGED_REPORT_FILE, REPORT_FILE};

use crate::calibrate::CalibratedModel;
use crate::models::{Finding, RunSummary};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Everything one analysis run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    pub summary: RunSummary,
    pub findings: Vec<Finding>,
    pub merged: Vec<Finding>,
}

/// Render an analysis report in the specified format
pub fn report_with_format(report: &AnalysisReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(report),
        OutputFormat::Json => json::render(report),
    }
}

/// Render the per-class threshold table of a calibrated model
pub fn thresholds_with_format(model: &CalibratedModel, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render_thresholds(model),
        OutputFormat::Json => json::render_thresholds(model),
    }
}
