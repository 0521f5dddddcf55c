//! Report files

use crate::error::{EngineError, EngineResult};
use crate::models::Finding;
use std::path::{Path, PathBuf};
use tracing::info;

pub const REPORT_FILE: &str = "report.json";
pub const MERGED_REPORT_FILE: &str = "merged_report.json";

/// Paths of the files one run wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFiles {
    pub report: PathBuf,
    pub merged_report: PathBuf,
}

/// Writes the findings and merged-findings files into one directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    out_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Write both files, creating the output directory if needed
    pub fn write(&self, findings: &[Finding], merged: &[Finding]) -> EngineResult<ReportFiles> {
        std::fs::create_dir_all(&self.out_dir).map_err(|e| EngineError::io(&self.out_dir, e))?;

        let files = ReportFiles {
            report: self.out_dir.join(REPORT_FILE),
            merged_report: self.out_dir.join(MERGED_REPORT_FILE),
        };
        write_findings(&files.report, findings)?;
        write_findings(&files.merged_report, merged)?;

        info!(
            "Wrote {} findings to {} and {} merged findings to {}",
            findings.len(),
            files.report.display(),
            merged.len(),
            files.merged_report.display()
        );
        Ok(files)
    }
}

fn write_findings(path: &Path, findings: &[Finding]) -> EngineResult<()> {
    let json = serde_json::to_string(findings)
        .map_err(|e| EngineError::json(path.display().to_string(), e))?;
    std::fs::write(path, json).map_err(|e| EngineError::io(path, e))
}

/// Read a findings file back
pub fn read_findings(path: &Path) -> EngineResult<Vec<Finding>> {
    let data = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
    serde_json::from_str(&data).map_err(|e| EngineError::json(path.display().to_string(), e))
}
