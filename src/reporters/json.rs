//! JSON reporter
//!
//! Outputs the run summary and merged findings as pretty-printed JSON.
//! Useful for machine consumption, piping to jq, or further processing.

use super::AnalysisReport;
use crate::calibrate::CalibratedModel;
use anyhow::Result;
use serde_json::json;

/// Render report as JSON
pub fn render(report: &AnalysisReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(&json!({
        "summary": report.summary,
        "findings": report.merged,
    }))?)
}

/// Render thresholds as JSON, without the ROC sweeps
pub fn render_thresholds(model: &CalibratedModel) -> Result<String> {
    let rows: Vec<_> = model
        .thresholds
        .iter()
        .map(|t| {
            json!({
                "defect_class": t.defect_class.to_string(),
                "lower_bound": t.lower_bound,
                "upper_bound": t.upper_bound,
                "optimal_threshold": t.optimal_threshold,
                "scaled_threshold": t.scaled_threshold,
                "auc": t.auc,
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&json!({
        "generated_at": model.generated_at,
        "basis": model.basis,
        "scaling_factor": model.scaling_factor,
        "thresholds": rows,
    }))?)
}
