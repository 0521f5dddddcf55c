//! Text (terminal) reporter with colors and formatting

use super::AnalysisReport;
use crate::calibrate::CalibratedModel;
use crate::models::Finding;
use anyhow::Result;

/// Reset ANSI color
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// How many merged findings the summary table lists
const TOP_FINDINGS: usize = 10;

/// Color by closeness: 100% sits on a centroid, 0% on the cutoff
fn closeness_color(percent_distance: f64) -> &'static str {
    if percent_distance >= 66.0 {
        "\x1b[31m" // Red
    } else if percent_distance >= 33.0 {
        "\x1b[33m" // Yellow
    } else {
        "\x1b[34m" // Blue
    }
}

/// Render report as formatted terminal output
pub fn render(report: &AnalysisReport) -> Result<String> {
    let mut out = String::new();
    let s = &report.summary;

    out.push_str(&format!("\n{BOLD}pathsentry analysis{RESET}\n"));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
    out.push_str(&format!(
        "Paths: {} loaded, {} valid  Classes: {}\n",
        s.paths_loaded, s.paths_valid, s.classes_calibrated
    ));
    out.push_str(&format!(
        "{BOLD}FINDINGS{RESET} {} flagged, {} after merging\n\n",
        s.findings, s.merged_findings
    ));

    if report.merged.is_empty() {
        out.push_str(&format!("{DIM}No path fell under a class threshold.{RESET}\n"));
        return Ok(out);
    }

    out.push_str(&format!(
        "{DIM}  #   CLASS     DIST%   LINES            FILE{RESET}\n"
    ));
    out.push_str(&format!(
        "{DIM}  ─────────────────────────────────────────────────────────────────{RESET}\n"
    ));

    let mut ranked: Vec<&Finding> = report.merged.iter().collect();
    ranked.sort_by(|a, b| {
        let ta = a.top_class().map_or(0.0, |(_, v)| v);
        let tb = b.top_class().map_or(0.0, |(_, v)| v);
        tb.total_cmp(&ta)
    });

    for (i, finding) in ranked.iter().take(TOP_FINDINGS).enumerate() {
        let (class, pct) = finding.top_class().unwrap_or(("-", 0.0));
        let color = closeness_color(pct);
        out.push_str(&format!(
            "  {DIM}{:>3}{RESET}  {:<8}  {color}{:>5.1}{RESET}   {:<15}  {DIM}{}{RESET}\n",
            i + 1,
            class,
            pct,
            format_lines(&finding.highlighted_lines),
            format_files(finding)
        ));
    }

    let remaining = ranked.len().saturating_sub(TOP_FINDINGS);
    if remaining > 0 {
        out.push_str(&format!(
            "\n  {DIM}...and {} more (see merged_report.json){RESET}\n",
            remaining
        ));
    }
    out.push('\n');

    Ok(out)
}

/// Render thresholds as an aligned table
pub fn render_thresholds(model: &CalibratedModel) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!(
        "\n{BOLD}Calibrated thresholds{RESET} {DIM}(centroids on '{}', scaling {}, {}){RESET}\n",
        model.basis, model.scaling_factor, model.generated_at
    ));
    out.push_str(&format!(
        "{DIM}  CLASS      LOWER    UPPER  OPTIMAL   SCALED    AUC{RESET}\n"
    ));
    for t in &model.thresholds {
        out.push_str(&format!(
            "  {:<8} {:>7.3}  {:>7.3}  {:>7.3}  {:>7.3}  {:>5.3}\n",
            t.defect_class.to_string(),
            t.lower_bound,
            t.upper_bound,
            t.optimal_threshold,
            t.scaled_threshold,
            t.auc
        ));
    }
    if model.thresholds.is_empty() {
        out.push_str(&format!("  {DIM}No class was calibrated.{RESET}\n"));
    }
    Ok(out)
}

/// Compact highlighted-line list, truncated past a few entries
fn format_lines(lines: &[u32]) -> String {
    let shown: Vec<String> = lines.iter().take(4).map(|l| l.to_string()).collect();
    if lines.len() > 4 {
        format!("{},…", shown.join(","))
    } else {
        shown.join(",")
    }
}

fn format_files(finding: &Finding) -> String {
    let files = finding.distinct_files();
    match files.as_slice() {
        [] => String::new(),
        [one] => shorten(one),
        [first, rest @ ..] => format!("{} (+{} files)", shorten(first), rest.len()),
    }
}

fn shorten(file: &str) -> String {
    if file.chars().count() > 25 {
        let skip = file.chars().count() - 22;
        format!("...{}", file.chars().skip(skip).collect::<String>())
    } else {
        file.to_string()
    }
}
