//! Labeled calibration paths
//!
//! The store is JSON lines, one sample per line:
//! `{"cwe": 121, "safe": false, "path": [ {node properties}, ... ]}`.
//! The path column may also be a JSON-encoded string of the node list.

use super::raw::RawPath;
use crate::error::{EngineError, EngineResult};
use crate::models::{DefectClass, IcfgPath, Label, LabeledPath};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct RawLabeled {
    #[serde(alias = "cwe")]
    defect_class: Value,
    safe: Value,
    path: RawPath,
}

fn parse_class(value: &Value) -> Option<DefectClass> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()).map(DefectClass),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_safe(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "safe" | "good" => Some(true),
            "false" | "0" | "unsafe" | "bad" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Load every labeled path from a JSON-lines store
pub fn load_labeled_paths(path: &Path) -> EngineResult<Vec<LabeledPath>> {
    let file = std::fs::File::open(path).map_err(|e| EngineError::io(path, e))?;
    let samples = read_labeled(BufReader::new(file), &path.display().to_string())?;
    info!("Loaded {} labeled paths from {}", samples.len(), path.display());
    Ok(samples)
}

pub(crate) fn read_labeled<R: BufRead>(reader: R, context: &str) -> EngineResult<Vec<LabeledPath>> {
    let mut samples = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| EngineError::io(context, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let where_ = format!("{} line {}", context, line_no + 1);
        let raw: RawLabeled =
            serde_json::from_str(&line).map_err(|e| EngineError::json(&where_, e))?;

        let defect_class = parse_class(&raw.defect_class).ok_or_else(|| {
            EngineError::InvalidConfig(format!(
                "{}: unrecognised defect class {}",
                where_, raw.defect_class
            ))
        })?;
        let safe = parse_safe(&raw.safe).ok_or_else(|| {
            EngineError::InvalidConfig(format!("{}: unrecognised safe flag {}", where_, raw.safe))
        })?;
        let nodes = raw
            .path
            .into_nodes()
            .map_err(|e| EngineError::json(&where_, e))?;

        samples.push(LabeledPath {
            defect_class,
            label: Label::from_safe_flag(safe),
            path: IcfgPath::new("", nodes),
        });
    }

    Ok(samples)
}

/// Which defect classes feed the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassFilter {
    All,
    Include(Vec<DefectClass>),
    Exclude(Vec<DefectClass>),
}

impl ClassFilter {
    pub fn accepts(&self, class: DefectClass) -> bool {
        match self {
            ClassFilter::All => true,
            ClassFilter::Include(classes) => classes.contains(&class),
            ClassFilter::Exclude(classes) => !classes.contains(&class),
        }
    }

    /// Keep only samples of accepted classes
    pub fn apply(&self, samples: Vec<LabeledPath>) -> Vec<LabeledPath> {
        let kept: Vec<LabeledPath> = samples
            .into_iter()
            .filter(|s| self.accepts(s.defect_class))
            .collect();

        let mut per_class: BTreeMap<DefectClass, usize> = BTreeMap::new();
        for s in &kept {
            *per_class.entry(s.defect_class).or_default() += 1;
        }
        info!(
            "Selected {} labeled paths across {} classes",
            kept.len(),
            per_class.len()
        );
        kept
    }
}
