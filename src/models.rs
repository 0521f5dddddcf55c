//! Core data models for pathsentry
//!
//! These models are shared by every phase: ingestion produces nodes and
//! paths, the classifier consumes their embeddings, and the reporters
//! serialize findings.

use crate::source::{parse_debug_location, SourceLocation};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Role of a node in the interprocedural control-flow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Call,
    Return,
    #[default]
    Other,
}

impl NodeKind {
    /// Classify a raw node kind, accepting both the short names and the
    /// ICFG node class names emitted by the graph export.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim() {
            "CallICFGNode" | "Call" | "call" => NodeKind::Call,
            "RetICFGNode" | "Return" | "return" => NodeKind::Return,
            _ => NodeKind::Other,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Call => write!(f, "call"),
            NodeKind::Return => write!(f, "return"),
            NodeKind::Other => write!(f, "other"),
        }
    }
}

/// A single ICFG node as exported by the graph query step.
///
/// Absent properties are empty strings; numeric properties are kept in
/// their textual form and coerced only when embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Node {
    #[serde(default)]
    pub full_inst: String,
    #[serde(default, alias = "src_loc")]
    pub debug_location: String,
    #[serde(default)]
    pub ir_opcode: String,
    #[serde(default, alias = "n_hash")]
    pub content_hash: String,
    #[serde(default)]
    pub node_type: String,
    #[serde(default)]
    pub func_name: String,
    #[serde(default, alias = "cs_name")]
    pub call_site_name: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub id: String,
}

/// An ordered node sequence extracted from the ICFG
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IcfgPath {
    /// Procedure the query started from
    #[serde(default)]
    pub procedure: String,
    pub nodes: Vec<Node>,
}

impl IcfgPath {
    pub fn new(procedure: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            procedure: procedure.into(),
            nodes,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Content hashes of the first and last node, if the path is non-empty
    pub fn endpoint_hashes(&self) -> Option<(&str, &str)> {
        let first = self.nodes.first()?;
        let last = self.nodes.last()?;
        Some((first.content_hash.as_str(), last.content_hash.as_str()))
    }

    /// Parsed source locations of every node that carries debug info, in
    /// node order (duplicates included).
    pub fn source_locations(&self) -> Vec<SourceLocation> {
        self.nodes
            .iter()
            .filter(|n| !n.debug_location.is_empty())
            .filter_map(|n| parse_debug_location(&n.debug_location))
            .collect()
    }

    /// Distinct source files the path traverses, in first-seen order
    pub fn filenames(&self) -> Vec<String> {
        let mut files: Vec<String> = Vec::new();
        for loc in self.source_locations() {
            if !files.contains(&loc.file) {
                files.push(loc.file);
            }
        }
        files
    }

    /// Stable identity used to pick merge representatives
    pub fn id_key(&self) -> String {
        self.nodes
            .iter()
            .map(|n| n.id.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Ground-truth label of a calibration sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Safe,
    Unsafe,
}

impl Label {
    pub fn from_safe_flag(safe: bool) -> Self {
        if safe {
            Label::Safe
        } else {
            Label::Unsafe
        }
    }

    pub fn is_safe(&self) -> bool {
        matches!(self, Label::Safe)
    }
}

/// A defect class (CWE) identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DefectClass(pub u32);

impl std::fmt::Display for DefectClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CWE-{}", self.0)
    }
}

impl FromStr for DefectClass {
    type Err = String;

    /// Accepts `CWE-121`, `cwe-121`, or a bare `121`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("CWE-")
            .or_else(|| trimmed.strip_prefix("cwe-"))
            .unwrap_or(trimmed);
        digits
            .parse::<u32>()
            .map(DefectClass)
            .map_err(|_| format!("'{}' is not a CWE identifier", s))
    }
}

/// A labeled calibration path
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPath {
    pub defect_class: DefectClass,
    pub label: Label,
    pub path: IcfgPath,
}

/// Fixed-length numeric descriptor of a path
pub type Embedding = Vec<f64>;

/// One class a scored path was flagged for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMatch {
    pub defect_class: DefectClass,
    /// Minimum Euclidean distance to the class's centroids
    pub distance: f64,
    /// Scaled threshold the distance was compared against
    pub threshold: f64,
    pub percent_of_threshold: f64,
    /// `|percent_of_threshold - 100|`
    pub percent_distance_to_centroid: f64,
}

/// A reported path, or a merged group of paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Finding {
    pub original_path: IcfgPath,
    pub embedding: Embedding,
    /// `CWE-n` → percent distance to centroid, highest first
    pub stats: IndexMap<String, f64>,
    #[serde(default)]
    pub matches: Vec<ClassMatch>,
    pub code: String,
    /// Displayed line (1-based) → original source line
    pub line_map: BTreeMap<usize, u32>,
    pub highlighted_lines: Vec<u32>,
    pub filenames: Vec<String>,
    /// Number of scored paths folded into this finding
    #[serde(default = "default_merged_count")]
    pub merged_count: usize,
}

fn default_merged_count() -> usize {
    1
}

impl Finding {
    /// Distinct filenames referenced by the highlighted lines
    pub fn distinct_files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = Vec::new();
        for f in &self.filenames {
            if !files.contains(&f.as_str()) {
                files.push(f.as_str());
            }
        }
        files
    }

    /// Class with the highest percent distance, if any
    pub fn top_class(&self) -> Option<(&str, f64)> {
        self.stats.iter().next().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub paths_loaded: usize,
    pub paths_valid: usize,
    pub classes_calibrated: usize,
    pub findings: usize,
    pub merged_findings: usize,
}
