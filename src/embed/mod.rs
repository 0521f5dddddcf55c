//! Path embedding
//!
//! A path becomes a vector by reading one numeric property per node,
//! right-padding with a sentinel to the batch's longest path, and rescaling
//! with bounds taken over the whole batch. Bounds start at zero and only
//! widen, so an all-positive batch keeps `lower == 0`.

use crate::error::EngineError;
use crate::models::{Embedding, IcfgPath, Node};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Sentinel for padding and for missing or falsy property values
pub const PADDING: f64 = -1.0;

/// Node property used as the per-node scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeProperty {
    #[default]
    NodeType,
    IrOpcode,
    ContentHash,
    FullInst,
    FuncName,
    CallSiteName,
    Id,
}

impl NodeProperty {
    pub fn name(&self) -> &'static str {
        match self {
            NodeProperty::NodeType => "node_type",
            NodeProperty::IrOpcode => "ir_opcode",
            NodeProperty::ContentHash => "content_hash",
            NodeProperty::FullInst => "full_inst",
            NodeProperty::FuncName => "func_name",
            NodeProperty::CallSiteName => "call_site_name",
            NodeProperty::Id => "id",
        }
    }

    fn read<'a>(&self, node: &'a Node) -> &'a str {
        match self {
            NodeProperty::NodeType => &node.node_type,
            NodeProperty::IrOpcode => &node.ir_opcode,
            NodeProperty::ContentHash => &node.content_hash,
            NodeProperty::FullInst => &node.full_inst,
            NodeProperty::FuncName => &node.func_name,
            NodeProperty::CallSiteName => &node.call_site_name,
            NodeProperty::Id => &node.id,
        }
    }
}

impl FromStr for NodeProperty {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "node_type" => Ok(NodeProperty::NodeType),
            "ir_opcode" => Ok(NodeProperty::IrOpcode),
            "content_hash" | "n_hash" => Ok(NodeProperty::ContentHash),
            "full_inst" => Ok(NodeProperty::FullInst),
            "func_name" => Ok(NodeProperty::FuncName),
            "call_site_name" | "cs_name" => Ok(NodeProperty::CallSiteName),
            "id" => Ok(NodeProperty::Id),
            _ => Err(EngineError::InvalidConfig(format!(
                "unknown node property '{}'",
                s
            ))),
        }
    }
}

impl std::fmt::Display for NodeProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Coerce a property to a float. Empty, non-numeric, and zero values are
/// falsy and map to the sentinel.
pub fn coerce(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v != 0.0 && v.is_finite() => v,
        _ => PADDING,
    }
}

/// Batch-wide scaling bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchBounds {
    pub lower: f64,
    pub upper: f64,
}

impl Default for BatchBounds {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 0.0,
        }
    }
}

impl BatchBounds {
    /// Widen the zero-seeded bounds over every value of the batch
    pub fn observe<'a>(vectors: impl IntoIterator<Item = &'a Vec<f64>>) -> Self {
        let mut bounds = Self::default();
        for v in vectors {
            for &x in v {
                if x < bounds.lower {
                    bounds.lower = x;
                }
                if x > bounds.upper {
                    bounds.upper = x;
                }
            }
        }
        bounds
    }

    pub fn is_degenerate(&self) -> bool {
        self.upper - self.lower == 0.0
    }

    /// Rescale a raw value; a degenerate batch maps everything to zero
    pub fn normalize(&self, x: f64) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            (x - self.lower) / (self.upper - self.lower)
        }
    }
}

/// Embedded vectors of one batch plus the geometry they share
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedBatch {
    pub vectors: Vec<Embedding>,
    pub dimension: usize,
    pub bounds: BatchBounds,
}

impl EmbeddedBatch {
    /// The padding sentinel after normalization
    pub fn padding_value(&self) -> f64 {
        self.bounds.normalize(PADDING)
    }
}

/// Maps paths to fixed-length vectors
#[derive(Debug, Clone, Copy, Default)]
pub struct PathEmbedder {
    property: NodeProperty,
}

impl PathEmbedder {
    pub fn new(property: NodeProperty) -> Self {
        Self { property }
    }

    pub fn property(&self) -> NodeProperty {
        self.property
    }

    /// Raw, unpadded numeric sequence of one path
    pub fn sequence(&self, path: &IcfgPath) -> Vec<f64> {
        path.nodes
            .iter()
            .map(|n| coerce(self.property.read(n)))
            .collect()
    }

    /// Embed a batch, padding to its longest path
    pub fn embed_batch(&self, paths: &[&IcfgPath]) -> EmbeddedBatch {
        self.embed_batch_min_len(paths, 0)
    }

    /// Embed a batch, padding to at least `min_len` so vectors line up with
    /// an existing centroid space.
    pub fn embed_batch_min_len(&self, paths: &[&IcfgPath], min_len: usize) -> EmbeddedBatch {
        // Pass 1: sequences, batch length, and bounds
        let mut vectors: Vec<Vec<f64>> = paths.par_iter().map(|p| self.sequence(p)).collect();
        let dimension = vectors.iter().map(Vec::len).max().unwrap_or(0).max(min_len);
        for v in vectors.iter_mut() {
            v.resize(dimension, PADDING);
        }
        let bounds = BatchBounds::observe(&vectors);

        // Pass 2: rescale every element with the shared bounds
        vectors.par_iter_mut().for_each(|v| {
            for x in v.iter_mut() {
                *x = bounds.normalize(*x);
            }
        });

        EmbeddedBatch {
            vectors,
            dimension,
            bounds,
        }
    }
}
