//! Path ingestion
//!
//! Reads the line-delimited path records exported by the graph query step,
//! drops paths whose call/return structure is unbalanced, and loads the
//! labeled calibration store.

mod labeled;
mod raw;

pub use labeled::{load_labeled_paths, ClassFilter};

use crate::error::{EngineError, EngineResult};
use crate::models::{IcfgPath, NodeKind};
use raw::{procedure_name, RawPath};
use serde::Deserialize;
use serde_json::Value;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};

/// Why a path failed call/return validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackViolation {
    /// A return node with no open call frame
    ReturnOnEmptyStack { index: usize },
    /// A return node whose call site differs from the innermost open call
    MismatchedReturn {
        index: usize,
        expected: String,
        found: String,
    },
}

impl std::fmt::Display for StackViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackViolation::ReturnOnEmptyStack { index } => {
                write!(f, "return at node {} with empty call stack", index)
            }
            StackViolation::MismatchedReturn {
                index,
                expected,
                found,
            } => write!(
                f,
                "return at node {} to '{}' but innermost call is '{}'",
                index, found, expected
            ),
        }
    }
}

/// Check that every return matches the innermost open call.
///
/// Calls left open at the end of the path are fine: a path may stop inside
/// a callee.
pub fn validate_call_stack(path: &IcfgPath) -> Result<(), StackViolation> {
    let mut stack: Vec<&str> = Vec::new();
    for (index, node) in path.nodes.iter().enumerate() {
        match node.kind {
            NodeKind::Call => stack.push(node.call_site_name.as_str()),
            NodeKind::Return => match stack.pop() {
                None => return Err(StackViolation::ReturnOnEmptyStack { index }),
                Some(open) if open != node.call_site_name => {
                    return Err(StackViolation::MismatchedReturn {
                        index,
                        expected: open.to_string(),
                        found: node.call_site_name.clone(),
                    })
                }
                Some(_) => {}
            },
            NodeKind::Other => {}
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default, alias = "proc", alias = "procedure")]
    f: Value,
    path: RawPath,
}

/// Result of reading a query export
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Valid paths, in input order
    pub paths: Vec<IcfgPath>,
    /// Records read
    pub total: usize,
    /// Records dropped by stack validation
    pub dropped: usize,
}

/// Loads exported path records
#[derive(Debug, Default, Clone, Copy)]
pub struct PathIngestor;

impl PathIngestor {
    pub fn new() -> Self {
        Self
    }

    /// Read a JSON-lines export from disk
    pub fn read_file(&self, path: &Path) -> EngineResult<IngestReport> {
        let file = std::fs::File::open(path).map_err(|e| EngineError::io(path, e))?;
        let report = self.read(std::io::BufReader::new(file), &path.display().to_string())?;
        info!(
            "Loaded {} paths from {} ({} dropped by call/return validation)",
            report.paths.len(),
            path.display(),
            report.dropped
        );
        Ok(report)
    }

    /// Read records from any buffered source. `context` names the source in
    /// error messages.
    pub fn read<R: BufRead>(&self, reader: R, context: &str) -> EngineResult<IngestReport> {
        let mut report = IngestReport::default();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| EngineError::io(context, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let where_ = format!("{} line {}", context, line_no + 1);
            let record: RawRecord =
                serde_json::from_str(&line).map_err(|e| EngineError::json(&where_, e))?;
            let nodes = record
                .path
                .into_nodes()
                .map_err(|e| EngineError::json(&where_, e))?;
            let path = IcfgPath::new(procedure_name(&record.f), nodes);

            report.total += 1;
            match validate_call_stack(&path) {
                Ok(()) => report.paths.push(path),
                Err(violation) => {
                    debug!("Dropping path at {}: {}", where_, violation);
                    report.dropped += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Node;

    fn call(cs: &str) -> Node {
        Node {
            kind: NodeKind::Call,
            call_site_name: cs.into(),
            ..Default::default()
        }
    }

    fn ret(cs: &str) -> Node {
        Node {
            kind: NodeKind::Return,
            call_site_name: cs.into(),
            ..Default::default()
        }
    }

    fn other() -> Node {
        Node::default()
    }

    #[test]
    fn test_balanced_path_is_valid() {
        let path = IcfgPath::new(
            "main",
            vec![other(), call("a"), call("b"), other(), ret("b"), ret("a"), other()],
        );
        assert_eq!(validate_call_stack(&path), Ok(()));
    }

    #[test]
    fn test_open_calls_are_valid() {
        let path = IcfgPath::new("main", vec![call("a"), other(), call("b")]);
        assert!(validate_call_stack(&path).is_ok());
    }

    #[test]
    fn test_lone_return_is_rejected() {
        let path = IcfgPath::new("main", vec![other(), ret("a")]);
        assert_eq!(
            validate_call_stack(&path),
            Err(StackViolation::ReturnOnEmptyStack { index: 1 })
        );
    }

    #[test]
    fn test_mismatched_return_is_rejected() {
        let path = IcfgPath::new("main", vec![call("a"), call("b"), ret("a")]);
        assert_eq!(
            validate_call_stack(&path),
            Err(StackViolation::MismatchedReturn {
                index: 2,
                expected: "b".into(),
                found: "a".into(),
            })
        );
    }

    #[test]
    fn test_read_drops_invalid_paths_silently() {
        let input = r#"{"f": "main", "path": {"nodes": [{"id": 1, "properties": {"node_name": "CallICFGNode", "cs_name": "c1"}}, {"id": 2, "properties": {"node_name": "RetICFGNode", "cs_name": "c1"}}]}}

{"f": "main", "path": {"nodes": [{"id": 3, "properties": {"node_name": "RetICFGNode", "cs_name": "c9"}}]}}
{"f": {"properties": {"name": "helper"}}, "path": [{"id": 4, "node_type": 2}]}
"#;
        let report = PathIngestor::new().read(input.as_bytes(), "test").unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.paths.len(), 2);
        assert_eq!(report.paths[0].procedure, "main");
        assert_eq!(report.paths[0].nodes[1].id, "2");
        assert_eq!(report.paths[1].procedure, "helper");
        assert_eq!(report.paths[1].nodes[0].node_type, "2");
    }

    #[test]
    fn test_read_rejects_malformed_json() {
        let err = PathIngestor::new().read("{not json".as_bytes(), "test").unwrap_err();
        assert!(matches!(err, EngineError::Json { .. }));
        assert!(err.to_string().contains("test line 1"));
    }
}
