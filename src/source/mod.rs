//! Source locations and source-code windows
//!
//! Nodes carry LLVM debug locations such as `{ ln: 21  cl: 5  fl: main.c }`
//! (or the older `in line: 21 file: main.c`). This module parses them and
//! turns sets of highlighted lines into renumbered code snippets.

mod context;

pub use context::{SourceContext, SourceContextExtractor, FILE_MARKER_LINE};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A line in a source file, as reported by debug info
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub file: String,
}

impl SourceLocation {
    pub fn new(line: u32, file: impl Into<String>) -> Self {
        Self {
            line,
            file: file.into(),
        }
    }
}

fn svf_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"ln:\s*(\d+).*?fl:\s*(\S.*?)\s*$").expect("valid debug location regex")
    })
}

fn legacy_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"in line:\s*(\d+).*?file:\s*(\S.*?)\s*$").expect("valid debug location regex")
    })
}

/// Strip the braces LLVM wraps debug strings in
pub fn normalize_debug_location(raw: &str) -> String {
    raw.replace(['{', '}'], "").trim().to_string()
}

/// Parse a raw debug location into a line/file pair.
///
/// Returns `None` when neither known format matches or the file is empty.
pub fn parse_debug_location(raw: &str) -> Option<SourceLocation> {
    let normalized = normalize_debug_location(raw);
    let caps = svf_pattern()
        .captures(&normalized)
        .or_else(|| legacy_pattern().captures(&normalized))?;
    let line = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let file = caps.get(2)?.as_str().trim();
    if file.is_empty() {
        return None;
    }
    Some(SourceLocation::new(line, file))
}
