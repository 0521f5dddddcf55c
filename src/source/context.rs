//! Source-code windows around highlighted lines

use super::SourceLocation;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Line-map value used for the `/* Extracted from: ... */` marker rows,
/// which have no source line of their own.
pub const FILE_MARKER_LINE: u32 = 0;

/// A renumbered snippet ready for display
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceContext {
    /// Concatenated windows, one marker row per file
    pub code: String,
    /// Displayed line (contiguous from 1) → original source line
    pub line_map: BTreeMap<usize, u32>,
    /// Highlighted lines in location order; line 0 is reported as 1
    pub highlighted_lines: Vec<u32>,
    /// File of each highlighted line (parallel to `highlighted_lines`)
    pub filenames: Vec<String>,
}

/// Extracts `delta` lines of context around each highlighted line
#[derive(Debug, Clone)]
pub struct SourceContextExtractor {
    root: PathBuf,
    delta: u32,
}

impl SourceContextExtractor {
    pub fn new(root: impl Into<PathBuf>, delta: u32) -> Self {
        Self {
            root: root.into(),
            delta,
        }
    }

    pub fn delta(&self) -> u32 {
        self.delta
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build the snippet for a set of locations.
    ///
    /// Locations are deduplicated and ordered by line. Windows from the same
    /// file are concatenated under a single marker row; a source line that
    /// falls into several overlapping windows is shown once.
    pub fn extract(&self, locations: &[SourceLocation]) -> SourceContext {
        let mut locs: Vec<SourceLocation> = Vec::with_capacity(locations.len());
        let mut seen: FxHashSet<&SourceLocation> = FxHashSet::default();
        for loc in locations {
            if seen.insert(loc) {
                locs.push(loc.clone());
            }
        }
        locs.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.file.cmp(&b.file)));

        let mut file_order: Vec<&str> = Vec::new();
        for loc in &locs {
            if !file_order.contains(&loc.file.as_str()) {
                file_order.push(loc.file.as_str());
            }
        }

        let mut rows: Vec<(u32, String)> = Vec::new();
        let mut cache: FxHashMap<&str, Option<Vec<String>>> = FxHashMap::default();

        for file in file_order {
            let lines = cache
                .entry(file)
                .or_insert_with(|| self.read_lines(file))
                .as_ref();
            let Some(lines) = lines else {
                continue;
            };

            rows.push((FILE_MARKER_LINE, format!("/* Extracted from: {} */", file)));

            let mut emitted: FxHashSet<u32> = FxHashSet::default();
            for loc in locs.iter().filter(|l| l.file == file) {
                for (number, text) in self.window(lines, loc.line) {
                    if emitted.insert(number) {
                        rows.push((number, text.to_string()));
                    }
                }
            }
        }

        let line_map = rows
            .iter()
            .enumerate()
            .map(|(i, (number, _))| (i + 1, *number))
            .collect();
        let code = rows
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join("\n");

        SourceContext {
            code,
            line_map,
            highlighted_lines: locs.iter().map(|l| l.line.max(1)).collect(),
            filenames: locs.iter().map(|l| l.file.clone()).collect(),
        }
    }

    /// 1-based `(line, text)` pairs of the window around `line`, clamped to
    /// the file. Empty when the file is shorter than `line`.
    fn window<'a>(&self, lines: &'a [String], line: u32) -> Vec<(u32, &'a str)> {
        let count = lines.len() as u32;
        if count < line {
            return Vec::new();
        }
        let start = line.saturating_sub(self.delta).max(1);
        let end = line.saturating_add(self.delta).min(count);
        (start..=end)
            .map(|n| (n, lines[(n - 1) as usize].as_str()))
            .collect()
    }

    fn read_lines(&self, file: &str) -> Option<Vec<String>> {
        let path = self.root.join(file);
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content.lines().map(str::to_string).collect()),
            Err(e) => {
                warn!("Could not read source file {}: {}", path.display(), e);
                None
            }
        }
    }
}
