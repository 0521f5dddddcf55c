//! Near-duplicate finding consolidation
//!
//! Findings confined to one source file that start and end on the same
//! content hashes describe the same flow; they are folded into one finding.
//! Every aggregate is a set union or an arithmetic mean over sorted inputs,
//! so the result does not depend on the order findings arrive in.

use crate::classifier::scorer::sort_matches;
use crate::models::{ClassMatch, DefectClass, Embedding, Finding};
use crate::source::{SourceContextExtractor, SourceLocation};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Identity shared by mergeable findings
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MergeKey {
    pub file: String,
    pub start_hash: String,
    pub end_hash: String,
}

impl MergeKey {
    /// Key of a single-file finding; `None` for findings spanning zero or
    /// several files
    pub fn of(finding: &Finding) -> Option<Self> {
        let files = finding.distinct_files();
        if files.len() != 1 {
            return None;
        }
        let (start, end) = finding.original_path.endpoint_hashes()?;
        Some(Self {
            file: files[0].to_string(),
            start_hash: start.to_string(),
            end_hash: end.to_string(),
        })
    }
}

/// Folds findings that share a [`MergeKey`]
pub struct PathMerger<'a> {
    extractor: &'a SourceContextExtractor,
}

impl<'a> PathMerger<'a> {
    pub fn new(extractor: &'a SourceContextExtractor) -> Self {
        Self { extractor }
    }

    /// Multi-file findings first, in input order, then one finding per
    /// key in key order
    pub fn merge(&self, findings: Vec<Finding>) -> Vec<Finding> {
        let total = findings.len();
        let mut passthrough = Vec::new();
        let mut groups: BTreeMap<MergeKey, Vec<Finding>> = BTreeMap::new();

        for finding in findings {
            match MergeKey::of(&finding) {
                Some(key) => groups.entry(key).or_default().push(finding),
                None => passthrough.push(finding),
            }
        }

        let mut merged = passthrough;
        for (key, group) in groups {
            if group.len() == 1 {
                merged.extend(group);
                continue;
            }
            debug!(
                "Merging {} findings in {} ({} -> {})",
                group.len(),
                key.file,
                key.start_hash,
                key.end_hash
            );
            merged.push(self.merge_group(&key, group));
        }

        info!("Merged {} findings into {}", total, merged.len());
        merged
    }

    fn merge_group(&self, key: &MergeKey, group: Vec<Finding>) -> Finding {
        let lines: BTreeSet<u32> = group
            .iter()
            .flat_map(|f| f.highlighted_lines.iter().copied())
            .collect();
        let locations: Vec<SourceLocation> = lines
            .iter()
            .map(|&line| SourceLocation::new(line, key.file.clone()))
            .collect();
        let context = self.extractor.extract(&locations);

        let stats = merge_stats(group.iter().map(|f| &f.stats));
        let matches = merge_matches(group.iter().flat_map(|f| f.matches.iter()));
        let embedding = merge_embeddings(group.iter().map(|f| &f.embedding));
        let merged_count = group.iter().map(|f| f.merged_count).sum();

        let representative = group
            .into_iter()
            .min_by_key(|f| f.original_path.id_key())
            .map(|f| f.original_path)
            .unwrap_or_default();

        Finding {
            original_path: representative,
            embedding,
            stats,
            matches,
            code: context.code,
            line_map: context.line_map,
            highlighted_lines: context.highlighted_lines,
            filenames: context.filenames,
            merged_count,
        }
    }
}

/// Mean of sorted values
fn mean(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    values.iter().sum::<f64>() / values.len() as f64
}

/// Per-class mean over the members that carry the class, highest first
pub fn merge_stats<'s>(stats: impl Iterator<Item = &'s IndexMap<String, f64>>) -> IndexMap<String, f64> {
    let mut by_class: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for s in stats {
        for (class, value) in s {
            by_class.entry(class.as_str()).or_default().push(*value);
        }
    }

    let mut averaged: Vec<(String, f64)> = by_class
        .into_iter()
        .map(|(class, values)| (class.to_string(), mean(values)))
        .collect();
    averaged.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    averaged.into_iter().collect()
}

/// Per-class mean of every match field
pub fn merge_matches<'m>(matches: impl Iterator<Item = &'m ClassMatch>) -> Vec<ClassMatch> {
    let mut by_class: BTreeMap<DefectClass, Vec<&ClassMatch>> = BTreeMap::new();
    for m in matches {
        by_class.entry(m.defect_class).or_default().push(m);
    }

    let mut merged: Vec<ClassMatch> = by_class
        .into_iter()
        .map(|(defect_class, ms)| ClassMatch {
            defect_class,
            distance: mean(ms.iter().map(|m| m.distance).collect()),
            threshold: mean(ms.iter().map(|m| m.threshold).collect()),
            percent_of_threshold: mean(ms.iter().map(|m| m.percent_of_threshold).collect()),
            percent_distance_to_centroid: mean(
                ms.iter().map(|m| m.percent_distance_to_centroid).collect(),
            ),
        })
        .collect();
    sort_matches(&mut merged);
    merged
}

/// Element-wise mean; shorter embeddings contribute only where defined
pub fn merge_embeddings<'e>(embeddings: impl Iterator<Item = &'e Embedding>) -> Embedding {
    let embeddings: Vec<&Embedding> = embeddings.collect();
    let len = embeddings.iter().map(|e| e.len()).max().unwrap_or(0);
    (0..len)
        .map(|i| mean(embeddings.iter().filter_map(|e| e.get(i).copied()).collect()))
        .collect()
}
