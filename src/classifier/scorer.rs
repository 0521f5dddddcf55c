//! Scoring unseen paths against calibrated classes

use super::centroids::CentroidSet;
use super::distance::min_distance;
use super::thresholds::ThresholdRecord;
use crate::models::{ClassMatch, DefectClass, Embedding};
use indexmap::IndexMap;
use rayon::prelude::*;

/// Flags raised for one embedded path
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPath {
    /// Position of the path in the scored batch
    pub index: usize,
    /// Flagged classes, highest percent distance first
    pub matches: Vec<ClassMatch>,
}

impl ScoredPath {
    pub fn is_flagged(&self) -> bool {
        !self.matches.is_empty()
    }
}

struct ScoringClass<'a> {
    defect_class: DefectClass,
    centroids: &'a [Vec<f64>],
    scaled_threshold: f64,
}

/// Distance-to-centroid scorer over every class that has both a centroid
/// set and a threshold record
pub struct Scorer<'a> {
    classes: Vec<ScoringClass<'a>>,
    padding_value: f64,
}

impl<'a> Scorer<'a> {
    pub fn new(
        sets: &'a [CentroidSet],
        thresholds: &[ThresholdRecord],
        padding_value: f64,
    ) -> Self {
        let classes = sets
            .iter()
            .filter_map(|set| {
                let record = thresholds
                    .iter()
                    .find(|t| t.defect_class == set.defect_class)?;
                Some(ScoringClass {
                    defect_class: set.defect_class,
                    centroids: &set.centroids,
                    scaled_threshold: record.scaled_threshold,
                })
            })
            .collect();
        Self {
            classes,
            padding_value,
        }
    }

    /// Number of classes paths are scored against
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Classes whose scaled threshold the embedding falls strictly under.
    ///
    /// The `<` test applies to every class, including ones calibrated with a
    /// greater-than comparison.
    pub fn score(&self, embedding: &[f64]) -> Vec<ClassMatch> {
        let mut matches: Vec<ClassMatch> = self
            .classes
            .iter()
            .filter_map(|class| {
                let distance = min_distance(embedding, class.centroids, self.padding_value);
                if distance < class.scaled_threshold {
                    Some(class_match(class.defect_class, distance, class.scaled_threshold))
                } else {
                    None
                }
            })
            .collect();
        sort_matches(&mut matches);
        matches
    }

    /// Score every embedding; only flagged paths are returned, in batch order
    pub fn score_batch(&self, embeddings: &[Embedding]) -> Vec<ScoredPath> {
        embeddings
            .par_iter()
            .enumerate()
            .map(|(index, e)| ScoredPath {
                index,
                matches: self.score(e),
            })
            .filter(ScoredPath::is_flagged)
            .collect()
    }
}

/// Build the match record for a flagged class
pub fn class_match(defect_class: DefectClass, distance: f64, threshold: f64) -> ClassMatch {
    let percent_of_threshold = 100.0 / threshold * distance;
    ClassMatch {
        defect_class,
        distance,
        threshold,
        percent_of_threshold,
        percent_distance_to_centroid: (percent_of_threshold - 100.0).abs(),
    }
}

/// Descending by percent distance; class id breaks ties
pub fn sort_matches(matches: &mut [ClassMatch]) {
    matches.sort_by(|a, b| {
        b.percent_distance_to_centroid
            .total_cmp(&a.percent_distance_to_centroid)
            .then_with(|| a.defect_class.cmp(&b.defect_class))
    });
}

/// `CWE-n` → percent distance, in match order
pub fn stats_from_matches(matches: &[ClassMatch]) -> IndexMap<String, f64> {
    matches
        .iter()
        .map(|m| (m.defect_class.to_string(), m.percent_distance_to_centroid))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::centroids::Comparison;
    use crate::classifier::thresholds::RocCurve;

    fn set(class: u32, centroid: f64) -> CentroidSet {
        CentroidSet {
            defect_class: DefectClass(class),
            centroids: vec![vec![centroid]],
            samples: 1,
            inertia: 0.0,
        }
    }

    fn record(class: u32, scaled: f64, comparison: Comparison) -> ThresholdRecord {
        ThresholdRecord {
            defect_class: DefectClass(class),
            lower_bound: 0.0,
            upper_bound: scaled,
            optimal_threshold: scaled,
            scaled_threshold: scaled,
            auc: 0.0,
            comparison,
            calibration_samples: (1, 1),
            roc: RocCurve::default(),
        }
    }

    #[test]
    fn test_flag_percentages() {
        // Centroid at 10, path at 2: distance 8 against a cutoff of 12
        let sets = vec![set(121, 10.0)];
        let thresholds = vec![record(121, 12.0, Comparison::LessThan)];
        let scorer = Scorer::new(&sets, &thresholds, -1.0);

        let matches = scorer.score(&[2.0]);
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert!((m.distance - 8.0).abs() < 1e-12);
        assert!((m.percent_of_threshold - 66.666_666).abs() < 1e-4);
        assert!((m.percent_distance_to_centroid - 33.333_333).abs() < 1e-4);
    }

    #[test]
    fn test_threshold_is_strict() {
        let sets = vec![set(121, 0.0)];
        let thresholds = vec![record(121, 2.0, Comparison::LessThan)];
        let scorer = Scorer::new(&sets, &thresholds, -1.0);
        assert!(scorer.score(&[2.0]).is_empty());
        assert_eq!(scorer.score(&[1.999]).len(), 1);
    }

    #[test]
    fn test_less_than_applies_to_greater_than_calibration() {
        // A class calibrated as "far means safe" still flags close paths
        // and ignores far ones when scoring.
        let sets = vec![set(78, 0.0)];
        let thresholds = vec![record(78, 1.0, Comparison::GreaterThan)];
        let scorer = Scorer::new(&sets, &thresholds, -1.0);
        assert_eq!(scorer.score(&[0.5]).len(), 1);
        assert!(scorer.score(&[3.0]).is_empty());
    }

    #[test]
    fn test_matches_sorted_descending() {
        let sets = vec![set(120, 0.0), set(121, 0.0), set(416, 0.0)];
        let thresholds = vec![
            record(120, 10.0, Comparison::LessThan),
            record(121, 2.0, Comparison::LessThan),
            record(416, 4.0, Comparison::LessThan),
        ];
        let scorer = Scorer::new(&sets, &thresholds, -1.0);
        let matches = scorer.score(&[1.0]);
        // 10%→90, 50%→50, 25%→75
        let order: Vec<u32> = matches.iter().map(|m| m.defect_class.0).collect();
        assert_eq!(order, vec![120, 416, 121]);

        let stats = stats_from_matches(&matches);
        let keys: Vec<&str> = stats.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["CWE-120", "CWE-416", "CWE-121"]);
    }

    #[test]
    fn test_classes_without_thresholds_are_ignored() {
        let sets = vec![set(120, 0.0), set(121, 0.0)];
        let thresholds = vec![record(121, 5.0, Comparison::LessThan)];
        let scorer = Scorer::new(&sets, &thresholds, -1.0);
        assert_eq!(scorer.class_count(), 1);
    }

    #[test]
    fn test_score_batch_keeps_flagged_in_order() {
        let sets = vec![set(121, 0.0)];
        let thresholds = vec![record(121, 1.0, Comparison::LessThan)];
        let scorer = Scorer::new(&sets, &thresholds, -1.0);
        let batch = vec![vec![0.1], vec![5.0], vec![0.2]];
        let scored = scorer.score_batch(&batch);
        let indices: Vec<usize> = scored.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }
}
