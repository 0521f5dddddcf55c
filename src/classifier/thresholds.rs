//! Per-class distance thresholds
//!
//! Each class's held-out safe and unsafe paths are scored by their minimum
//! distance to the class centroids. A threshold sweep over that distance
//! range traces an ROC curve; the threshold maximizing
//! `sqrt(TPR * (1 - FPR))` becomes the class cutoff, then gets scaled by
//! the configured factor for scoring.

use super::centroids::{CentroidSet, Comparison};
use super::distance::min_distance;
use super::CalibrationSample;
use crate::models::{DefectClass, Label};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Sweep increment in embedding-distance units
pub const STEP_WIDTH: f64 = 0.2;

/// Confusion counts at one threshold. Positive means unsafe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confusion {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl Confusion {
    /// Count outcomes for `(distance, label)` pairs at threshold `t`
    pub fn at(samples: &[(f64, Label)], t: f64, comparison: Comparison) -> Self {
        let mut c = Self::default();
        for &(distance, label) in samples {
            let predicted_safe = comparison.predicts_safe(distance, t);
            match (label.is_safe(), predicted_safe) {
                (false, false) => c.tp += 1,
                (true, true) => c.tn += 1,
                (true, false) => c.fp += 1,
                (false, true) => c.fn_ += 1,
            }
        }
        c
    }

    /// TP / (TP + FN), 0 when there are no unsafe samples
    pub fn tpr(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// FP / (FP + TN), 0 when there are no safe samples
    pub fn fpr(&self) -> f64 {
        ratio(self.fp, self.fp + self.tn)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Thresholds `lower, lower + step, ...` up to (but excluding)
/// `upper + step`, matching a half-open arange.
pub fn threshold_steps(lower: f64, upper: f64, step: f64) -> Vec<f64> {
    if !(lower.is_finite() && upper.is_finite()) || step <= 0.0 || upper < lower {
        return Vec::new();
    }
    let count = ((upper + step - lower) / step).ceil().max(0.0) as usize;
    (0..count).map(|i| lower + i as f64 * step).collect()
}

/// TPR/FPR at every swept threshold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub thresholds: Vec<f64>,
    pub tpr: Vec<f64>,
    pub fpr: Vec<f64>,
}

impl RocCurve {
    pub fn sweep(samples: &[(f64, Label)], thresholds: Vec<f64>, comparison: Comparison) -> Self {
        let mut tpr = Vec::with_capacity(thresholds.len());
        let mut fpr = Vec::with_capacity(thresholds.len());
        for &t in &thresholds {
            let c = Confusion::at(samples, t, comparison);
            tpr.push(c.tpr());
            fpr.push(c.fpr());
        }
        Self {
            thresholds,
            tpr,
            fpr,
        }
    }

    /// Absolute trapezoidal area of TPR over FPR, in sweep order
    pub fn auc(&self) -> f64 {
        self.fpr
            .windows(2)
            .zip(self.tpr.windows(2))
            .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
            .sum::<f64>()
            .abs()
    }

    /// `sqrt(TPR * (1 - FPR))` per threshold
    pub fn gmeans(&self) -> Vec<f64> {
        self.tpr
            .iter()
            .zip(&self.fpr)
            .map(|(t, f)| (t * (1.0 - f)).sqrt())
            .collect()
    }

    /// Threshold with the highest g-mean; the first one on ties
    pub fn optimal_threshold(&self) -> Option<f64> {
        let gmeans = self.gmeans();
        let mut best: Option<(usize, f64)> = None;
        for (i, g) in gmeans.into_iter().enumerate() {
            if best.map_or(true, |(_, b)| g > b) {
                best = Some((i, g));
            }
        }
        best.map(|(i, _)| self.thresholds[i])
    }
}

/// Calibrated cutoff of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRecord {
    pub defect_class: DefectClass,
    /// Smallest min-distance in the calibration set
    pub lower_bound: f64,
    /// Largest min-distance in the calibration set
    pub upper_bound: f64,
    pub optimal_threshold: f64,
    /// `optimal_threshold * scaling factor`, the cutoff used when scoring
    pub scaled_threshold: f64,
    pub auc: f64,
    pub comparison: Comparison,
    /// Calibration samples (safe, unsafe)
    pub calibration_samples: (usize, usize),
    pub roc: RocCurve,
}

/// Sweeps thresholds per class on the held-out split
#[derive(Debug, Clone, Copy)]
pub struct ThresholdCalibrator {
    comparison: Comparison,
    scaling_factor: f64,
    step_width: f64,
    /// Normalized padding value used to align dimensions
    padding_value: f64,
}

impl ThresholdCalibrator {
    pub fn new(comparison: Comparison, scaling_factor: f64, padding_value: f64) -> Self {
        Self {
            comparison,
            scaling_factor,
            step_width: STEP_WIDTH,
            padding_value,
        }
    }

    /// Calibrate every class that has a centroid set. Classes without any
    /// held-out samples are skipped with a warning.
    pub fn calibrate(
        &self,
        sets: &[CentroidSet],
        held_out: &[&CalibrationSample],
    ) -> Vec<ThresholdRecord> {
        let records: Vec<ThresholdRecord> = sets
            .par_iter()
            .filter_map(|set| {
                let samples: Vec<&CalibrationSample> = held_out
                    .iter()
                    .filter(|s| s.defect_class == set.defect_class)
                    .copied()
                    .collect();
                self.calibrate_class(set, &samples)
            })
            .collect();

        for r in &records {
            info!(
                "{}: auc={:.3}, optimal threshold={:.3}, scaled={:.3} (range {:.3}..{:.3})",
                r.defect_class,
                r.auc,
                r.optimal_threshold,
                r.scaled_threshold,
                r.lower_bound,
                r.upper_bound
            );
        }
        records
    }

    /// Calibrate one class against its held-out samples
    pub fn calibrate_class(
        &self,
        set: &CentroidSet,
        samples: &[&CalibrationSample],
    ) -> Option<ThresholdRecord> {
        if samples.is_empty() {
            warn!(
                "No held-out samples for {}, skipping threshold calibration",
                set.defect_class
            );
            return None;
        }

        let scored: Vec<(f64, Label)> = samples
            .iter()
            .map(|s| {
                (
                    min_distance(&s.embedding, &set.centroids, self.padding_value),
                    s.label,
                )
            })
            .collect();

        let lower = scored.iter().map(|(d, _)| *d).fold(f64::INFINITY, f64::min);
        let upper = scored
            .iter()
            .map(|(d, _)| *d)
            .fold(f64::NEG_INFINITY, f64::max);

        let steps = threshold_steps(lower, upper, self.step_width);
        debug!(
            "{}: sweeping {} thresholds over {} samples",
            set.defect_class,
            steps.len(),
            scored.len()
        );
        let roc = RocCurve::sweep(&scored, steps, self.comparison);
        let optimal = roc.optimal_threshold()?;
        let safe = scored.iter().filter(|(_, l)| l.is_safe()).count();

        Some(ThresholdRecord {
            defect_class: set.defect_class,
            lower_bound: lower,
            upper_bound: upper,
            optimal_threshold: optimal,
            scaled_threshold: optimal * self.scaling_factor,
            auc: roc.auc(),
            comparison: self.comparison,
            calibration_samples: (safe, scored.len() - safe),
            roc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples_1d(points: &[(f64, Label)]) -> Vec<CalibrationSample> {
        points
            .iter()
            .map(|&(x, label)| CalibrationSample {
                defect_class: DefectClass(121),
                label,
                embedding: vec![x],
            })
            .collect()
    }

    fn origin_set() -> CentroidSet {
        CentroidSet {
            defect_class: DefectClass(121),
            centroids: vec![vec![0.0]],
            samples: 1,
            inertia: 0.0,
        }
    }

    #[test]
    fn test_threshold_steps_strictly_increasing() {
        let steps = threshold_steps(0.0, 1.0, 0.2);
        assert_eq!(steps.len(), 6);
        assert!((steps[5] - 1.0).abs() < 1e-9);
        assert!(steps.windows(2).all(|w| w[1] > w[0]));

        let single = threshold_steps(0.7, 0.7, 0.2);
        assert_eq!(single, vec![0.7]);
        assert!(threshold_steps(f64::INFINITY, 1.0, 0.2).is_empty());
    }

    #[test]
    fn test_confusion_handles_empty_denominators() {
        let only_safe = [(1.0, Label::Safe), (2.0, Label::Safe)];
        let c = Confusion::at(&only_safe, 1.5, Comparison::LessThan);
        assert_eq!(c.tn, 1);
        assert_eq!(c.fp, 1);
        assert_eq!(c.tpr(), 0.0);
        assert_eq!(c.fpr(), 0.5);
    }

    #[test]
    fn test_auc_trapezoid() {
        let roc = RocCurve {
            thresholds: vec![0.0, 1.0, 2.0],
            tpr: vec![0.0, 1.0, 1.0],
            fpr: vec![0.0, 0.0, 1.0],
        };
        assert!((roc.auc() - 1.0).abs() < 1e-12);

        // Reversed sweep direction gives the same magnitude
        let reversed = RocCurve {
            thresholds: vec![0.0, 1.0, 2.0],
            tpr: vec![1.0, 1.0, 0.0],
            fpr: vec![1.0, 0.0, 0.0],
        };
        assert!((reversed.auc() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_optimal_threshold_first_max() {
        let roc = RocCurve {
            thresholds: vec![0.0, 0.2, 0.4],
            tpr: vec![0.5, 1.0, 1.0],
            fpr: vec![0.0, 0.0, 0.0],
        };
        assert_eq!(roc.optimal_threshold(), Some(0.2));
        assert_eq!(RocCurve::default().optimal_threshold(), None);
    }

    #[test]
    fn test_calibrate_unsafe_basis_separable() {
        // Unsafe paths sit near the unsafe centroid, safe ones far away
        let data = samples_1d(&[
            (0.1, Label::Unsafe),
            (0.2, Label::Unsafe),
            (1.9, Label::Safe),
            (2.0, Label::Safe),
        ]);
        let refs: Vec<&CalibrationSample> = data.iter().collect();
        let calibrator = ThresholdCalibrator::new(Comparison::GreaterThan, 1.5, 0.0);
        let record = calibrator.calibrate_class(&origin_set(), &refs).unwrap();

        assert!((record.lower_bound - 0.1).abs() < 1e-12);
        assert!((record.upper_bound - 2.0).abs() < 1e-12);
        // distance > t predicts safe; t in [0.2, 1.9) separates perfectly
        assert!(record.optimal_threshold >= 0.2 && record.optimal_threshold < 1.9);
        assert!((record.scaled_threshold - record.optimal_threshold * 1.5).abs() < 1e-12);
        assert_eq!(record.calibration_samples, (2, 2));
        assert!(record
            .roc
            .thresholds
            .windows(2)
            .all(|w| w[1] > w[0]));
        assert!((record.roc.thresholds[0] - record.lower_bound).abs() < 1e-12);
    }

    #[test]
    fn test_calibrate_safe_basis_separable() {
        // Safe paths sit near the safe centroid, unsafe ones far away
        let points = [
            (0.1, Label::Safe),
            (0.2, Label::Safe),
            (1.9, Label::Unsafe),
            (2.0, Label::Unsafe),
        ];
        let data = samples_1d(&points);
        let refs: Vec<&CalibrationSample> = data.iter().collect();
        let calibrator = ThresholdCalibrator::new(Comparison::LessThan, 1.0, 0.0);
        let record = calibrator.calibrate_class(&origin_set(), &refs).unwrap();

        assert_eq!(record.comparison, Comparison::LessThan);
        assert!((record.lower_bound - 0.1).abs() < 1e-12);
        assert!((record.upper_bound - 2.0).abs() < 1e-12);
        // distance < t predicts safe; t in (0.2, 1.9] separates perfectly
        assert!(record.optimal_threshold > 0.2 && record.optimal_threshold <= 1.9);
        for (distance, label) in points {
            assert_eq!(
                Comparison::LessThan.predicts_safe(distance, record.optimal_threshold),
                label.is_safe()
            );
        }
        let c = Confusion::at(&points, record.optimal_threshold, Comparison::LessThan);
        assert_eq!((c.tpr(), c.fpr()), (1.0, 0.0));
    }

    #[test]
    fn test_calibrate_skips_class_without_samples() {
        let calibrator = ThresholdCalibrator::new(Comparison::LessThan, 1.0, 0.0);
        assert!(calibrator.calibrate_class(&origin_set(), &[]).is_none());
        assert!(calibrator.calibrate(&[origin_set()], &[]).is_empty());
    }

    #[test]
    fn test_calibrate_single_label_does_not_panic() {
        let data = samples_1d(&[(0.5, Label::Safe), (0.9, Label::Safe)]);
        let refs: Vec<&CalibrationSample> = data.iter().collect();
        let calibrator = ThresholdCalibrator::new(Comparison::LessThan, 1.0, 0.0);
        let record = calibrator.calibrate_class(&origin_set(), &refs).unwrap();
        assert!(record.auc.is_finite());
        assert!(record.optimal_threshold.is_finite());
    }
}
