//! Euclidean distances between embeddings and centroids

use nalgebra::DVector;

/// Euclidean distance between equal-length vectors
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    (DVector::from_column_slice(a) - DVector::from_column_slice(b)).norm()
}

/// Euclidean distance where the shorter side is extended with `pad`.
///
/// Scored batches can be longer than the calibration batch; the centroid
/// then reads as the normalized padding sentinel in the extra coordinates.
pub fn euclidean_padded(point: &[f64], centroid: &[f64], pad: f64) -> f64 {
    if point.len() == centroid.len() {
        return euclidean(point, centroid);
    }
    let len = point.len().max(centroid.len());
    (0..len)
        .map(|i| {
            let p = point.get(i).copied().unwrap_or(pad);
            let c = centroid.get(i).copied().unwrap_or(pad);
            (p - c) * (p - c)
        })
        .sum::<f64>()
        .sqrt()
}

/// Distance to the closest centroid; infinite when there are none
pub fn min_distance(point: &[f64], centroids: &[Vec<f64>], pad: f64) -> f64 {
    centroids
        .iter()
        .map(|c| euclidean_padded(point, c, pad))
        .fold(f64::INFINITY, f64::min)
}
