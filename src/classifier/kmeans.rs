//! Seeded k-means
//!
//! k-means++ seeding followed by Lloyd iterations. Several seeded restarts
//! run and the lowest-inertia fit wins, so a given input and seed always
//! produce the same centroids.

use nalgebra::DVector;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Tuning knobs for a k-means fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansParams {
    pub k: usize,
    pub max_iter: usize,
    /// Convergence tolerance, relative to the mean per-feature variance
    pub tolerance: f64,
    /// Number of seeded restarts
    pub n_init: usize,
    pub seed: u64,
}

impl KMeansParams {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            max_iter: 300,
            tolerance: 1e-4,
            n_init: 10,
            seed,
        }
    }
}

/// Result of a k-means fit
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub centroids: Vec<Vec<f64>>,
    /// Cluster index of every input point
    pub assignments: Vec<usize>,
    /// Within-cluster sum of squared distances
    pub inertia: f64,
    pub iterations: usize,
}

fn squared_distance(a: &DVector<f64>, b: &DVector<f64>) -> f64 {
    (a - b).norm_squared()
}

/// Index and squared distance of the closest centroid (lowest index on ties)
fn nearest(point: &DVector<f64>, centroids: &[DVector<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn mean_feature_variance(points: &[DVector<f64>]) -> f64 {
    let n = points.len() as f64;
    let dim = points[0].len();
    if dim == 0 {
        return 0.0;
    }
    let mut mean = DVector::<f64>::zeros(dim);
    for p in points {
        mean += p;
    }
    mean /= n;
    let total: f64 = points.iter().map(|p| squared_distance(p, &mean)).sum();
    total / n / dim as f64
}

fn plus_plus_init(points: &[DVector<f64>], k: usize, rng: &mut ChaCha8Rng) -> Vec<DVector<f64>> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..n)].clone());

    let mut closest: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();
        let pick = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut acc = 0.0;
            let mut chosen = n - 1;
            for (i, d) in closest.iter().enumerate() {
                acc += d;
                if acc > target {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            // Every point already sits on a centroid
            rng.random_range(0..n)
        };

        let next = points[pick].clone();
        for (d, p) in closest.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &next));
        }
        centroids.push(next);
    }

    centroids
}

fn lloyd(
    points: &[DVector<f64>],
    mut centroids: Vec<DVector<f64>>,
    params: &KMeansParams,
    tol: f64,
) -> (Vec<DVector<f64>>, Vec<usize>, f64, usize) {
    let k = centroids.len();
    let dim = points[0].len();
    let mut assignments = vec![0usize; points.len()];
    let mut iterations = 0;

    for iter in 0..params.max_iter {
        iterations = iter + 1;

        let mut dists = vec![0.0; points.len()];
        for (i, p) in points.iter().enumerate() {
            let (c, d) = nearest(p, &centroids);
            assignments[i] = c;
            dists[i] = d;
        }

        let mut sums = vec![DVector::<f64>::zeros(dim); k];
        let mut counts = vec![0usize; k];
        for (p, &c) in points.iter().zip(&assignments) {
            sums[c] += p;
            counts[c] += 1;
        }

        let mut updated = Vec::with_capacity(k);
        for (c, (sum, count)) in sums.into_iter().zip(&counts).enumerate() {
            if *count > 0 {
                updated.push(sum / *count as f64);
            } else {
                updated.push(centroids[c].clone());
            }
        }

        // Empty clusters take the point currently worst served
        for c in 0..k {
            if counts[c] > 0 {
                continue;
            }
            let far = dists
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (i, &d)| {
                    if d > best.1 {
                        (i, d)
                    } else {
                        best
                    }
                })
                .0;
            updated[c] = points[far].clone();
            dists[far] = 0.0;
        }

        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(old, new)| squared_distance(old, new))
            .sum();
        centroids = updated;
        if shift <= tol {
            break;
        }
    }

    let mut inertia = 0.0;
    for (i, p) in points.iter().enumerate() {
        let (c, d) = nearest(p, &centroids);
        assignments[i] = c;
        inertia += d;
    }

    (centroids, assignments, inertia, iterations)
}

/// Fit exactly `params.k` centroids.
///
/// Returns `None` when there are fewer points than clusters or `k` is 0.
pub fn fit(points: &[&[f64]], params: &KMeansParams) -> Option<KMeansFit> {
    if params.k == 0 || points.len() < params.k {
        return None;
    }

    let vectors: Vec<DVector<f64>> = points
        .iter()
        .map(|p| DVector::from_column_slice(p))
        .collect();
    let tol = params.tolerance * mean_feature_variance(&vectors);

    let mut best: Option<KMeansFit> = None;
    for run in 0..params.n_init.max(1) {
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(run as u64));
        let init = plus_plus_init(&vectors, params.k, &mut rng);
        let (centroids, assignments, inertia, iterations) = lloyd(&vectors, init, params, tol);

        if best.as_ref().map_or(true, |b| inertia < b.inertia) {
            best = Some(KMeansFit {
                centroids: centroids
                    .into_iter()
                    .map(|c| c.as_slice().to_vec())
                    .collect(),
                assignments,
                inertia,
                iterations,
            });
        }
    }

    best
}
