//! Statistical outlier removal for a chunk of samples.
//!
//! # Algorithm
//!
//! For each point:
//! 1. Find the k nearest neighbors within the chunk
//! 2. Compute the mean distance to those neighbors
//! 3. Compute the global mean and standard deviation of mean distances
//! 4. Remove points where mean distance > `global_mean + std_multiplier * std_dev`
//!
//! # Example
//!
//! ```
//! use foot_scan::ingest::outlier::{remove_outliers, OutlierParams};
//! use nalgebra::Point3;
//!
//! // Small variations on every axis avoid KD-tree axis collision
//! let mut points: Vec<_> = (0..100)
//!     .map(|i| {
//!         let t = f64::from(i);
//!         Point3::new((t % 10.0) * 0.002, t * 0.00001, (t / 10.0).floor() * 0.002)
//!     })
//!     .collect();
//! points.push(Point3::new(0.01, 0.5, 0.01));
//!
//! let result = remove_outliers(&points, &OutlierParams::default());
//! assert_eq!(result.outliers_removed, 1);
//! assert_eq!(result.kept.len(), 100);
//! ```

use nalgebra::Point3;

use crate::pointcloud::PointIndex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters for statistical outlier removal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutlierParams {
    /// Number of neighbors to consider. Default: 24.
    pub k_neighbors: usize,

    /// Standard deviation multiplier for outlier threshold. Default: 2.0.
    /// Points with mean distance > mean + `std_multiplier` * std are removed.
    pub std_multiplier: f64,
}

impl Default for OutlierParams {
    fn default() -> Self {
        Self {
            k_neighbors: 24,
            std_multiplier: 2.0,
        }
    }
}

impl OutlierParams {
    /// Creates new parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of neighbors to consider.
    #[must_use]
    pub const fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k;
        self
    }

    /// Sets the standard deviation multiplier.
    #[must_use]
    pub const fn with_std_multiplier(mut self, multiplier: f64) -> Self {
        self.std_multiplier = multiplier;
        self
    }
}

/// Result of outlier removal on one chunk.
#[derive(Debug, Clone)]
pub struct OutlierRemoval {
    /// Surviving points, in input order.
    pub kept: Vec<Point3<f64>>,

    /// Number of points removed.
    pub outliers_removed: usize,

    /// Mean-distance threshold used, 0.0 if the chunk was too small to test.
    pub distance_threshold: f64,
}

impl OutlierRemoval {
    /// Fraction of the input that was removed, in `[0, 1]`.
    #[must_use]
    pub fn outlier_ratio(&self) -> f64 {
        let total = self.kept.len() + self.outliers_removed;
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.outliers_removed as f64 / total as f64
        }
    }
}

impl std::fmt::Display for OutlierRemoval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Outlier removal: {} → {} points ({} removed, {:.1}%)",
            self.kept.len() + self.outliers_removed,
            self.kept.len(),
            self.outliers_removed,
            self.outlier_ratio() * 100.0
        )
    }
}

/// Removes statistical outliers from a chunk.
///
/// Chunks with no more than `k_neighbors` points are returned unchanged.
#[must_use]
pub fn remove_outliers(points: &[Point3<f64>], params: &OutlierParams) -> OutlierRemoval {
    if points.len() <= params.k_neighbors || params.k_neighbors == 0 {
        return OutlierRemoval {
            kept: points.to_vec(),
            outliers_removed: 0,
            distance_threshold: 0.0,
        };
    }

    let (keep_mask, threshold) = compute_outlier_mask(points, params);

    let kept: Vec<Point3<f64>> = points
        .iter()
        .zip(&keep_mask)
        .filter_map(|(p, &keep)| keep.then_some(*p))
        .collect();

    OutlierRemoval {
        outliers_removed: points.len() - kept.len(),
        kept,
        distance_threshold: threshold,
    }
}

/// Computes a mask indicating which points to keep.
fn compute_outlier_mask(points: &[Point3<f64>], params: &OutlierParams) -> (Vec<bool>, f64) {
    let index = PointIndex::build(points);

    let mean_distances: Vec<f64> = points
        .iter()
        .map(|p| {
            let neighbors = index.nearest(p, params.k_neighbors + 1);

            // Skip the first neighbor (self). Distances come from the stored
            // positions, not the offset tree coordinates.
            let sum: f64 = neighbors
                .iter()
                .skip(1)
                .map(|n| (points[n.index] - p).norm())
                .sum();

            #[allow(clippy::cast_precision_loss)]
            let mean = if neighbors.len() > 1 {
                sum / (neighbors.len() - 1) as f64
            } else {
                0.0
            };
            mean
        })
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let n = mean_distances.len() as f64;
    let global_mean = mean_distances.iter().sum::<f64>() / n;
    let variance = mean_distances
        .iter()
        .map(|d| (d - global_mean).powi(2))
        .sum::<f64>()
        / n;

    let threshold = params.std_multiplier.mul_add(variance.sqrt(), global_mean);
    let keep_mask = mean_distances.iter().map(|&d| d <= threshold).collect();

    (keep_mask, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(n: u32) -> Vec<Point3<f64>> {
        // Small variations to avoid kiddo KD-tree axis collision
        (0..n)
            .map(|i| {
                let t = f64::from(i);
                Point3::new(
                    (t % 10.0) * 0.002 + t * 1e-6,
                    (t * 0.7).sin() * 0.0002,
                    (t / 10.0).floor() * 0.002,
                )
            })
            .collect()
    }

    #[test]
    fn test_outlier_params_default() {
        let params = OutlierParams::default();
        assert_eq!(params.k_neighbors, 24);
        assert!((params.std_multiplier - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_outlier_params_builder() {
        let params = OutlierParams::new()
            .with_k_neighbors(8)
            .with_std_multiplier(3.0);
        assert_eq!(params.k_neighbors, 8);
        assert!((params.std_multiplier - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_small_chunk_untouched() {
        let points = patch(20);
        let result = remove_outliers(&points, &OutlierParams::default());
        assert_eq!(result.kept, points);
        assert_eq!(result.outliers_removed, 0);
        assert!(result.outlier_ratio().abs() < 1e-12);
    }

    #[test]
    fn test_removes_far_point_and_keeps_order() {
        let mut points = patch(100);
        points.insert(40, Point3::new(0.01, 0.3, 0.01));

        let result = remove_outliers(&points, &OutlierParams::default());
        assert_eq!(result.outliers_removed, 1);
        assert_eq!(result.kept.len(), 100);
        assert_eq!(result.kept[40], points[41]);
        assert!(result.distance_threshold > 0.0);
        assert!(result.to_string().contains("1 removed"));
    }

    #[test]
    fn test_threshold_uses_exact_distances() {
        // Every point's nearest neighbor is exactly 0.5 away, so the spread
        // is zero and the threshold is the distance itself.
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.5, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.5),
            Point3::new(0.5, 0.0, 0.5),
        ];
        let params = OutlierParams::new().with_k_neighbors(1);
        let result = remove_outliers(&points, &params);

        assert_eq!(result.outliers_removed, 0);
        assert!((result.distance_threshold - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_uniform_patch_loses_few_points() {
        let points = patch(200);
        let result = remove_outliers(&points, &OutlierParams::default());
        // One-sided Chebyshev bound for mean + 2 sigma.
        assert!(result.outlier_ratio() <= 0.2);
    }
}
