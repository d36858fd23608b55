//! Jet smoothing of a point set.
//!
//! Each point is replaced by its projection onto a degree-2 polynomial
//! surface fitted to its nearest neighbors:
//!
//! 1. Collect the `k` nearest neighbors (the point itself included)
//! 2. Build a local frame by PCA: the two largest axes span the tangent
//!    plane, the smallest is the normal
//! 3. Fit `w = c0 + c1·u + c2·v + c3·u² + c4·uv + c5·v²` by least squares
//! 4. Move the point to `w(u, v)` along the normal
//!
//! Points with fewer than [`MIN_JET_NEIGHBORS`] neighbors, or whose
//! neighborhood makes the fit singular (collinear or coincident points), are
//! kept where they are.

use nalgebra::{DMatrix, DVector, Matrix3, Point3, SymmetricEigen, Vector3};

use crate::pointcloud::{PointCloud, PointIndex};

/// Number of coefficients of the quadratic height function.
const JET_COEFFICIENTS: usize = 6;

/// Minimum neighborhood size for a fit.
pub const MIN_JET_NEIGHBORS: usize = JET_COEFFICIENTS;

/// Singular values below this fraction of the largest make the fit singular.
const RANK_TOLERANCE: f64 = 1e-8;

/// Output of [`jet_smooth`].
#[derive(Debug, Clone)]
pub struct JetSmoothing {
    /// Smoothed positions, one per input point, with unit normals.
    pub cloud: PointCloud,

    /// Points projected onto their fitted surface.
    pub fitted: usize,

    /// Points left in place.
    pub unchanged: usize,
}

impl std::fmt::Display for JetSmoothing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Jet smoothing: {} points fitted, {} unchanged",
            self.fitted, self.unchanged
        )
    }
}

/// Smooths `points` with a jet fit over `k` nearest neighbors.
///
/// Normals are the local PCA normals, flipped to point up (`+Y`). Points
/// without a usable neighborhood get `+Y`.
///
/// # Example
///
/// ```
/// use foot_scan::smooth::jet_smooth;
/// use nalgebra::Point3;
///
/// // A tilted plane is reproduced exactly.
/// let points: Vec<_> = (0..100)
///     .map(|i| {
///         let x = f64::from(i % 10) * 0.002 + f64::from(i) * 1e-6;
///         let z = f64::from(i / 10) * 0.002;
///         Point3::new(x, 0.3 * x + 0.1 * z, z)
///     })
///     .collect();
///
/// let result = jet_smooth(&points, 24);
/// assert_eq!(result.fitted, 100);
/// for (a, b) in points.iter().zip(result.cloud.positions()) {
///     assert!((a - b).norm() < 1e-9);
/// }
/// ```
#[must_use]
pub fn jet_smooth(points: &[Point3<f64>], k: usize) -> JetSmoothing {
    let index = PointIndex::build(points);
    let mut positions = Vec::with_capacity(points.len());
    let mut normals = Vec::with_capacity(points.len());
    let mut fitted = 0;

    for p in points {
        let neighborhood: Vec<Point3<f64>> = index
            .nearest(p, k)
            .into_iter()
            .map(|n| points[n.index])
            .collect();

        match fit_jet(p, &neighborhood) {
            JetFit::Projected { position, normal } => {
                positions.push(position);
                normals.push(normal);
                fitted += 1;
            }
            JetFit::Unchanged { normal } => {
                positions.push(*p);
                normals.push(normal);
            }
        }
    }

    let unchanged = points.len() - fitted;
    let cloud = PointCloud::with_normals(positions, normals).unwrap_or_default();

    JetSmoothing {
        cloud,
        fitted,
        unchanged,
    }
}

enum JetFit {
    Projected {
        position: Point3<f64>,
        normal: Vector3<f64>,
    },
    Unchanged {
        normal: Vector3<f64>,
    },
}

/// Local tangent frame of a neighborhood.
struct LocalFrame {
    origin: Point3<f64>,
    u: Vector3<f64>,
    v: Vector3<f64>,
    normal: Vector3<f64>,
}

impl LocalFrame {
    /// PCA frame of `neighborhood`, with the normal facing up.
    fn from_neighborhood(neighborhood: &[Point3<f64>]) -> Option<Self> {
        if neighborhood.is_empty() {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let n = neighborhood.len() as f64;
        let origin = Point3::from(
            neighborhood
                .iter()
                .fold(Vector3::zeros(), |acc, q| acc + q.coords)
                / n,
        );

        let mut covariance = Matrix3::zeros();
        for q in neighborhood {
            let d = q - origin;
            covariance += d * d.transpose();
        }
        covariance /= n;

        let eigen = SymmetricEigen::new(covariance);
        let mut order = [0, 1, 2];
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

        let mut normal: Vector3<f64> = eigen.eigenvectors.column(order[0]).into_owned();
        if normal.y < 0.0 {
            normal = -normal;
        }
        let u: Vector3<f64> = eigen.eigenvectors.column(order[2]).into_owned();
        let v = normal.cross(&u);

        Some(Self {
            origin,
            u,
            v,
            normal,
        })
    }

    fn to_local(&self, q: &Point3<f64>) -> Vector3<f64> {
        let d = q - self.origin;
        Vector3::new(d.dot(&self.u), d.dot(&self.v), d.dot(&self.normal))
    }
}

fn fit_jet(p: &Point3<f64>, neighborhood: &[Point3<f64>]) -> JetFit {
    let Some(frame) = LocalFrame::from_neighborhood(neighborhood) else {
        return JetFit::Unchanged {
            normal: Vector3::y(),
        };
    };

    if neighborhood.len() < MIN_JET_NEIGHBORS {
        return JetFit::Unchanged {
            normal: frame.normal,
        };
    }

    let local: Vec<Vector3<f64>> = neighborhood.iter().map(|q| frame.to_local(q)).collect();

    // Scale tangent coordinates to about unit size so u² terms stay well conditioned.
    let scale = local
        .iter()
        .map(|l| l.x.abs().max(l.y.abs()))
        .fold(0.0_f64, f64::max);
    if scale <= f64::EPSILON {
        return JetFit::Unchanged {
            normal: frame.normal,
        };
    }

    let design = DMatrix::from_fn(local.len(), JET_COEFFICIENTS, |row, col| {
        monomials(local[row].x / scale, local[row].y / scale)[col]
    });
    let heights = DVector::from_iterator(local.len(), local.iter().map(|l| l.z));

    let svd = design.svd(true, true);
    let max_sv = svd.singular_values.max();
    let min_sv = svd.singular_values.min();
    if !max_sv.is_finite() || max_sv <= 0.0 || min_sv <= max_sv * RANK_TOLERANCE {
        return JetFit::Unchanged {
            normal: frame.normal,
        };
    }

    let Ok(coefficients) = svd.solve(&heights, max_sv * RANK_TOLERANCE) else {
        return JetFit::Unchanged {
            normal: frame.normal,
        };
    };

    let lp = frame.to_local(p);
    let basis = monomials(lp.x / scale, lp.y / scale);
    let w: f64 = basis
        .iter()
        .zip(coefficients.iter())
        .map(|(b, c)| b * c)
        .sum();

    if !w.is_finite() {
        return JetFit::Unchanged {
            normal: frame.normal,
        };
    }

    let position = frame.origin + frame.u * lp.x + frame.v * lp.y + frame.normal * w;
    JetFit::Projected {
        position,
        normal: frame.normal,
    }
}

/// `[1, u, v, u², uv, v²]`.
fn monomials(u: f64, v: f64) -> [f64; JET_COEFFICIENTS] {
    [1.0, u, v, u * u, u * v, v * v]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn noisy_floor(n: u32) -> Vec<Point3<f64>> {
        (0..n * n)
            .map(|i| {
                let x = f64::from(i % n) * 0.002 + f64::from(i) * 1e-7;
                let z = f64::from(i / n) * 0.002;
                let noise = (f64::from(i) * 1.7).sin() * 0.0005;
                Point3::new(x, noise, z)
            })
            .collect()
    }

    #[test]
    fn test_noise_is_reduced() {
        let points = noisy_floor(15);
        let result = jet_smooth(&points, 24);

        let before: f64 = points.iter().map(|p| p.y.abs()).sum();
        let after: f64 = result.cloud.positions().iter().map(|p| p.y.abs()).sum();
        assert!(after < before * 0.9, "before {before}, after {after}");
        assert_eq!(result.cloud.len(), points.len());
    }

    #[test]
    fn test_floor_normals_point_up() {
        let points = noisy_floor(12);
        let result = jet_smooth(&points, 24);
        let normals = result.cloud.normals().unwrap_or_default();
        assert_eq!(normals.len(), points.len());
        for n in normals {
            assert!(n.y > 0.9);
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_too_few_neighbors_unchanged() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.001, 0.0002, 0.0),
            Point3::new(0.0, 0.0001, 0.001),
            Point3::new(0.001, 0.0003, 0.001),
            Point3::new(0.002, 0.0, 0.0005),
        ];
        let result = jet_smooth(&points, 24);
        assert_eq!(result.fitted, 0);
        assert_eq!(result.unchanged, 5);
        assert_eq!(result.cloud.positions(), points.as_slice());
    }

    #[test]
    fn test_collinear_points_unchanged() {
        let points: Vec<_> = (0..20)
            .map(|i| {
                let t = f64::from(i) * 0.001;
                Point3::new(t, 0.5 * t, 0.25 * t)
            })
            .collect();
        let result = jet_smooth(&points, 10);
        assert_eq!(result.fitted, 0);
        for (a, b) in points.iter().zip(result.cloud.positions()) {
            assert_relative_eq!((a - b).norm(), 0.0);
        }
    }

    #[test]
    fn test_deterministic() {
        let points = noisy_floor(10);
        let a = jet_smooth(&points, 24);
        let b = jet_smooth(&points, 24);
        assert_eq!(a.cloud, b.cloud);
        assert!(a.to_string().contains("fitted"));
    }
}
