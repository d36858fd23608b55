//! Foot coordinate frame from the foot's footprint.
//!
//! Foot facets just above the floor trace the outline of the sole. Their
//! centers, projected onto the floor plane, are fitted with a total least
//! squares line: the principal axis of their 2×2 covariance is the foot's
//! long axis.

use foot_types::{Facet, FootFrame, Interval};
use nalgebra::{Matrix2, Point3, SymmetricEigen, Vector2, Vector3};
use tracing::debug;

/// Footprints with less total variance than this (m²) have no direction.
const MIN_VARIANCE: f64 = 1e-12;

/// Estimates the foot frame from `foot` facets inside the floor band.
///
/// Only facets whose center height is strictly inside `interval` are used.
/// The origin is their (x, z) centroid placed at `interval.center()`.
///
/// Returns `None` when no facet qualifies or the qualifying centers do not
/// spread out in the floor plane.
///
/// # Example
///
/// ```
/// use foot_scan::frame::estimate_foot_frame;
/// use foot_types::{Facet, Interval};
/// use nalgebra::Point3;
///
/// // Small vertical facets along the X axis, just above the floor.
/// let mut points = Vec::new();
/// let mut foot = Vec::new();
/// for i in 0..10u32 {
///     let x = f64::from(i) * 0.02;
///     points.push(Point3::new(x, 0.0, 0.0));
///     points.push(Point3::new(x + 0.003, 0.0, 0.0));
///     points.push(Point3::new(x, 0.006, 0.0));
///     foot.push(Facet::new(3 * i, 3 * i + 1, 3 * i + 2));
/// }
///
/// let band = Interval::new(-0.01, 0.0, 0.01).unwrap();
/// let frame = estimate_foot_frame(&points, &foot, band).unwrap();
/// assert!(frame.longitudinal.x > 0.99);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn estimate_foot_frame(
    points: &[Point3<f64>],
    foot: &[Facet],
    interval: Interval,
) -> Option<FootFrame> {
    let footprint: Vec<Vector2<f64>> = foot
        .iter()
        .filter_map(|f| f.geometry(points))
        .filter(|g| interval.contains_strict(g.height()))
        .map(|g| Vector2::new(g.center.x, g.center.z))
        .collect();

    if footprint.is_empty() {
        debug!(foot = foot.len(), "no foot facets inside the floor band");
        return None;
    }

    let count = footprint.len() as f64;
    let centroid = footprint.iter().sum::<Vector2<f64>>() / count;

    let mut covariance = Matrix2::zeros();
    for p in &footprint {
        let d = p - centroid;
        covariance += d * d.transpose();
    }
    covariance /= count;

    let spread = covariance.trace();
    if spread.is_nan() || spread <= MIN_VARIANCE {
        debug!(samples = footprint.len(), "footprint has no spread");
        return None;
    }

    let eigen = SymmetricEigen::new(covariance);
    let principal = if eigen.eigenvalues[0] >= eigen.eigenvalues[1] { 0 } else { 1 };
    let mut axis: Vector2<f64> = eigen.eigenvectors.column(principal).into_owned();

    // Fix the sign so the dominant component is positive.
    let dominant = if axis.x.abs() >= axis.y.abs() { axis.x } else { axis.y };
    if dominant < 0.0 {
        axis = -axis;
    }
    let axis = axis.try_normalize(f64::EPSILON)?;

    let longitudinal = Vector3::new(axis.x, 0.0, axis.y);
    let lateral = longitudinal.cross(&FootFrame::up());
    let frame = FootFrame {
        origin: Point3::new(centroid.x, interval.center(), centroid.y),
        longitudinal,
        lateral,
    };

    debug!(
        samples = footprint.len(),
        major = eigen.eigenvalues[principal],
        minor = eigen.eigenvalues[1 - principal],
        "foot frame estimated"
    );

    Some(frame)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Vertical facets centered at height `y` along the direction `(dx, dz)`.
    fn footprint(n: u32, dx: f64, dz: f64, y: f64) -> (Vec<Point3<f64>>, Vec<Facet>) {
        let mut points = Vec::new();
        let mut facets = Vec::new();
        for i in 0..n {
            let t = f64::from(i) * 0.02;
            // Slight sideways wobble so the footprint is not a perfect line.
            let w = if i % 2 == 0 { 0.004 } else { -0.004 };
            let (x, z) = (0.1 + t * dx - w * dz, 0.2 + t * dz + w * dx);
            points.push(Point3::new(x, y - 0.002, z));
            points.push(Point3::new(x + 0.002 * dx, y - 0.002, z + 0.002 * dz));
            points.push(Point3::new(x, y + 0.004, z));
            facets.push(Facet::new(3 * i, 3 * i + 1, 3 * i + 2));
        }
        (points, facets)
    }

    fn band() -> Interval {
        Interval::new(-0.01, 0.0, 0.01).unwrap()
    }

    #[test]
    fn test_axis_along_x() {
        let (points, foot) = footprint(12, 1.0, 0.0, 0.0);
        let frame = estimate_foot_frame(&points, &foot, band()).unwrap();

        // The wobble tilts the fit by well under a degree.
        assert_relative_eq!(frame.longitudinal.x, 1.0, epsilon = 1e-3);
        assert_relative_eq!(frame.longitudinal.y, 0.0);
        assert_relative_eq!(frame.lateral.norm(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(frame.longitudinal.dot(&frame.lateral), 0.0, epsilon = 1e-12);
        assert_relative_eq!(frame.lateral.y, 0.0);
        assert_relative_eq!(frame.origin.y, 0.0);
    }

    #[test]
    fn test_sign_is_fixed() {
        // Running toward -Z: the dominant component is flipped positive.
        let (points, foot) = footprint(12, 0.0, -1.0, 0.0);
        let frame = estimate_foot_frame(&points, &foot, band()).unwrap();
        assert_relative_eq!(frame.longitudinal.z, 1.0, epsilon = 1e-3);

        let s = std::f64::consts::FRAC_1_SQRT_2;
        let (points, foot) = footprint(12, -s, -s * 0.5, 0.0);
        let frame = estimate_foot_frame(&points, &foot, band()).unwrap();
        assert!(frame.longitudinal.x > 0.0);
    }

    #[test]
    fn test_origin_is_centroid_at_floor_center() {
        let (points, foot) = footprint(11, 1.0, 0.0, 0.003);
        let band = Interval::new(-0.005, 0.001, 0.008).unwrap();
        let frame = estimate_foot_frame(&points, &foot, band).unwrap();

        let expected_x = 0.1 + 0.1 + 0.002 / 3.0;
        assert_relative_eq!(frame.origin.x, expected_x, epsilon = 1e-3);
        assert_relative_eq!(frame.origin.y, 0.001);
    }

    #[test]
    fn test_none_without_facets_in_band() {
        let (points, foot) = footprint(12, 1.0, 0.0, 0.05);
        assert!(estimate_foot_frame(&points, &foot, band()).is_none());
        assert!(estimate_foot_frame(&points, &[], band()).is_none());
    }

    #[test]
    fn test_band_is_strict() {
        let (points, foot) = footprint(12, 1.0, 0.0, 0.01);
        let top = foot[0].geometry(&points).unwrap().height();
        let band = Interval::new(top - 0.02, top - 0.01, top).unwrap();
        assert!(estimate_foot_frame(&points, &foot, band).is_none());
    }

    #[test]
    fn test_none_without_spread() {
        let (points, foot) = footprint(1, 1.0, 0.0, 0.0);
        assert!(estimate_foot_frame(&points, &foot, band()).is_none());
    }
}
