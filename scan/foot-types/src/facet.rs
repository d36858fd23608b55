//! Facet type and per-facet geometry.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A reconstructed triangle, stored as three indices into a point array.
///
/// A facet carries no positions of its own. Every geometric query takes the
/// point slice the indices refer to, so the same facet can be evaluated
/// against whichever point set produced it.
///
/// # Example
///
/// ```
/// use foot_types::{Facet, Point3};
///
/// let points = [
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(0.0, 0.0, 1.0),
///     Point3::new(1.0, 0.0, 0.0),
/// ];
/// let facet = Facet::new(0, 1, 2);
///
/// let geometry = facet.geometry(&points).unwrap();
/// assert!((geometry.vertical_alignment() - 1.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Facet(pub [u32; 3]);

impl Facet {
    /// Create a facet from three point indices.
    #[inline]
    #[must_use]
    pub const fn new(a: u32, b: u32, c: u32) -> Self {
        Self([a, b, c])
    }

    /// The three point indices in winding order.
    #[inline]
    #[must_use]
    pub const fn indices(&self) -> [u32; 3] {
        self.0
    }

    /// Returns true if any index is repeated.
    #[inline]
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        let [a, b, c] = self.0;
        a == b || b == c || a == c
    }

    /// Returns true if every index is smaller than `point_count`.
    #[inline]
    #[must_use]
    pub fn is_valid_for(&self, point_count: usize) -> bool {
        self.0.iter().all(|&i| (i as usize) < point_count)
    }

    /// Look up the three corner positions.
    ///
    /// Returns `None` if an index is out of range.
    #[must_use]
    pub fn corners(&self, points: &[Point3<f64>]) -> Option<[Point3<f64>; 3]> {
        let [a, b, c] = self.0;
        Some([
            *points.get(a as usize)?,
            *points.get(b as usize)?,
            *points.get(c as usize)?,
        ])
    }

    /// Compute center, normal and perimeter in one pass.
    ///
    /// Returns `None` if an index is out of range.
    #[must_use]
    pub fn geometry(&self, points: &[Point3<f64>]) -> Option<FacetGeometry> {
        self.corners(points).map(FacetGeometry::from_corners)
    }

    /// Canonical key that ignores winding and rotation.
    #[must_use]
    pub fn sorted_key(&self) -> [u32; 3] {
        let mut key = self.0;
        key.sort_unstable();
        key
    }
}

impl From<[u32; 3]> for Facet {
    fn from(indices: [u32; 3]) -> Self {
        Self(indices)
    }
}

impl From<Facet> for [u32; 3] {
    fn from(facet: Facet) -> Self {
        facet.0
    }
}

/// Geometric summary of one facet.
///
/// Heights are read from the `y` coordinate: the scan frame is
/// gravity-aligned with +Y pointing up.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FacetGeometry {
    /// Centroid of the three corners.
    pub center: Point3<f64>,
    /// Unit normal by the right-hand rule, `None` for zero-area facets.
    pub normal: Option<Vector3<f64>>,
    /// Sum of the three edge lengths.
    pub perimeter: f64,
}

impl FacetGeometry {
    /// Build the summary from three corner positions.
    #[must_use]
    pub fn from_corners([p0, p1, p2]: [Point3<f64>; 3]) -> Self {
        let center = Point3::from((p0.coords + p1.coords + p2.coords) / 3.0);

        let n = (p1 - p0).cross(&(p2 - p0));
        let len_sq = n.norm_squared();
        let normal = if len_sq > f64::EPSILON * f64::EPSILON {
            Some(n / len_sq.sqrt())
        } else {
            None
        };

        let perimeter = (p1 - p0).norm() + (p2 - p1).norm() + (p0 - p2).norm();

        Self {
            center,
            normal,
            perimeter,
        }
    }

    /// Height of the center.
    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.center.y
    }

    /// Absolute vertical component of the unit normal.
    ///
    /// 1.0 for a horizontal facet, 0.0 for a vertical wall. Degenerate facets
    /// report 0.0. Winding is not trusted, so the sign is dropped.
    #[inline]
    #[must_use]
    pub fn vertical_alignment(&self) -> f64 {
        self.normal.map_or(0.0, |n| n.y.abs())
    }
}
