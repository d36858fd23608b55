//! Point containers and spatial queries.
//!
//! [`PointCloud`] holds positions in a flat `Vec<Point3<f64>>` so facets can
//! index it directly, with an optional parallel array of unit normals.
//!
//! # Example
//!
//! ```
//! use foot_scan::pointcloud::PointCloud;
//! use nalgebra::Point3;
//!
//! let mut cloud = PointCloud::from_positions(vec![
//!     Point3::new(0.0000, 0.0, 0.0),
//!     Point3::new(0.0005, 0.0, 0.0), // same 2 mm cell as the first point
//!     Point3::new(0.0100, 0.0, 0.0),
//! ]);
//!
//! let removed = cloud.simplify_grid(0.002);
//! assert_eq!(removed, 1);
//! assert_eq!(cloud.len(), 2);
//! ```

mod index;

pub use index::{Neighbor, PointIndex};

use hashbrown::HashSet;
use nalgebra::{Point3, Vector3};

/// Ordered point set with optional per-point normals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    positions: Vec<Point3<f64>>,
    /// Either empty or the same length as `positions`.
    normals: Vec<Vector3<f64>>,
}

impl PointCloud {
    /// Creates an empty point cloud.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a point cloud from positions, without normals.
    #[must_use]
    pub const fn from_positions(positions: Vec<Point3<f64>>) -> Self {
        Self {
            positions,
            normals: Vec::new(),
        }
    }

    /// Creates a point cloud with one normal per position.
    ///
    /// Returns `None` if the lengths differ.
    #[must_use]
    pub fn with_normals(positions: Vec<Point3<f64>>, normals: Vec<Vector3<f64>>) -> Option<Self> {
        (positions.len() == normals.len()).then_some(Self { positions, normals })
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Point positions in sequence order.
    #[must_use]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// Per-point normals, if this cloud carries them.
    #[must_use]
    pub fn normals(&self) -> Option<&[Vector3<f64>]> {
        (!self.positions.is_empty() && self.normals.len() == self.positions.len())
            .then_some(self.normals.as_slice())
    }

    /// Appends positions. Any normals are discarded since the new points have none.
    pub fn extend_positions(&mut self, positions: impl IntoIterator<Item = Point3<f64>>) {
        self.normals.clear();
        self.positions.extend(positions);
    }

    /// Removes every point.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
    }

    /// Mean position, or `None` if empty.
    #[must_use]
    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.positions.is_empty() {
            return None;
        }
        let sum = self
            .positions
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        #[allow(clippy::cast_precision_loss)]
        let n = self.positions.len() as f64;
        Some(Point3::from(sum / n))
    }

    /// Keeps only the first point of every occupied grid cell.
    ///
    /// Cells are axis-aligned cubes of side `cell_size` anchored at the
    /// origin. Survivors keep their relative order and their normals.
    /// Returns the number of points removed. A non-positive cell size
    /// leaves the cloud untouched.
    pub fn simplify_grid(&mut self, cell_size: f64) -> usize {
        let keep = grid_keep_mask(&self.positions, cell_size);
        let before = self.positions.len();

        let mut flags = keep.iter();
        self.positions.retain(|_| flags.next().copied().unwrap_or(true));
        if !self.normals.is_empty() {
            let mut flags = keep.iter();
            self.normals.retain(|_| flags.next().copied().unwrap_or(true));
        }

        before - self.positions.len()
    }
}

/// Marks the first point of each occupied grid cell.
///
/// The first point (in slice order) to land in a cell is kept, every later
/// point in the same cell is dropped, so the result depends only on the
/// input order and never on hash iteration order.
#[must_use]
pub fn grid_keep_mask(positions: &[Point3<f64>], cell_size: f64) -> Vec<bool> {
    if cell_size <= 0.0 || !cell_size.is_finite() {
        return vec![true; positions.len()];
    }

    let inv = 1.0 / cell_size;
    let mut occupied: HashSet<[i64; 3]> = HashSet::with_capacity(positions.len());

    positions
        .iter()
        .map(|p| {
            #[allow(clippy::cast_possible_truncation)]
            let key = [
                (p.x * inv).floor() as i64,
                (p.y * inv).floor() as i64,
                (p.z * inv).floor() as i64,
            ];
            occupied.insert(key)
        })
        .collect()
}
