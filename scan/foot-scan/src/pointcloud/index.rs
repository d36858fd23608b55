//! KD-tree index over a point slice.

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use nalgebra::Point3;

/// Bucket size of the tree.
const BUCKET: usize = 256;

/// Per-point offset step applied when inserting into the tree.
///
/// kiddo's mutable tree cannot split a bucket whose points all share the
/// same coordinate on the split axis, which a synthetic flat floor does.
/// Each point is shifted by `(i % 4096) * OFFSET_STEP` on every axis, at most
/// a few nanometres, so exact ties need more than a million coplanar points.
const OFFSET_STEP: f64 = 1e-12;

type Tree = KdTree<f64, u64, 3, BUCKET, u32>;

/// A neighbor returned by a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index into the slice the index was built from.
    pub index: usize,
    /// Squared Euclidean distance to the query point, exact up to the
    /// nanometre insertion offset.
    pub distance_sq: f64,
}

/// Nearest-neighbor and radius queries over a fixed point slice.
pub struct PointIndex {
    tree: Tree,
    len: usize,
}

impl PointIndex {
    /// Builds an index over `points`. Neighbor indices refer to this slice.
    #[must_use]
    pub fn build(points: &[Point3<f64>]) -> Self {
        let mut tree = Tree::with_capacity(points.len().max(1));
        for (i, p) in points.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let offset = (i % 4096) as f64 * OFFSET_STEP;
            tree.add(&[p.x + offset, p.y + offset, p.z + offset], i as u64);
        }
        Self {
            tree,
            len: points.len(),
        }
    }

    /// Number of indexed points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The `k` nearest points, closest first. Includes the query point itself
    /// if it was indexed.
    #[must_use]
    pub fn nearest(&self, query: &Point3<f64>, k: usize) -> Vec<Neighbor> {
        if k == 0 || self.len == 0 {
            return Vec::new();
        }
        self.tree
            .nearest_n::<SquaredEuclidean>(&[query.x, query.y, query.z], k.min(self.len))
            .into_iter()
            .map(to_neighbor)
            .collect()
    }

    /// All points within `radius` of `query`, closest first.
    #[must_use]
    pub fn within(&self, query: &Point3<f64>, radius: f64) -> Vec<Neighbor> {
        if self.len == 0 || radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        self.tree
            .within::<SquaredEuclidean>(&[query.x, query.y, query.z], radius * radius)
            .into_iter()
            .map(to_neighbor)
            .collect()
    }
}

impl std::fmt::Debug for PointIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointIndex").field("len", &self.len).finish()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_neighbor(n: kiddo::NearestNeighbour<f64, u64>) -> Neighbor {
    Neighbor {
        index: n.item as usize,
        distance_sq: n.distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: u32) -> Vec<Point3<f64>> {
        // Small variations on every axis avoid kiddo KD-tree axis collision
        (0..n)
            .map(|i| {
                let t = f64::from(i);
                Point3::new(t * 0.001, t * 0.00001, t * 0.00002)
            })
            .collect()
    }

    #[test]
    fn test_nearest_includes_self_first() {
        let points = line(20);
        let index = PointIndex::build(&points);
        let found = index.nearest(&points[5], 3);

        assert_eq!(found.len(), 3);
        assert_eq!(found[0].index, 5);
        assert!(found[0].distance_sq < 1e-18);
        assert!(found[1].distance_sq <= found[2].distance_sq);
    }

    #[test]
    fn test_nearest_caps_at_len() {
        let points = line(4);
        let index = PointIndex::build(&points);
        assert_eq!(index.nearest(&points[0], 10).len(), 4);
        assert!(index.nearest(&points[0], 0).is_empty());
    }

    #[test]
    fn test_within_radius() {
        let points = line(20);
        let index = PointIndex::build(&points);
        let found = index.within(&points[10], 0.00201);
        let mut ids: Vec<_> = found.iter().map(|n| n.index).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_empty_index() {
        let index = PointIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.nearest(&Point3::origin(), 3).is_empty());
        assert!(index.within(&Point3::origin(), 1.0).is_empty());
    }

    #[test]
    fn test_flat_floor_does_not_collide() {
        // 40 x 40 points sharing y = 0 exactly, and x or z in runs of 40.
        let mut points = Vec::new();
        for i in 0..40 {
            for j in 0..40 {
                points.push(Point3::new(f64::from(i) * 0.004, 0.0, f64::from(j) * 0.004));
            }
        }
        let index = PointIndex::build(&points);
        assert_eq!(index.len(), 1600);
        assert_eq!(index.nearest(&points[0], 5).len(), 5);
    }
}
