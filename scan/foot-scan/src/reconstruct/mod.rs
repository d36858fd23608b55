//! Surface reconstruction from the accumulated raw points.
//!
//! [`reconstruct`] runs three steps on a copy of the raw point set:
//!
//! 1. Jet smoothing ([`crate::smooth`])
//! 2. Grid re-simplification, same rule as ingestion
//! 3. Advancing-front triangulation ([`advancing_front`])
//!
//! The output replaces any previous reconstruction wholesale. Every step is
//! deterministic, so reconstructing unchanged input twice gives identical
//! facets.
//!
//! # Example
//!
//! ```
//! use foot_scan::reconstruct::{reconstruct, ReconstructParams};
//! use nalgebra::Point3;
//!
//! let mut raw = Vec::new();
//! for j in 0..12 {
//!     for i in 0..12 {
//!         let k = f64::from(i * 7 + j * 13);
//!         raw.push(Point3::new(
//!             f64::from(i) * 0.003 + (k * 0.3).sin() * 1e-4,
//!             (k * 0.7).sin() * 1e-4,
//!             f64::from(j) * 0.003 + (k * 0.5).cos() * 1e-4,
//!         ));
//!     }
//! }
//!
//! let params = ReconstructParams::default().with_smoothing_neighbors(24);
//! let result = reconstruct(&raw, &params);
//! assert!(!result.facets.is_empty());
//! ```

mod front;

pub use front::{advancing_front, ball_centers, FrontResult};

use std::time::Instant;

use foot_types::Facet;
use nalgebra::Point3;
use tracing::{debug, info};

use crate::elapsed_ms;
use crate::error::{ScanError, ScanResult};
use crate::pointcloud::{PointCloud, PointIndex};
use crate::smooth::jet_smooth;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters for surface reconstruction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconstructParams {
    /// Neighbors used by each jet fit. Default: 96. Useful range 90 to 200.
    pub smoothing_neighbors: usize,

    /// Cell size of the re-simplification grid, in metres. Default: 0.002.
    pub grid_cell: f64,

    /// Radius of the pivoting ball, in metres. Default: 0.005.
    ///
    /// Should be about twice the point spacing left by the grid.
    pub ball_radius: f64,

    /// Candidate facets with a longer perimeter are rejected. Default: 0.03.
    pub max_facet_perimeter: f64,
}

impl Default for ReconstructParams {
    fn default() -> Self {
        Self {
            smoothing_neighbors: 96,
            grid_cell: 0.002,
            ball_radius: 0.005,
            max_facet_perimeter: 0.03,
        }
    }
}

impl ReconstructParams {
    /// Creates new parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the jet smoothing neighborhood size.
    #[must_use]
    pub const fn with_smoothing_neighbors(mut self, k: usize) -> Self {
        self.smoothing_neighbors = k;
        self
    }

    /// Sets the re-simplification cell size.
    #[must_use]
    pub const fn with_grid_cell(mut self, cell: f64) -> Self {
        self.grid_cell = cell;
        self
    }

    /// Sets the ball radius.
    #[must_use]
    pub const fn with_ball_radius(mut self, radius: f64) -> Self {
        self.ball_radius = radius;
        self
    }

    /// Sets the facet perimeter bound.
    #[must_use]
    pub const fn with_max_facet_perimeter(mut self, perimeter: f64) -> Self {
        self.max_facet_perimeter = perimeter;
        self
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidParameter`] naming the first bad value.
    pub fn validate(&self) -> ScanResult<()> {
        for (name, value) in [
            ("reconstruct.grid_cell", self.grid_cell),
            ("reconstruct.ball_radius", self.ball_radius),
            ("reconstruct.max_facet_perimeter", self.max_facet_perimeter),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ScanError::invalid(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.smoothing_neighbors == 0 {
            return Err(ScanError::invalid(
                "reconstruct.smoothing_neighbors must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Output of [`reconstruct`].
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    /// Smoothed, re-simplified points with normals. Facets index this set.
    pub points: PointCloud,

    /// Reconstructed facets, all unclassified.
    pub facets: Vec<Facet>,

    /// Points projected by the jet fit.
    pub smoothed: usize,

    /// Points dropped by re-simplification.
    pub simplified_away: usize,

    /// Components grown from separate seeds.
    pub components: usize,

    /// Points not used by any facet.
    pub orphan_points: usize,
}

impl std::fmt::Display for Reconstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Reconstruction: {} points, {} facets in {} components, {} orphan points",
            self.points.len(),
            self.facets.len(),
            self.components,
            self.orphan_points
        )
    }
}

/// Rebuilds the smoothed point set and its facets from raw points.
///
/// Degenerate input (too few points, all collinear, too sparse for the ball)
/// gives zero facets.
#[must_use]
pub fn reconstruct(raw: &[Point3<f64>], params: &ReconstructParams) -> Reconstruction {
    let start = Instant::now();

    let smoothing = jet_smooth(raw, params.smoothing_neighbors);
    debug!(
        fitted = smoothing.fitted,
        unchanged = smoothing.unchanged,
        elapsed_ms = elapsed_ms(start),
        "jet smoothing done"
    );

    let mut points = smoothing.cloud;
    let simplified_away = points.simplify_grid(params.grid_cell);

    let front = advancing_front(
        points.positions(),
        points.normals().unwrap_or_default(),
        params.ball_radius,
        params.max_facet_perimeter,
    );

    info!(
        raw = raw.len(),
        points = points.len(),
        facets = front.facets.len(),
        components = front.seeds,
        orphans = front.orphan_points,
        boundary_edges = front.boundary_edges,
        truncated = front.truncated,
        elapsed_ms = elapsed_ms(start),
        "reconstruction done"
    );

    Reconstruction {
        points,
        facets: front.facets,
        smoothed: smoothing.fitted,
        simplified_away,
        components: front.seeds,
        orphan_points: front.orphan_points,
    }
}

/// Suggests a ball radius from point density.
///
/// Uses the mean distance to the `k` nearest neighbors, times 1.5. Returns
/// `None` for fewer than two points or `k == 0`.
#[must_use]
pub fn estimate_ball_radius(points: &[Point3<f64>], k: usize) -> Option<f64> {
    if points.len() < 2 || k == 0 {
        return None;
    }

    let index = PointIndex::build(points);
    let k_query = k.min(points.len() - 1);
    let mut total = 0.0;
    let mut count = 0usize;

    for p in points {
        // Skip first neighbor (self)
        for neighbor in index.nearest(p, k_query + 1).iter().skip(1) {
            total += neighbor.distance_sq.sqrt();
            count += 1;
        }
    }

    if count == 0 {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let avg_spacing = total / count as f64;
    Some(avg_spacing * 1.5)
}
