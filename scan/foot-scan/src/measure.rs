//! Foot measurements in the foot's own frame.
//!
//! Vertices of the polished foot are expressed in [`FootFrame`] coordinates:
//! distance along `longitudinal`, height above the floor, distance along
//! `lateral`. Length and width are the extents along the two horizontal
//! axes. The rise height is the highest vertex near the middle of the
//! length, where the instep is.

use foot_types::{Facet, FootFrame};
use nalgebra::Point3;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Half-width of the rise window, as a fraction of the foot length.
const RISE_WINDOW: f64 = 0.1;

/// Extents of a foot in its frame, in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Footprint {
    /// Extent along the frame's longitudinal axis.
    pub length: f64,

    /// Extent along the frame's lateral axis.
    pub width: f64,

    /// Highest point above the floor within the middle of the length.
    pub height_in_rise: f64,

    /// Distinct vertices measured.
    pub vertices: usize,
}

impl std::fmt::Display for Footprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Footprint: {:.1} mm long, {:.1} mm wide, {:.1} mm rise ({} vertices)",
            self.length * 1000.0,
            self.width * 1000.0,
            self.height_in_rise * 1000.0,
            self.vertices
        )
    }
}

/// Measures the vertices of `foot` in `frame`.
///
/// Returns `None` without a frame or when no facet vertex indexes `points`.
///
/// # Example
///
/// ```
/// use foot_scan::measure::measure_footprint;
/// use foot_types::{Facet, FootFrame};
/// use nalgebra::{Point3, Vector3};
///
/// let points = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(0.25, 0.0, 0.0),
///     Point3::new(0.1, 0.05, 0.1),
/// ];
/// let frame = FootFrame {
///     origin: Point3::origin(),
///     longitudinal: Vector3::x(),
///     lateral: Vector3::z(),
/// };
///
/// let print = measure_footprint(&points, &[Facet::new(0, 1, 2)], Some(&frame)).unwrap();
/// assert!((print.length - 0.25).abs() < 1e-12);
/// assert!((print.width - 0.1).abs() < 1e-12);
/// ```
#[must_use]
pub fn measure_footprint(
    points: &[Point3<f64>],
    foot: &[Facet],
    frame: Option<&FootFrame>,
) -> Option<Footprint> {
    let frame = frame?;

    let mut vertices: Vec<u32> = foot.iter().flat_map(Facet::indices).collect();
    vertices.sort_unstable();
    vertices.dedup();

    let local: Vec<Point3<f64>> = vertices
        .iter()
        .filter_map(|&i| points.get(i as usize))
        .map(|p| frame.to_local(p))
        .collect();

    if local.is_empty() {
        debug!(facets = foot.len(), "no foot vertices to measure");
        return None;
    }

    let (min_x, max_x) = extent(local.iter().map(|p| p.x));
    let (min_z, max_z) = extent(local.iter().map(|p| p.z));
    let length = max_x - min_x;

    let middle = min_x + length * 0.5;
    let window = length * RISE_WINDOW;
    let height_in_rise = local
        .iter()
        .filter(|p| (p.x - middle).abs() <= window)
        .map(|p| p.y)
        .fold(f64::NEG_INFINITY, f64::max)
        .max(0.0);

    Some(Footprint {
        length,
        width: max_z - min_z,
        height_in_rise,
        vertices: local.len(),
    })
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}
