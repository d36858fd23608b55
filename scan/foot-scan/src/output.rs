//! Copying results into caller-owned buffers.
//!
//! Render buffers are allocated by the host and may be smaller than the
//! data. The writers fill what fits, never wrap around, and report how much
//! there would have been so the caller can grow the buffer.

use foot_types::Facet;
use nalgebra::Point3;
use tracing::warn;

/// What a writer did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Items the data holds (points, or indices for facets).
    pub natural: usize,
    /// Items actually written.
    pub written: usize,
}

impl WriteReport {
    /// True if the buffer was too small.
    #[must_use]
    pub const fn truncated(&self) -> bool {
        self.written < self.natural
    }
}

impl std::fmt::Display for WriteReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "wrote {} of {}", self.written, self.natural)
    }
}

/// Writes points as `f32` triples, as many as fit in `out`.
///
/// # Example
///
/// ```
/// use foot_scan::output::write_points;
/// use nalgebra::Point3;
///
/// let points = vec![Point3::new(1.0, 2.0, 3.0); 4];
/// let mut buffer = [[0.0_f32; 3]; 3];
/// let report = write_points(&points, &mut buffer);
/// assert_eq!((report.natural, report.written), (4, 3));
/// assert!(report.truncated());
/// assert_eq!(buffer[2], [1.0, 2.0, 3.0]);
/// ```
#[allow(clippy::cast_possible_truncation)]
pub fn write_points(points: &[Point3<f64>], out: &mut [[f32; 3]]) -> WriteReport {
    let mut written = 0;
    for (slot, p) in out.iter_mut().zip(points) {
        *slot = [p.x as f32, p.y as f32, p.z as f32];
        written += 1;
    }

    let report = WriteReport {
        natural: points.len(),
        written,
    };
    if report.truncated() {
        warn!(natural = report.natural, capacity = out.len(), "point buffer too small");
    }
    report
}

/// Writes facet indices, three per facet, as many whole facets as fit.
///
/// `natural` and `written` count indices, not facets.
pub fn write_facet_indices(facets: &[Facet], out: &mut [u32]) -> WriteReport {
    let mut written = 0;
    for (slot, facet) in out.chunks_exact_mut(3).zip(facets) {
        slot.copy_from_slice(&facet.indices());
        written += 3;
    }

    let report = WriteReport {
        natural: facets.len() * 3,
        written,
    };
    if report.truncated() {
        warn!(natural = report.natural, capacity = out.len(), "index buffer too small");
    }
    report
}
