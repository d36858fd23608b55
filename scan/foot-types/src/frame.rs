//! Per-scan coordinate frame of the foot.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Origin and horizontal axes of a scanned foot.
///
/// `longitudinal` runs heel to toe (or toe to heel; the fit cannot tell),
/// `lateral` is perpendicular to it in the horizontal plane. Both have zero
/// `y` component and unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FootFrame {
    /// Centroid of the foot footprint, at floor height.
    pub origin: Point3<f64>,
    /// Principal direction of the footprint.
    pub longitudinal: Vector3<f64>,
    /// Horizontal perpendicular to `longitudinal`.
    pub lateral: Vector3<f64>,
}

impl FootFrame {
    /// World up axis.
    #[must_use]
    pub fn up() -> Vector3<f64> {
        Vector3::y()
    }

    /// Express a world point in frame coordinates `(longitudinal, up, lateral)`.
    #[must_use]
    pub fn to_local(&self, point: &Point3<f64>) -> Point3<f64> {
        let d = point - self.origin;
        Point3::new(d.dot(&self.longitudinal), d.y, d.dot(&self.lateral))
    }
}

impl std::fmt::Display for FootFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FootFrame {{ origin: ({:.4}, {:.4}, {:.4}), longitudinal: ({:.3}, {:.3}) }}",
            self.origin.x, self.origin.y, self.origin.z, self.longitudinal.x, self.longitudinal.z
        )
    }
}
