//! Floor/foot classification of reconstructed facets.
//!
//! Every unclassified facet ends up in exactly one bucket:
//!
//! | Test (in order) | Bucket |
//! |-----------------|--------|
//! | perimeter > `max_perimeter` | oversized (dropped) |
//! | center above the floor band | foot |
//! | center below the floor band | below floor (dropped) |
//! | in band, `\|n_y\| < foot_steepness` | foot |
//! | in band, `\|n_y\| > floor_steepness` | floor |
//! | otherwise | ambiguous (dropped) |
//!
//! Facets that do not index the point set are dropped as oversized, since no
//! perimeter can be computed for them.

use std::time::Instant;

use foot_types::{Facet, Interval};
use nalgebra::Point3;
use tracing::info;

use crate::elapsed_ms;
use crate::error::{ScanError, ScanResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters for facet classification.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassifyParams {
    /// Longest facet perimeter kept, in metres. Default: 0.03.
    pub max_perimeter: f64,

    /// In-band facets with `|n_y|` below this are foot. Default: 0.6.
    pub foot_steepness: f64,

    /// In-band facets with `|n_y|` above this are floor. Default: 0.9.
    pub floor_steepness: f64,
}

impl Default for ClassifyParams {
    fn default() -> Self {
        Self {
            max_perimeter: 0.03,
            foot_steepness: 0.6,
            floor_steepness: 0.9,
        }
    }
}

impl ClassifyParams {
    /// Creates new parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the perimeter bound.
    #[must_use]
    pub const fn with_max_perimeter(mut self, perimeter: f64) -> Self {
        self.max_perimeter = perimeter;
        self
    }

    /// Sets the foot and floor steepness thresholds.
    #[must_use]
    pub const fn with_steepness(mut self, foot: f64, floor: f64) -> Self {
        self.foot_steepness = foot;
        self.floor_steepness = floor;
        self
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidParameter`] naming the first bad value.
    pub fn validate(&self) -> ScanResult<()> {
        if !(self.max_perimeter.is_finite() && self.max_perimeter > 0.0) {
            return Err(ScanError::invalid(format!(
                "classify.max_perimeter must be positive, got {}",
                self.max_perimeter
            )));
        }
        for (name, value) in [
            ("classify.foot_steepness", self.foot_steepness),
            ("classify.floor_steepness", self.floor_steepness),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ScanError::invalid(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.foot_steepness > self.floor_steepness {
            return Err(ScanError::invalid(format!(
                "classify.foot_steepness ({}) must not exceed classify.floor_steepness ({})",
                self.foot_steepness, self.floor_steepness
            )));
        }
        Ok(())
    }
}

/// Output of [`classify_facets`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Classification {
    /// Floor facets, in input order.
    pub floor: Vec<Facet>,
    /// Foot facets, in input order.
    pub foot: Vec<Facet>,
    /// Facets dropped for their perimeter.
    pub oversized: usize,
    /// Facets dropped for lying under the floor band.
    pub below_floor: usize,
    /// In-band facets that were neither steep nor flat enough.
    pub ambiguous: usize,
}

impl Classification {
    /// Total facets looked at.
    #[must_use]
    pub fn total(&self) -> usize {
        self.floor.len() + self.foot.len() + self.oversized + self.below_floor + self.ambiguous
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Classification: {} floor, {} foot, dropped {} oversized / {} below floor / {} ambiguous",
            self.floor.len(),
            self.foot.len(),
            self.oversized,
            self.below_floor,
            self.ambiguous
        )
    }
}

/// Splits `undefined` facets into floor and foot around the floor band.
#[must_use]
pub fn classify_facets(
    points: &[Point3<f64>],
    undefined: &[Facet],
    interval: Interval,
    params: &ClassifyParams,
) -> Classification {
    let start = Instant::now();
    let mut result = Classification::default();

    for facet in undefined {
        let Some(geometry) = facet.geometry(points) else {
            result.oversized += 1;
            continue;
        };

        if geometry.perimeter > params.max_perimeter {
            result.oversized += 1;
            continue;
        }

        let height = geometry.height();
        if height > interval.high() {
            result.foot.push(*facet);
            continue;
        }
        if height < interval.low() {
            result.below_floor += 1;
            continue;
        }

        if geometry.normal.is_none() {
            result.ambiguous += 1;
            continue;
        }
        let alignment = geometry.vertical_alignment();
        if alignment < params.foot_steepness {
            result.foot.push(*facet);
        } else if alignment > params.floor_steepness {
            result.floor.push(*facet);
        } else {
            result.ambiguous += 1;
        }
    }

    info!(
        facets = undefined.len(),
        floor = result.floor.len(),
        foot = result.foot.len(),
        oversized = result.oversized,
        below_floor = result.below_floor,
        ambiguous = result.ambiguous,
        elapsed_ms = elapsed_ms(start),
        "facet classification done"
    );

    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Builds one facet per entry: a small triangle centered at the given
    /// height, either flat, vertical, or tilted at 45 degrees.
    fn fixture(specs: &[(f64, &str)]) -> (Vec<Point3<f64>>, Vec<Facet>) {
        let mut points = Vec::new();
        let mut facets = Vec::new();
        for (i, &(y, shape)) in specs.iter().enumerate() {
            let x = f64::from(u32::try_from(i).unwrap()) * 0.1;
            let s = 0.003;
            let corners = match shape {
                "flat" => [
                    Point3::new(x, y, 0.0),
                    Point3::new(x, y, s),
                    Point3::new(x + s, y, 0.0),
                ],
                "wall" => [
                    Point3::new(x, y - s / 3.0, 0.0),
                    Point3::new(x, y + 2.0 * s / 3.0, 0.0),
                    Point3::new(x, y - s / 3.0, s),
                ],
                "tilted" => [
                    Point3::new(x, y - s / 3.0, 0.0),
                    Point3::new(x + s, y + 2.0 * s / 3.0, 0.0),
                    Point3::new(x, y - s / 3.0, s),
                ],
                "huge" => [
                    Point3::new(x, y, 0.0),
                    Point3::new(x, y, 0.05),
                    Point3::new(x + 0.05, y, 0.0),
                ],
                _ => [Point3::new(x, y, 0.0); 3],
            };
            let base = u32::try_from(points.len()).unwrap();
            points.extend(corners);
            facets.push(Facet::new(base, base + 1, base + 2));
        }
        (points, facets)
    }

    fn band() -> Interval {
        Interval::new(-0.01, 0.0, 0.01).unwrap()
    }

    #[test]
    fn test_buckets() {
        let (points, facets) = fixture(&[
            (0.0, "flat"),    // floor
            (0.0, "wall"),    // foot inside band
            (0.05, "flat"),   // foot above band
            (-0.05, "flat"),  // below floor
            (0.0, "tilted"),  // ambiguous
            (0.0, "huge"),    // oversized
            (0.0, "point"),   // degenerate in band
            (0.08, "point"),  // degenerate above band
        ]);

        let result = classify_facets(&points, &facets, band(), &ClassifyParams::default());
        assert_eq!(result.floor, vec![facets[0]]);
        assert_eq!(result.foot, vec![facets[1], facets[2], facets[7]]);
        assert_eq!(result.below_floor, 1);
        assert_eq!(result.ambiguous, 2);
        assert_eq!(result.oversized, 1);
        assert_eq!(result.total(), facets.len());
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        let (points, facets) = fixture(&[(0.01, "flat"), (-0.01, "flat")]);
        let result = classify_facets(&points, &facets, band(), &ClassifyParams::default());
        assert_eq!(result.floor.len(), 2);
    }

    #[test]
    fn test_out_of_range_facet_dropped() {
        let (points, _) = fixture(&[(0.0, "flat")]);
        let facets = vec![Facet::new(0, 1, 42)];
        let result = classify_facets(&points, &facets, band(), &ClassifyParams::default());
        assert_eq!(result.oversized, 1);
        assert!(result.floor.is_empty() && result.foot.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let result = classify_facets(&[], &[], band(), &ClassifyParams::default());
        assert_eq!(result, Classification::default());
        assert!(result.to_string().contains("0 floor"));
    }

    #[test]
    fn test_params_validate() {
        assert!(ClassifyParams::default().validate().is_ok());
        assert!(ClassifyParams::new().with_max_perimeter(0.0).validate().is_err());
        assert!(ClassifyParams::new().with_steepness(0.95, 0.9).validate().is_err());
        assert!(ClassifyParams::new().with_steepness(0.6, 1.2).validate().is_err());
    }
}
