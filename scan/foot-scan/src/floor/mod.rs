//! Floor height estimation.
//!
//! The floor is found among facets that are close to horizontal. Their
//! center heights go through two searches:
//!
//! | Phase | Type | Result |
//! |-------|------|--------|
//! | Coarse | [`BisectionSearch`] | Interval around the densest height range |
//! | Fine | [`HistogramSearch`] | Peak bin of a height histogram, widened over populated neighbors |
//!
//! [`search_floor`] chains the two. Both phases clamp the interval width to
//! `max_floor_thickness` and keep `low <= center <= high`.
//!
//! # Example
//!
//! ```
//! use foot_scan::floor::{search_floor, FloorParams};
//!
//! let heights: Vec<f64> = (0..100)
//!     .map(|i| -0.85 + (f64::from(i) * 0.37).sin() * 0.0008)
//!     .collect();
//! let candidates: Vec<usize> = (0..heights.len()).collect();
//!
//! let result = search_floor(&candidates, &heights, &FloorParams::default()).unwrap();
//! assert!((result.interval.center() + 0.85).abs() < 0.005);
//! assert!(result.interval.width() <= 0.02 + 1e-12);
//! ```

mod bisection;
mod histogram;

pub use bisection::BisectionSearch;
pub use histogram::HistogramSearch;

use std::time::Instant;

use foot_types::{Facet, Interval};
use nalgebra::Point3;
use tracing::info;

use crate::elapsed_ms;
use crate::error::{ScanError, ScanResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters for the floor search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FloorParams {
    /// Facets with `|n_y|` above this are floor candidates. Default: 0.9.
    pub steepness: f64,

    /// Lowest height searched, in metres. Default: -2.0.
    pub search_low: f64,

    /// Highest height searched, in metres. Default: 0.0.
    pub search_high: f64,

    /// Bisection stops when the smaller half holds more than this percentage
    /// of the larger half. Default: 10.
    pub stop_percent: u32,

    /// Bisection stops when the interval is this narrow, in metres.
    /// Default: 0.001.
    pub epsilon: f64,

    /// Widest floor interval allowed, in metres. Default: 0.02.
    pub max_floor_thickness: f64,

    /// Histogram bin width, in metres. Default: 0.002.
    pub bin_width: f64,

    /// Neighbor bins with at least this fraction of the peak count widen the
    /// floor band. Default: 0.01.
    pub cutoff_ratio: f64,
}

impl Default for FloorParams {
    fn default() -> Self {
        Self {
            steepness: 0.9,
            search_low: -2.0,
            search_high: 0.0,
            stop_percent: 10,
            epsilon: 0.001,
            max_floor_thickness: 0.02,
            bin_width: 0.002,
            cutoff_ratio: 0.01,
        }
    }
}

impl FloorParams {
    /// Creates new parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the candidate steepness threshold.
    #[must_use]
    pub const fn with_steepness(mut self, steepness: f64) -> Self {
        self.steepness = steepness;
        self
    }

    /// Sets the height range searched.
    #[must_use]
    pub const fn with_search_range(mut self, low: f64, high: f64) -> Self {
        self.search_low = low;
        self.search_high = high;
        self
    }

    /// Sets the bisection balance threshold.
    #[must_use]
    pub const fn with_stop_percent(mut self, percent: u32) -> Self {
        self.stop_percent = percent;
        self
    }

    /// Sets the bisection resolution.
    #[must_use]
    pub const fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the widest floor interval allowed.
    #[must_use]
    pub const fn with_max_floor_thickness(mut self, thickness: f64) -> Self {
        self.max_floor_thickness = thickness;
        self
    }

    /// Sets the histogram bin width.
    #[must_use]
    pub const fn with_bin_width(mut self, width: f64) -> Self {
        self.bin_width = width;
        self
    }

    /// Sets the histogram cutoff ratio.
    #[must_use]
    pub const fn with_cutoff_ratio(mut self, ratio: f64) -> Self {
        self.cutoff_ratio = ratio;
        self
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidParameter`] naming the first bad value.
    pub fn validate(&self) -> ScanResult<()> {
        if !(self.search_low.is_finite() && self.search_high.is_finite()) {
            return Err(ScanError::invalid("floor search range must be finite"));
        }
        if self.search_low >= self.search_high {
            return Err(ScanError::invalid(format!(
                "floor.search_low ({}) must be below floor.search_high ({})",
                self.search_low, self.search_high
            )));
        }
        for (name, value) in [
            ("floor.epsilon", self.epsilon),
            ("floor.max_floor_thickness", self.max_floor_thickness),
            ("floor.bin_width", self.bin_width),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ScanError::invalid(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("floor.cutoff_ratio", self.cutoff_ratio),
            ("floor.steepness", self.steepness),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ScanError::invalid(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.stop_percent > 100 {
            return Err(ScanError::invalid(format!(
                "floor.stop_percent must be at most 100, got {}",
                self.stop_percent
            )));
        }
        Ok(())
    }
}

/// Result of one floor search phase.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FloorSearch {
    /// Estimated floor band.
    pub interval: Interval,

    /// Candidates that survived the phase, in input order.
    pub candidates: Vec<usize>,
}

impl std::fmt::Display for FloorSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Floor {} from {} candidates",
            self.interval,
            self.candidates.len()
        )
    }
}

/// One of the floor search phases.
#[derive(Debug, Clone, PartialEq)]
pub enum FloorSearcher {
    /// Coarse bisection.
    Bisection(BisectionSearch),
    /// Fine histogram refinement.
    Histogram(HistogramSearch),
}

impl FloorSearcher {
    /// Runs the wrapped phase.
    #[must_use]
    pub fn search(&self, candidates: &[usize], heights: &[f64]) -> FloorSearch {
        match self {
            Self::Bisection(s) => s.search(candidates, heights),
            Self::Histogram(s) => s.search(candidates, heights),
        }
    }
}

/// Finite height at `i`, if any.
pub(crate) fn height_of(heights: &[f64], i: usize) -> Option<f64> {
    heights.get(i).copied().filter(|h| h.is_finite())
}

/// Center height of each facet. Facets that do not index `points` get NaN.
#[must_use]
pub fn facet_heights(points: &[Point3<f64>], facets: &[Facet]) -> Vec<f64> {
    facets
        .iter()
        .map(|f| f.geometry(points).map_or(f64::NAN, |g| g.height()))
        .collect()
}

/// Indices of facets whose normal has `|n_y| > steepness`.
///
/// Degenerate facets have no normal and are never candidates.
#[must_use]
pub fn steep_candidates(points: &[Point3<f64>], facets: &[Facet], steepness: f64) -> Vec<usize> {
    facets
        .iter()
        .enumerate()
        .filter(|(_, f)| {
            f.geometry(points)
                .is_some_and(|g| g.normal.is_some() && g.vertical_alignment() > steepness)
        })
        .map(|(i, _)| i)
        .collect()
}

/// Runs the coarse and then the fine search.
///
/// `candidates` index `heights`. With no usable candidate the result is the
/// initial search range clamped around its center, and no survivors.
///
/// # Errors
///
/// Returns [`ScanError::InvalidParameter`] if `params` is invalid.
pub fn search_floor(
    candidates: &[usize],
    heights: &[f64],
    params: &FloorParams,
) -> ScanResult<FloorSearch> {
    let start = Instant::now();

    let coarse = FloorSearcher::Bisection(BisectionSearch::from_params(params)?)
        .search(candidates, heights);
    if coarse.candidates.is_empty() {
        info!(
            candidates = candidates.len(),
            "no floor candidates, using search range"
        );
        return Ok(coarse);
    }

    let fine = FloorSearcher::Histogram(HistogramSearch::around(coarse.interval, params)?)
        .search(&coarse.candidates, heights);

    info!(
        candidates = candidates.len(),
        coarse_survivors = coarse.candidates.len(),
        survivors = fine.candidates.len(),
        low = fine.interval.low(),
        center = fine.interval.center(),
        high = fine.interval.high(),
        elapsed_ms = elapsed_ms(start),
        "floor search done"
    );

    Ok(fine)
}
