//! Fine floor search by height histogram.

use foot_types::Interval;
use tracing::debug;

use super::{height_of, FloorParams, FloorSearch};
use crate::error::ScanResult;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Histogram refinement around a coarse floor estimate.
///
/// Heights within `max_floor_thickness` of the coarse center are binned.
/// The fullest bin is the floor; the band grows outward over neighboring
/// bins that hold at least `cutoff_ratio` of the peak count.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistogramSearch {
    around: Interval,
    bin_width: f64,
    cutoff_ratio: f64,
    max_floor_thickness: f64,
}

impl HistogramSearch {
    /// Refines `around` with validated parameters.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScanError::InvalidParameter`] if the parameters are
    /// invalid.
    pub fn around(around: Interval, params: &FloorParams) -> ScanResult<Self> {
        params.validate()?;
        Ok(Self {
            around,
            bin_width: params.bin_width,
            cutoff_ratio: params.cutoff_ratio,
            max_floor_thickness: params.max_floor_thickness,
        })
    }

    /// The coarse interval being refined.
    #[must_use]
    pub const fn coarse(&self) -> Interval {
        self.around
    }

    /// Runs the search. Candidates without a finite height are ignored.
    #[must_use]
    pub fn search(&self, candidates: &[usize], heights: &[f64]) -> FloorSearch {
        let window_low = self.around.center() - self.max_floor_thickness;
        let window_high = self.around.center() + self.max_floor_thickness;

        // The small slack stops 0.04 / 0.002 from rounding up to 21 bins.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bin_count =
            (((window_high - window_low) / self.bin_width - 1e-9).ceil() as usize).max(1);
        let mut counts = vec![0usize; bin_count];

        for &i in candidates {
            let Some(h) = height_of(heights, i) else {
                continue;
            };
            if h < window_low || h > window_high {
                continue;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let bin = (((h - window_low) / self.bin_width) as usize).min(bin_count - 1);
            counts[bin] += 1;
        }

        // Fullest bin, lowest on ties.
        let (peak, peak_count) = counts
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0), |best, (bin, n)| if n > best.1 { (bin, n) } else { best });

        if peak_count == 0 {
            debug!(
                center = self.around.center(),
                "histogram window empty, keeping coarse interval"
            );
            return FloorSearch {
                interval: self.around,
                candidates: Vec::new(),
            };
        }

        #[allow(clippy::cast_precision_loss)]
        let cutoff = peak_count as f64 * self.cutoff_ratio;
        #[allow(clippy::cast_precision_loss)]
        let keeps = |bin: usize| counts[bin] as f64 >= cutoff;

        let mut first = peak;
        while first > 0 && keeps(first - 1) {
            first -= 1;
        }
        let mut last = peak;
        while last + 1 < bin_count && keeps(last + 1) {
            last += 1;
        }

        #[allow(clippy::cast_precision_loss)]
        let edge = |bin: usize| self.bin_width.mul_add(bin as f64, window_low);
        let center = (edge(peak) + edge(peak + 1)) * 0.5;
        let low = edge(first).min(center);
        let high = edge(last + 1).min(window_high).max(center);

        let interval = Interval::new(low, center, high)
            .unwrap_or(self.around)
            .clamp_width(self.max_floor_thickness);

        let survivors: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&i| height_of(heights, i).is_some_and(|h| interval.contains(h)))
            .collect();

        debug!(
            peak_bin = peak,
            peak_count,
            bins = last - first + 1,
            survivors = survivors.len(),
            low = interval.low(),
            center = interval.center(),
            high = interval.high(),
            "histogram floor search done"
        );

        FloorSearch {
            interval,
            candidates: survivors,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn search_around(center: f64) -> HistogramSearch {
        let coarse = Interval::new(center - 0.0005, center, center + 0.0005).unwrap();
        HistogramSearch::around(coarse, &FloorParams::default()).unwrap()
    }

    #[test]
    fn test_peak_bin_becomes_center() {
        // 50 heights in [0.0041, 0.0049], i.e. the bin [0.004, 0.006) of a
        // window starting at -0.02.
        let mut heights: Vec<f64> = (0..50)
            .map(|i| 0.0041 + f64::from(i % 9) * 0.0001)
            .collect();
        heights.push(0.3);
        let candidates: Vec<usize> = (0..heights.len()).collect();

        let result = search_around(0.0).search(&candidates, &heights);
        assert_relative_eq!(result.interval.center(), 0.005, epsilon = 1e-12);
        assert_relative_eq!(result.interval.low(), 0.004, epsilon = 1e-12);
        assert_relative_eq!(result.interval.high(), 0.006, epsilon = 1e-12);
        assert_eq!(result.candidates.len(), 50);
        assert!(!result.candidates.contains(&50));
    }

    #[test]
    fn test_band_extends_over_populated_bins() {
        // Peak at [0, 0.002) with 100 heights, 5 heights one bin lower,
        // nothing above.
        let mut heights: Vec<f64> = (0..100).map(|i| 0.0001 + f64::from(i) * 0.000_018).collect();
        heights.extend((0..5).map(|i| -0.0019 + f64::from(i) * 0.0001));
        let candidates: Vec<usize> = (0..heights.len()).collect();

        let result = search_around(0.0).search(&candidates, &heights);
        assert_relative_eq!(result.interval.center(), 0.001, epsilon = 1e-12);
        assert_relative_eq!(result.interval.low(), -0.002, epsilon = 1e-12);
        assert_relative_eq!(result.interval.high(), 0.002, epsilon = 1e-12);
        assert_eq!(result.candidates.len(), 105);
    }

    #[test]
    fn test_ties_pick_lowest_bin() {
        let heights = vec![-0.0101, -0.0102, 0.0101, 0.0102];
        let result = search_around(0.0).search(&[0, 1, 2, 3], &heights);
        assert!(result.interval.center() < 0.0);
    }

    #[test]
    fn test_width_is_clamped() {
        // Every bin in the window is populated.
        let heights: Vec<f64> = (0..400).map(|i| -0.0199 + f64::from(i) * 0.0000995).collect();
        let candidates: Vec<usize> = (0..heights.len()).collect();
        let result = search_around(0.0).search(&candidates, &heights);

        assert!(result.interval.width() <= 0.02 + 1e-12);
        assert!(result.interval.low() <= result.interval.center());
        assert!(result.interval.center() <= result.interval.high());
        assert!(result
            .candidates
            .iter()
            .all(|&i| result.interval.contains(heights[i])));
    }

    #[test]
    fn test_empty_window_keeps_coarse_interval() {
        let heights = vec![0.5, 0.6, -0.7];
        let searcher = search_around(0.0);
        let result = searcher.search(&[0, 1, 2], &heights);
        assert_eq!(result.interval, searcher.coarse());
        assert!(result.candidates.is_empty());
    }
}
