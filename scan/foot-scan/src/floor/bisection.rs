//! Coarse floor search by repeated bisection.

use foot_types::Interval;
use tracing::debug;

use super::{height_of, FloorParams, FloorSearch};
use crate::error::{ScanError, ScanResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rounds of bisection allowed before giving up. Far more than needed to
/// shrink any finite interval below `epsilon`.
const MAX_ROUNDS: usize = 128;

/// Bisection over candidate heights.
///
/// Each round splits the surviving candidates at the interval center into
/// `lower` (`h < center`) and `higher` (`h >= center`). When the two halves
/// are of comparable size the floor straddles the center and the search
/// stops. Otherwise the denser half survives and the interval shrinks to its
/// side.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BisectionSearch {
    initial: Interval,
    stop_percent: u32,
    epsilon: f64,
    max_floor_thickness: f64,
}

impl BisectionSearch {
    /// Builds the search from validated parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidParameter`] if the parameters are invalid.
    pub fn from_params(params: &FloorParams) -> ScanResult<Self> {
        params.validate()?;
        let initial = Interval::from_bounds(params.search_low, params.search_high)
            .ok_or_else(|| ScanError::invalid("floor search bounds must be finite"))?;
        Ok(Self {
            initial,
            stop_percent: params.stop_percent,
            epsilon: params.epsilon,
            max_floor_thickness: params.max_floor_thickness,
        })
    }

    /// Interval the search starts from.
    #[must_use]
    pub const fn initial(&self) -> Interval {
        self.initial
    }

    /// Runs the search. Candidates without a finite height are ignored.
    #[must_use]
    pub fn search(&self, candidates: &[usize], heights: &[f64]) -> FloorSearch {
        // Survivors start as the whole input, so a balanced first split keeps everything.
        let mut current: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&i| height_of(heights, i).is_some())
            .collect();

        if current.is_empty() {
            return FloorSearch {
                interval: self.initial.clamp_width(self.max_floor_thickness),
                candidates: Vec::new(),
            };
        }

        let mut low = self.initial.low();
        let mut high = self.initial.high();
        let mut rounds = 0;

        while rounds < MAX_ROUNDS && high - low > self.epsilon {
            rounds += 1;
            let center = low + (high - low) * 0.5;

            let (lower, higher): (Vec<usize>, Vec<usize>) = current
                .iter()
                .partition(|&&i| height_of(heights, i).is_some_and(|h| h < center));

            let (small, large) = if lower.len() <= higher.len() {
                (lower.len(), higher.len())
            } else {
                (higher.len(), lower.len())
            };
            if balance_percent(small, large) > self.stop_percent {
                break;
            }

            if lower.len() >= higher.len() {
                high = center;
                current = lower;
            } else {
                low = center;
                current = higher;
            }
        }

        let interval = Interval::from_bounds(low, high)
            .unwrap_or(self.initial)
            .clamp_width(self.max_floor_thickness);

        debug!(
            rounds,
            survivors = current.len(),
            low = interval.low(),
            high = interval.high(),
            "bisection floor search done"
        );

        FloorSearch {
            interval,
            candidates: current,
        }
    }
}

/// `round(100 * small / large)`, or 0 when `large` is zero.
fn balance_percent(small: usize, large: usize) -> u32 {
    if large == 0 {
        return 0;
    }
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    {
        (100.0 * small as f64 / large as f64).round() as u32
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn searcher() -> BisectionSearch {
        BisectionSearch::from_params(&FloorParams::default()).unwrap()
    }

    #[test]
    fn test_balance_percent() {
        assert_eq!(balance_percent(0, 0), 0);
        assert_eq!(balance_percent(0, 10), 0);
        assert_eq!(balance_percent(1, 10), 10);
        assert_eq!(balance_percent(5, 10), 50);
        assert_eq!(balance_percent(1, 3), 33);
    }

    #[test]
    fn test_empty_candidates_give_clamped_initial() {
        let result = searcher().search(&[], &[]);
        assert!(result.candidates.is_empty());
        assert_relative_eq!(result.interval.center(), -1.0);
        assert_relative_eq!(result.interval.width(), 0.02, epsilon = 1e-12);
    }

    #[test]
    fn test_converges_on_dense_floor() {
        // Floor at y = -1.23 with 0.5 mm spread, plus a few stray heights.
        let mut heights: Vec<f64> = (0..200)
            .map(|i| -1.23 + (f64::from(i) * 0.77).sin() * 0.0005)
            .collect();
        heights.extend([-0.4, -0.3, -1.9]);
        let candidates: Vec<usize> = (0..heights.len()).collect();

        let result = searcher().search(&candidates, &heights);
        let interval = result.interval;
        assert!(interval.width() <= 0.02 + 1e-12);
        assert!((interval.center() + 1.23).abs() < 0.01, "{interval}");
        assert!(result.candidates.len() >= 100);
        assert!(!result.candidates.contains(&200));
        assert!(!result.candidates.contains(&202));
    }

    #[test]
    fn test_immediate_stop_keeps_everything() {
        // Split evenly around the initial center.
        let heights = vec![-1.5, -1.4, -0.6, -0.5];
        let candidates = vec![0, 1, 2, 3];
        let result = searcher().search(&candidates, &heights);
        assert_eq!(result.candidates, candidates);
        assert_relative_eq!(result.interval.center(), -1.0);
        assert_relative_eq!(result.interval.width(), 0.02, epsilon = 1e-12);
    }

    #[test]
    fn test_floor_above_range_climbs_to_top() {
        let heights: Vec<f64> = (0..50).map(|i| 0.001 * (f64::from(i) * 0.9).sin()).collect();
        let candidates: Vec<usize> = (0..50).collect();
        let result = searcher().search(&candidates, &heights);
        assert!(result.interval.high() <= 1e-12);
        assert!(result.interval.low() > -0.02);
    }

    #[test]
    fn test_invalid_candidates_ignored() {
        let heights = vec![f64::NAN, -1.0];
        let result = searcher().search(&[0, 1, 7], &heights);
        assert!(!result.candidates.contains(&0));
        assert!(!result.candidates.contains(&7));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = FloorParams::default().with_search_range(f64::NAN, 0.0);
        assert!(BisectionSearch::from_params(&params).is_err());
    }
}
