//! Vertical interval believed to contain the floor.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A closed height range with a distinguished center.
///
/// The invariant `low <= center <= high` holds for every value of this type:
/// the fields are private and both constructors check it.
///
/// # Example
///
/// ```
/// use foot_types::Interval;
///
/// let band = Interval::new(-0.01, 0.0, 0.01).unwrap();
/// assert!(band.contains(0.005));
/// assert!((band.width() - 0.02).abs() < 1e-12);
///
/// assert!(Interval::new(0.0, 1.0, 0.5).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval {
    low: f64,
    center: f64,
    high: f64,
}

impl Interval {
    /// Create an interval, or `None` if the bounds are out of order or not finite.
    #[must_use]
    pub fn new(low: f64, center: f64, high: f64) -> Option<Self> {
        let finite = low.is_finite() && center.is_finite() && high.is_finite();
        (finite && low <= center && center <= high).then_some(Self { low, center, high })
    }

    /// Create an interval centered between two bounds, given in either order.
    ///
    /// Returns `None` if either bound is not finite.
    #[must_use]
    pub fn from_bounds(a: f64, b: f64) -> Option<Self> {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self::new(low, low + (high - low) * 0.5, high)
    }

    /// Lower bound.
    #[inline]
    #[must_use]
    pub const fn low(&self) -> f64 {
        self.low
    }

    /// Center value.
    #[inline]
    #[must_use]
    pub const fn center(&self) -> f64 {
        self.center
    }

    /// Upper bound.
    #[inline]
    #[must_use]
    pub const fn high(&self) -> f64 {
        self.high
    }

    /// `high - low`.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    /// Returns true if `value` lies in `[low, high]`.
    #[inline]
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }

    /// Returns true if `value` lies in `(low, high)`.
    #[inline]
    #[must_use]
    pub fn contains_strict(&self, value: f64) -> bool {
        self.low < value && value < self.high
    }

    /// Shrink the interval so its width is at most `max_width`.
    ///
    /// The center is kept. Each side is cut to `max_width / 2`, which leaves
    /// an already narrow side untouched, so the center stays inside.
    #[must_use]
    pub fn clamp_width(self, max_width: f64) -> Self {
        if self.width() <= max_width {
            return self;
        }
        let half = max_width.max(0.0) * 0.5;
        Self {
            low: self.low.max(self.center - half),
            center: self.center,
            high: self.high.min(self.center + half),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.4}, {:.4}, {:.4}] (width {:.4})",
            self.low,
            self.center,
            self.high,
            self.width()
        )
    }
}
