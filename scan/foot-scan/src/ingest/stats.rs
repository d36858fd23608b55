//! Rolling statistics over the most recent chunks.

use std::collections::VecDeque;

/// Fixed-capacity window of recent values with mean and standard deviation.
///
/// When full, pushing a value evicts the oldest one.
///
/// # Example
///
/// ```
/// use foot_scan::ingest::RollingStats;
///
/// let mut stats = RollingStats::new(3);
/// for v in [1.0, 2.0, 3.0, 4.0] {
///     stats.push(v);
/// }
/// assert_eq!(stats.len(), 3);
/// assert!((stats.mean() - 3.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RollingStats {
    capacity: usize,
    values: VecDeque<f64>,
}

impl RollingStats {
    /// Creates an empty window. A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    /// Adds a value, evicting the oldest one if the window is full.
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Maximum number of values kept.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of values currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no value has been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean of the held values, 0.0 when empty.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.values.len() as f64;
        self.values.iter().sum::<f64>() / n
    }

    /// Population standard deviation of the held values, 0.0 when empty.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        #[allow(clippy::cast_precision_loss)]
        let n = self.values.len() as f64;
        (self.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
    }

    /// Most recent value.
    #[must_use]
    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Drops every value.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_stats() {
        let stats = RollingStats::new(11);
        assert!(stats.is_empty());
        assert_relative_eq!(stats.mean(), 0.0);
        assert_relative_eq!(stats.std_dev(), 0.0);
        assert!(stats.last().is_none());
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut stats = RollingStats::new(2);
        stats.push(10.0);
        stats.push(2.0);
        stats.push(4.0);
        assert_eq!(stats.len(), 2);
        assert_relative_eq!(stats.mean(), 3.0);
        assert_relative_eq!(stats.std_dev(), 1.0);
        assert_eq!(stats.last(), Some(4.0));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut stats = RollingStats::new(0);
        stats.push(1.0);
        stats.push(5.0);
        assert_eq!(stats.capacity(), 1);
        assert_relative_eq!(stats.mean(), 5.0);

        stats.clear();
        assert!(stats.is_empty());
    }
}
