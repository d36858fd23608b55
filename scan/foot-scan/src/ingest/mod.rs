//! Point accumulation from a live sample stream.
//!
//! Each captured chunk goes through the same steps:
//!
//! 1. Drop "no return" samples (zero vector) and non-finite samples
//! 2. Ignore the chunk if too few samples are left
//! 3. Statistical outlier removal within the chunk ([`outlier`])
//! 4. Append survivors to the accumulated raw point set
//! 5. Grid-simplify the whole raw point set
//!
//! Nothing here fails: malformed input just contributes fewer points.
//!
//! # Example
//!
//! ```
//! use foot_scan::ingest::{IngestParams, PointIngestor};
//! use nalgebra::Point3;
//!
//! let mut ingestor = PointIngestor::new(IngestParams::default());
//!
//! // 20 samples are below the minimum chunk size.
//! let report = ingestor.ingest(&vec![Point3::new(0.1, 0.0, 0.1); 20]);
//! assert!(report.skipped);
//! assert!(ingestor.points().is_empty());
//! ```

pub mod outlier;
mod stats;

pub use outlier::{remove_outliers, OutlierParams, OutlierRemoval};
pub use stats::RollingStats;

use std::time::Instant;

use nalgebra::Point3;
use tracing::{debug, info};

use crate::elapsed_ms;
use crate::error::{ScanError, ScanResult};
use crate::pointcloud::PointCloud;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters for point ingestion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IngestParams {
    /// Chunks with at most this many valid samples are ignored. Default: 24.
    pub min_chunk_points: usize,

    /// Outlier removal applied to each chunk.
    pub outlier: OutlierParams,

    /// Cell size of the grid simplification, in metres. Default: 0.002.
    pub grid_cell: f64,

    /// Number of recent chunks tracked by [`RollingStats`]. Default: 11.
    pub stats_window: usize,
}

impl Default for IngestParams {
    fn default() -> Self {
        Self {
            min_chunk_points: 24,
            outlier: OutlierParams::default(),
            grid_cell: 0.002,
            stats_window: 11,
        }
    }
}

impl IngestParams {
    /// Creates new parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum chunk size.
    #[must_use]
    pub const fn with_min_chunk_points(mut self, n: usize) -> Self {
        self.min_chunk_points = n;
        self
    }

    /// Sets the outlier removal parameters.
    #[must_use]
    pub fn with_outlier(mut self, outlier: OutlierParams) -> Self {
        self.outlier = outlier;
        self
    }

    /// Sets the grid cell size.
    #[must_use]
    pub const fn with_grid_cell(mut self, cell: f64) -> Self {
        self.grid_cell = cell;
        self
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidParameter`] naming the first bad value.
    pub fn validate(&self) -> ScanResult<()> {
        if !(self.grid_cell.is_finite() && self.grid_cell > 0.0) {
            return Err(ScanError::invalid(format!(
                "ingest.grid_cell must be positive, got {}",
                self.grid_cell
            )));
        }
        if self.outlier.k_neighbors == 0 {
            return Err(ScanError::invalid("ingest.outlier.k_neighbors must be at least 1"));
        }
        if !(self.outlier.std_multiplier.is_finite() && self.outlier.std_multiplier >= 0.0) {
            return Err(ScanError::invalid(format!(
                "ingest.outlier.std_multiplier must be non-negative, got {}",
                self.outlier.std_multiplier
            )));
        }
        if self.stats_window == 0 {
            return Err(ScanError::invalid("ingest.stats_window must be at least 1"));
        }
        Ok(())
    }
}

/// What one [`PointIngestor::ingest`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IngestReport {
    /// Samples in the chunk.
    pub received: usize,
    /// Samples left after dropping zero and non-finite ones.
    pub valid: usize,
    /// True if the chunk was too small and nothing changed.
    pub skipped: bool,
    /// Samples removed as statistical outliers.
    pub outliers_removed: usize,
    /// Samples appended to the raw point set.
    pub appended: usize,
    /// Points dropped from the whole raw set by grid simplification.
    pub simplified_away: usize,
    /// Raw point set size after the call.
    pub total: usize,
}

impl std::fmt::Display for IngestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.skipped {
            return write!(
                f,
                "Ingest: skipped ({} of {} samples valid), {} points total",
                self.valid, self.received, self.total
            );
        }
        write!(
            f,
            "Ingest: {} samples, {} outliers, {} appended, {} simplified away, {} points total",
            self.received, self.outliers_removed, self.appended, self.simplified_away, self.total
        )
    }
}

/// Accumulates denoised samples into the raw point set.
#[derive(Debug, Clone)]
pub struct PointIngestor {
    params: IngestParams,
    cloud: PointCloud,
    outlier_stats: RollingStats,
}

impl PointIngestor {
    /// Creates an empty ingestor.
    #[must_use]
    pub fn new(params: IngestParams) -> Self {
        let outlier_stats = RollingStats::new(params.stats_window);
        Self {
            params,
            cloud: PointCloud::new(),
            outlier_stats,
        }
    }

    /// Parameters in use.
    #[must_use]
    pub const fn params(&self) -> &IngestParams {
        &self.params
    }

    /// The accumulated raw point set.
    #[must_use]
    pub fn points(&self) -> &[Point3<f64>] {
        self.cloud.positions()
    }

    /// Outlier ratio of the most recent accepted chunks.
    #[must_use]
    pub const fn outlier_stats(&self) -> &RollingStats {
        &self.outlier_stats
    }

    /// Discards every accumulated point and statistic.
    pub fn reset(&mut self) {
        self.cloud.clear();
        self.outlier_stats.clear();
    }

    /// Processes one captured chunk.
    pub fn ingest(&mut self, chunk: &[Point3<f64>]) -> IngestReport {
        let start = Instant::now();

        let valid: Vec<Point3<f64>> = chunk.iter().copied().filter(is_valid_sample).collect();

        let mut report = IngestReport {
            received: chunk.len(),
            valid: valid.len(),
            total: self.cloud.len(),
            ..IngestReport::default()
        };

        if valid.len() <= self.params.min_chunk_points {
            report.skipped = true;
            debug!(
                received = report.received,
                valid = report.valid,
                "chunk too small, ignored"
            );
            return report;
        }

        let removal = remove_outliers(&valid, &self.params.outlier);
        self.outlier_stats.push(removal.outlier_ratio());

        report.outliers_removed = removal.outliers_removed;
        report.appended = removal.kept.len();

        self.cloud.extend_positions(removal.kept);
        report.simplified_away = self.cloud.simplify_grid(self.params.grid_cell);
        report.total = self.cloud.len();

        info!(
            received = report.received,
            valid = report.valid,
            outliers = report.outliers_removed,
            appended = report.appended,
            simplified_away = report.simplified_away,
            total = report.total,
            outlier_ratio_mean = self.outlier_stats.mean(),
            elapsed_ms = elapsed_ms(start),
            "ingested chunk"
        );

        report
    }
}

/// A usable sample: finite and not the zero vector.
fn is_valid_sample(p: &Point3<f64>) -> bool {
    p.coords.iter().all(|c| c.is_finite()) && p.coords.norm_squared() > 0.0
}
