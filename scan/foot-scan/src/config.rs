//! Session configuration.
//!
//! [`ScanConfig`] groups the parameters of every stage. Presets cover the
//! common cases; individual stages can be swapped with the `with_*` builders.

use crate::classify::ClassifyParams;
use crate::error::ScanResult;
use crate::floor::FloorParams;
use crate::ingest::{IngestParams, OutlierParams};
use crate::reconstruct::ReconstructParams;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters for a whole scanning session.
///
/// # Example
///
/// ```
/// use foot_scan::config::ScanConfig;
/// use foot_scan::reconstruct::ReconstructParams;
///
/// let config = ScanConfig::fast()
///     .with_reconstruct(ReconstructParams::default().with_ball_radius(0.006));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScanConfig {
    /// Per-chunk ingestion.
    pub ingest: IngestParams,
    /// Smoothing and triangulation.
    pub reconstruct: ReconstructParams,
    /// Floor height search.
    pub floor: FloorParams,
    /// Floor/foot classification.
    pub classify: ClassifyParams,
}

impl ScanConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for a handheld foot scan at about 2 mm resolution.
    ///
    /// Same as the defaults, with a wider smoothing neighborhood to flatten
    /// depth sensor noise on the floor.
    #[must_use]
    pub fn for_foot_scan() -> Self {
        Self {
            reconstruct: ReconstructParams::default().with_smoothing_neighbors(128),
            ..Self::default()
        }
    }

    /// Preset trading smoothness for speed: small smoothing neighborhoods and
    /// a smaller outlier neighborhood.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            ingest: IngestParams::default()
                .with_outlier(OutlierParams::default().with_k_neighbors(12)),
            reconstruct: ReconstructParams::default().with_smoothing_neighbors(24),
            ..Self::default()
        }
    }

    /// Replaces the ingestion parameters.
    #[must_use]
    pub fn with_ingest(mut self, ingest: IngestParams) -> Self {
        self.ingest = ingest;
        self
    }

    /// Replaces the reconstruction parameters.
    #[must_use]
    pub fn with_reconstruct(mut self, reconstruct: ReconstructParams) -> Self {
        self.reconstruct = reconstruct;
        self
    }

    /// Replaces the floor search parameters.
    #[must_use]
    pub fn with_floor(mut self, floor: FloorParams) -> Self {
        self.floor = floor;
        self
    }

    /// Replaces the classification parameters.
    #[must_use]
    pub fn with_classify(mut self, classify: ClassifyParams) -> Self {
        self.classify = classify;
        self
    }

    /// Validates every stage.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScanError::InvalidParameter`] for the first bad value.
    pub fn validate(&self) -> ScanResult<()> {
        self.ingest.validate()?;
        self.reconstruct.validate()?;
        self.floor.validate()?;
        self.classify.validate()
    }
}
