//! Scanning session driver.
//!
//! [`ScanSession`] owns everything a scan accumulates and runs the stages in
//! order:
//!
//! ```text
//! ingest* -> reconstruct -> separate -> find_foot_frame
//!            \__________________ finalize ______________/
//! ```
//!
//! Ingestion is only open while the session is [`Phase::Accumulating`].
//! [`ScanSession::reconstruct`] closes it, so the raw points cannot change
//! under a running segmentation. [`ScanSession::resume_accumulating`] opens
//! it again; the previous results stay readable until the next reconstruct.
//!
//! The smoothed point set and the facets that index it are always replaced
//! together, and every derived facet kind is cleared when they are.

use std::sync::atomic::AtomicBool;
use std::time::Instant;

use foot_types::{Facet, FacetCollection, FacetKind, FootFrame, Interval};
use nalgebra::{Point3, Vector3};
use tracing::{debug, info};

use crate::classify::classify_facets;
use crate::config::ScanConfig;
use crate::elapsed_ms;
use crate::error::{ScanError, ScanResult};
use crate::floor::{facet_heights, search_floor, steep_candidates};
use crate::frame::estimate_foot_frame;
use crate::measure::{measure_footprint, Footprint};
use crate::ingest::{IngestReport, PointIngestor, RollingStats};
use crate::pointcloud::PointCloud;
use crate::polish::{polish_foot, polish_foot_with_cancel};
use crate::reconstruct::reconstruct;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether the session accepts new samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Phase {
    /// Samples are accepted.
    #[default]
    Accumulating,
    /// Reconstruction has run; samples are refused.
    Segmenting,
}

/// Summary of one [`ScanSession::reconstruct`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconstructStats {
    /// Raw points the reconstruction started from.
    pub raw_points: usize,
    /// Smoothed points after re-simplification.
    pub smoothed_points: usize,
    /// Unclassified facets produced.
    pub facets: usize,
    /// Separate mesh components grown.
    pub components: usize,
    /// Smoothed points left out of every facet.
    pub orphan_points: usize,
}

/// Summary of one [`ScanSession::separate`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeparationStats {
    /// Floor band, `None` when no facet looked like floor.
    pub floor: Option<Interval>,
    /// Facets classified as floor.
    pub floor_facets: usize,
    /// Facets classified as foot.
    pub foot_facets: usize,
    /// Facets kept by polishing.
    pub polished_facets: usize,
    /// Foot clusters found by polishing.
    pub clusters: usize,
    /// Facets dropped by classification.
    pub dropped: usize,
}

/// Everything [`ScanSession::finalize`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentationReport {
    /// Reconstruction summary.
    pub reconstruct: ReconstructStats,
    /// Separation summary.
    pub separation: SeparationStats,
    /// Estimated foot frame.
    pub frame: Option<FootFrame>,
    /// Polished foot measured in its frame.
    pub footprint: Option<Footprint>,
}

impl std::fmt::Display for SegmentationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Segmentation:")?;
        writeln!(
            f,
            "  mesh: {} facets over {} points ({} raw)",
            self.reconstruct.facets, self.reconstruct.smoothed_points, self.reconstruct.raw_points
        )?;
        match self.separation.floor {
            Some(band) => writeln!(f, "  floor: {band}")?,
            None => writeln!(f, "  floor: not found")?,
        }
        writeln!(
            f,
            "  facets: {} floor, {} foot, {} polished foot, {} dropped",
            self.separation.floor_facets,
            self.separation.foot_facets,
            self.separation.polished_facets,
            self.separation.dropped
        )?;
        match &self.frame {
            Some(frame) => writeln!(f, "  {frame}")?,
            None => writeln!(f, "  frame: not determined")?,
        }
        match &self.footprint {
            Some(footprint) => write!(f, "  {footprint}"),
            None => write!(f, "  footprint: not measured"),
        }
    }
}

/// One scanning session, from the first chunk to the segmented mesh.
///
/// # Example
///
/// ```
/// use foot_scan::{Phase, ScanConfig, ScanError, ScanSession};
/// use nalgebra::Point3;
///
/// let mut session = ScanSession::new(ScanConfig::fast()).unwrap();
///
/// // A 20-sample chunk is below the minimum and changes nothing.
/// let report = session.ingest(&vec![Point3::new(0.1, -0.5, 0.1); 20]).unwrap();
/// assert!(report.skipped);
///
/// session.reconstruct();
/// assert_eq!(session.phase(), Phase::Segmenting);
/// assert!(matches!(session.ingest(&[]), Err(ScanError::IngestClosed)));
///
/// session.resume_accumulating();
/// assert!(session.ingest(&[]).is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ScanSession {
    config: ScanConfig,
    phase: Phase,
    ingestor: PointIngestor,
    smoothed: PointCloud,
    facets: FacetCollection,
    floor: Option<Interval>,
    frame: Option<FootFrame>,
}

impl ScanSession {
    /// Starts an empty session.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidParameter`] if `config` is invalid.
    pub fn new(config: ScanConfig) -> ScanResult<Self> {
        config.validate()?;
        Ok(Self {
            ingestor: PointIngestor::new(config.ingest.clone()),
            config,
            phase: Phase::Accumulating,
            smoothed: PointCloud::new(),
            facets: FacetCollection::new(),
            floor: None,
            frame: None,
        })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Adds one captured chunk to the raw point set.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::IngestClosed`] once reconstruction has started.
    pub fn ingest(&mut self, chunk: &[Point3<f64>]) -> ScanResult<IngestReport> {
        if self.phase != Phase::Accumulating {
            debug!(samples = chunk.len(), "chunk refused, ingestion closed");
            return Err(ScanError::IngestClosed);
        }
        Ok(self.ingestor.ingest(chunk))
    }

    /// Reopens ingestion. Existing results stay until the next reconstruct.
    pub fn resume_accumulating(&mut self) {
        if self.phase != Phase::Accumulating {
            debug!("ingestion reopened");
        }
        self.phase = Phase::Accumulating;
    }

    /// Rebuilds the smoothed point set and its unclassified facets.
    ///
    /// Closes ingestion. Floor, foot and polished facets, the floor band and
    /// the frame are all cleared.
    pub fn reconstruct(&mut self) -> ReconstructStats {
        self.phase = Phase::Segmenting;

        let raw = self.ingestor.points();
        let result = reconstruct(raw, &self.config.reconstruct);
        let stats = ReconstructStats {
            raw_points: raw.len(),
            smoothed_points: result.points.len(),
            facets: result.facets.len(),
            components: result.components,
            orphan_points: result.orphan_points,
        };

        self.smoothed = result.points;
        self.facets.clear();
        self.facets.replace(FacetKind::Undefined, result.facets);
        self.floor = None;
        self.frame = None;

        stats
    }

    /// Finds the floor, then classifies and polishes the current facets.
    ///
    /// Replaces the floor, foot and polished facets and the floor band, and
    /// clears the frame. With no floor candidates the derived kinds stay
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidParameter`] if the floor parameters are
    /// invalid.
    pub fn separate(&mut self) -> ScanResult<SeparationStats> {
        self.run_separation(None)
    }

    /// Same as [`ScanSession::separate`], stopping early once `cancel` is set.
    ///
    /// On cancellation the derived kinds and the floor band are left empty.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Cancelled`] if cancelled, or
    /// [`ScanError::InvalidParameter`] for invalid floor parameters.
    pub fn separate_with_cancel(&mut self, cancel: &AtomicBool) -> ScanResult<SeparationStats> {
        self.run_separation(Some(cancel))
    }

    fn run_separation(&mut self, cancel: Option<&AtomicBool>) -> ScanResult<SeparationStats> {
        let start = Instant::now();
        self.facets.clear_derived();
        self.floor = None;
        self.frame = None;

        let points = self.smoothed.positions();
        let undefined = self.facets.get(FacetKind::Undefined);

        let heights = facet_heights(points, undefined);
        let candidates = steep_candidates(points, undefined, self.config.floor.steepness);
        let search = search_floor(&candidates, &heights, &self.config.floor)?;

        if search.candidates.is_empty() {
            info!(
                facets = undefined.len(),
                candidates = candidates.len(),
                "no floor found, facets left unclassified"
            );
            return Ok(SeparationStats::default());
        }

        let classification =
            classify_facets(points, undefined, search.interval, &self.config.classify);
        let polish = match cancel {
            Some(flag) => polish_foot_with_cancel(&classification.foot, flag)?,
            None => polish_foot(&classification.foot),
        };

        let stats = SeparationStats {
            floor: Some(search.interval),
            floor_facets: classification.floor.len(),
            foot_facets: classification.foot.len(),
            polished_facets: polish.polished.len(),
            clusters: polish.cluster_count,
            dropped: classification.oversized
                + classification.below_floor
                + classification.ambiguous,
        };

        self.facets.replace(FacetKind::Floor, classification.floor);
        self.facets.replace(FacetKind::Foot, classification.foot);
        self.facets.replace(FacetKind::PolishedFoot, polish.polished);
        self.floor = Some(search.interval);

        info!(
            floor_center = search.interval.center(),
            floor = stats.floor_facets,
            foot = stats.foot_facets,
            polished = stats.polished_facets,
            clusters = stats.clusters,
            dropped = stats.dropped,
            elapsed_ms = elapsed_ms(start),
            "separation done"
        );

        Ok(stats)
    }

    /// Recomputes the foot frame from the foot facets and the floor band.
    ///
    /// `None` until [`ScanSession::separate`] has found a floor.
    pub fn find_foot_frame(&mut self) -> Option<FootFrame> {
        self.frame = self.floor.and_then(|band| {
            estimate_foot_frame(
                self.smoothed.positions(),
                self.facets.get(FacetKind::Foot),
                band,
            )
        });
        match &self.frame {
            Some(frame) => info!(%frame, "foot frame found"),
            None => debug!("foot frame not determined"),
        }
        self.frame
    }

    /// Runs reconstruct, separate and find_foot_frame in order.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidParameter`] if the floor parameters are
    /// invalid.
    pub fn finalize(&mut self) -> ScanResult<SegmentationReport> {
        let start = Instant::now();
        let reconstruct = self.reconstruct();
        let separation = self.separate()?;
        let frame = self.find_foot_frame();
        let footprint = self.footprint();

        let report = SegmentationReport {
            reconstruct,
            separation,
            frame,
            footprint,
        };
        info!(
            facets = reconstruct.facets,
            polished = separation.polished_facets,
            has_frame = frame.is_some(),
            elapsed_ms = elapsed_ms(start),
            "scan finalized"
        );
        Ok(report)
    }

    /// Accumulated raw points.
    #[must_use]
    pub fn raw_points(&self) -> &[Point3<f64>] {
        self.ingestor.points()
    }

    /// Smoothed points from the last reconstruct. Facets index this set.
    #[must_use]
    pub fn smoothed_points(&self) -> &[Point3<f64>] {
        self.smoothed.positions()
    }

    /// Unit normals of the smoothed points, if reconstructed.
    #[must_use]
    pub fn smoothed_normals(&self) -> Option<&[Vector3<f64>]> {
        self.smoothed.normals()
    }

    /// Facets of one kind.
    #[must_use]
    pub fn facets(&self, kind: FacetKind) -> &[Facet] {
        self.facets.get(kind)
    }

    /// Floor band from the last separate.
    #[must_use]
    pub const fn floor_interval(&self) -> Option<Interval> {
        self.floor
    }

    /// Floor height, the center of the floor band.
    #[must_use]
    pub fn floor_height(&self) -> Option<f64> {
        self.floor.map(|band| band.center())
    }

    /// Foot frame from the last find_foot_frame.
    #[must_use]
    pub const fn foot_frame(&self) -> Option<FootFrame> {
        self.frame
    }

    /// Length, width and rise of the polished foot in the current frame.
    ///
    /// `None` while there is no frame.
    #[must_use]
    pub fn footprint(&self) -> Option<Footprint> {
        measure_footprint(
            self.smoothed.positions(),
            self.facets.get(FacetKind::PolishedFoot),
            self.frame.as_ref(),
        )
    }

    /// Outlier ratio of recent chunks.
    #[must_use]
    pub const fn ingest_stats(&self) -> &RollingStats {
        self.ingestor.outlier_stats()
    }
}
