//! Foot scan segmentation.
//!
//! This crate turns a live stream of noisy depth samples of a foot standing
//! on a floor into a classified triangle mesh:
//!
//! - **Ingestion** - Drop invalid samples, remove outliers, grid-simplify
//! - **Reconstruction** - Jet smoothing and advancing-front triangulation
//! - **Floor search** - Two-phase search for the floor height band
//! - **Classification** - Split facets into floor and foot
//! - **Polishing** - Keep the dominant connected piece of the foot
//! - **Frame** - Origin and long axis of the foot on the floor
//! - **Measurement** - Length, width and rise of the foot in that frame
//!
//! # Layer 0
//!
//! No rendering, sensor or UI dependencies. Hosts push sample chunks in and
//! copy results out through [`output`].
//!
//! # Coordinates
//!
//! Metres, gravity-aligned, +Y up. The floor lies in the X/Z plane.
//!
//! # Quick Start
//!
//! ```
//! use foot_scan::{FacetKind, ScanConfig, ScanSession};
//! use nalgebra::Point3;
//!
//! let mut session = ScanSession::new(ScanConfig::fast()).unwrap();
//!
//! // Feed a 4.5 cm square of floor, one chunk at a time.
//! for row in 0..3u32 {
//!     let chunk: Vec<_> = (0..75u32)
//!         .map(|i| {
//!             let k = f64::from(i + row * 75);
//!             Point3::new(
//!                 f64::from(i % 15) * 0.003 + (k * 0.37).sin() * 1e-4,
//!                 -0.7 + (k * 0.71).sin() * 1e-4,
//!                 f64::from(i / 15 + row * 5) * 0.003 + (k * 0.53).cos() * 1e-4,
//!             )
//!         })
//!         .collect();
//!     session.ingest(&chunk).unwrap();
//! }
//!
//! let report = session.finalize().unwrap();
//! println!("{report}");
//!
//! let floor = session.floor_height().unwrap();
//! assert!((floor + 0.7).abs() < 0.02);
//! assert!(!session.facets(FacetKind::Floor).is_empty());
//! ```
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`pipeline`] | [`ScanSession`]: phase gate, stage order, queries |
//! | [`config`] | [`ScanConfig`] presets and validation |
//! | [`ingest`] | Per-chunk filtering, outlier removal, simplification |
//! | [`pointcloud`] | Point storage, grid simplification, k-d tree queries |
//! | [`smooth`] | Jet smoothing |
//! | [`reconstruct`] | Advancing-front surface reconstruction |
//! | [`floor`] | Floor height band search |
//! | [`classify`] | Floor/foot facet classification |
//! | [`polish`] | Dominant foot cluster selection |
//! | [`frame`] | Foot coordinate frame |
//! | [`measure`] | Footprint length, width and rise |
//! | [`output`] | Capacity-checked copies into host buffers |
//! | [`error`] | Error types |
//!
//! # Logging
//!
//! Every stage reports through [`tracing`] with structured fields and its
//! elapsed time. No subscriber is installed here; the host chooses one.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_const_for_fn)] // Not all functions benefit from const
#![allow(clippy::suboptimal_flops)] // Plain arithmetic reads closer to the formulas

pub mod classify;
pub mod config;
pub mod error;
pub mod floor;
pub mod frame;
pub mod ingest;
pub mod measure;
pub mod output;
pub mod pipeline;
pub mod pointcloud;
pub mod polish;
pub mod reconstruct;
pub mod smooth;

use std::time::Instant;

// Re-export main types at crate root for convenience
pub use classify::{classify_facets, Classification, ClassifyParams};
pub use config::ScanConfig;
pub use error::{ScanError, ScanResult};
pub use floor::{search_floor, FloorParams, FloorSearch, FloorSearcher};
pub use frame::estimate_foot_frame;
pub use ingest::{IngestParams, IngestReport, PointIngestor};
pub use measure::{measure_footprint, Footprint};
pub use output::{write_facet_indices, write_points, WriteReport};
pub use pipeline::{Phase, ReconstructStats, ScanSession, SegmentationReport, SeparationStats};
pub use pointcloud::{PointCloud, PointIndex};
pub use polish::{polish_foot, polish_foot_with_cancel, PolishResult};
pub use reconstruct::{reconstruct, ReconstructParams, Reconstruction};

pub use foot_types::{Facet, FacetCollection, FacetKind, FootFrame, Interval};

/// Milliseconds since `start`, for log fields.
pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
