//! Core data types for foot scan segmentation.
//!
//! This crate provides the value types shared by the scan pipeline:
//!
//! - [`Facet`] - A triangle stored as three indices into a point array
//! - [`FacetGeometry`] - Center, normal and perimeter of one facet
//! - [`FacetKind`] / [`FacetCollection`] - Facets grouped by classification
//! - [`Interval`] - A `low <= center <= high` height band
//! - [`FootFrame`] - Origin and horizontal axes of a scanned foot
//!
//! # Layer 0 Crate
//!
//! No rendering or sensor dependencies. Everything here is plain data plus
//! small geometric helpers.
//!
//! # Units
//!
//! Coordinates are metres, stored as `f64`.
//!
//! # Coordinate System
//!
//! Gravity-aligned, right-handed:
//! - Y: height (up/down)
//! - X, Z: the floor plane
//!
//! Facet winding comes from reconstruction and is not trusted for
//! classification; only the absolute vertical component of a normal is used.
//!
//! # Example
//!
//! ```
//! use foot_types::{Facet, FacetCollection, FacetKind, Interval, Point3};
//!
//! let points = vec![
//!     Point3::new(0.0, 0.001, 0.0),
//!     Point3::new(0.0, 0.001, 0.004),
//!     Point3::new(0.004, 0.001, 0.0),
//! ];
//! let mut facets = FacetCollection::new();
//! facets.replace(FacetKind::Undefined, vec![Facet::new(0, 1, 2)]);
//!
//! let band = Interval::new(-0.01, 0.0, 0.01).unwrap();
//! let geometry = facets.get(FacetKind::Undefined)[0].geometry(&points).unwrap();
//! assert!(band.contains(geometry.height()));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod collection;
mod facet;
mod frame;
mod interval;

pub use collection::{FacetCollection, FacetKind};
pub use facet::{Facet, FacetGeometry};
pub use frame::FootFrame;
pub use interval::Interval;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
