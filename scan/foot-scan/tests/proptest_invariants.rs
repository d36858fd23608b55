//! Property-based tests for the segmentation stages.
//!
//! These tests use proptest to generate random heights, facets and point
//! sets and check the invariants every stage must keep.
//!
//! Run with: cargo test -p foot-scan -- proptest

#![allow(clippy::unwrap_used, clippy::cast_possible_truncation)]

use foot_scan::floor::{search_floor, FloorParams};
use foot_scan::pointcloud::grid_keep_mask;
use foot_scan::{classify_facets, polish_foot, write_facet_indices, ClassifyParams};
use foot_types::{Facet, Interval};
use hashbrown::HashSet;
use nalgebra::Point3;
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Heights clustered around a floor plus a scattering of others.
fn arb_heights() -> impl Strategy<Value = Vec<f64>> {
    (
        -1.9..-0.1f64,
        prop::collection::vec(-0.004..0.004f64, 0..200),
        prop::collection::vec(-2.5..0.5f64, 0..60),
    )
        .prop_map(|(floor, offsets, stray)| {
            offsets
                .into_iter()
                .map(|o| floor + o)
                .chain(stray)
                .collect()
        })
}

fn arb_point() -> impl Strategy<Value = Point3<f64>> {
    prop::array::uniform3(-0.05..0.05f64).prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// Points plus facets that index them.
fn arb_mesh(max_points: usize, max_facets: usize) -> impl Strategy<Value = (Vec<Point3<f64>>, Vec<Facet>)> {
    prop::collection::vec(arb_point(), 3..max_points).prop_flat_map(move |points| {
        let n = points.len() as u32;
        let facets = prop::collection::vec(
            prop::array::uniform3(0..n).prop_map(Facet::from),
            0..max_facets,
        );
        (Just(points), facets)
    })
}

/// Facets over a small vertex range so clusters actually form.
fn arb_foot() -> impl Strategy<Value = Vec<Facet>> {
    prop::collection::vec(prop::array::uniform3(0..40u32).prop_map(Facet::from), 0..80)
}

fn vertex_set(facets: &[Facet]) -> HashSet<u32> {
    facets.iter().flat_map(Facet::indices).collect()
}

// =============================================================================
// Property Tests: Floor search
// =============================================================================

proptest! {
    /// The floor band always keeps `low <= center <= high` and never exceeds
    /// the maximum thickness.
    #[test]
    fn proptest_floor_interval_invariant(heights in arb_heights()) {
        let params = FloorParams::default();
        let candidates: Vec<usize> = (0..heights.len()).collect();
        let result = search_floor(&candidates, &heights, &params).unwrap();
        let band = result.interval;

        prop_assert!(band.low() <= band.center());
        prop_assert!(band.center() <= band.high());
        prop_assert!(band.width() <= params.max_floor_thickness + 1e-12);
        for &i in &result.candidates {
            prop_assert!(band.contains(heights[i]));
        }
    }

    /// Survivors are a subset of the candidates, in order.
    #[test]
    fn proptest_floor_survivors_are_candidates(heights in arb_heights()) {
        let candidates: Vec<usize> = (0..heights.len()).step_by(2).collect();
        let result = search_floor(&candidates, &heights, &FloorParams::default()).unwrap();
        let mut last = None;
        for &i in &result.candidates {
            prop_assert!(i % 2 == 0);
            if let Some(l) = last {
                prop_assert!(l < i);
            }
            last = Some(i);
        }
    }
}

// =============================================================================
// Property Tests: Classification
// =============================================================================

proptest! {
    /// Every facet is counted exactly once and floor/foot never share one.
    #[test]
    fn proptest_classification_partition((points, facets) in arb_mesh(40, 120)) {
        let band = Interval::new(-0.01, 0.0, 0.01).unwrap();
        let result = classify_facets(&points, &facets, band, &ClassifyParams::default());

        prop_assert_eq!(result.total(), facets.len());

        let floor: Vec<usize> = facets
            .iter()
            .enumerate()
            .filter(|(_, f)| result.floor.contains(f))
            .map(|(i, _)| i)
            .collect();
        for i in floor {
            prop_assert!(!result.foot.contains(&facets[i]));
        }
    }

    /// Floor facets lie inside the band, foot facets never below it.
    #[test]
    fn proptest_classification_heights((points, facets) in arb_mesh(40, 120)) {
        let band = Interval::new(-0.02, -0.005, 0.01).unwrap();
        let result = classify_facets(&points, &facets, band, &ClassifyParams::default());

        for f in &result.floor {
            let g = f.geometry(&points).unwrap();
            prop_assert!(band.contains(g.height()));
            prop_assert!(g.vertical_alignment() > 0.9);
        }
        for f in &result.foot {
            let g = f.geometry(&points).unwrap();
            prop_assert!(g.height() >= band.low());
            prop_assert!(g.perimeter <= 0.03);
        }
    }
}

// =============================================================================
// Property Tests: Polishing
// =============================================================================

proptest! {
    /// The kept cluster is a subset of the input, in input order, and no
    /// other cluster has more vertices.
    #[test]
    fn proptest_polish_dominance(foot in arb_foot()) {
        let result = polish_foot(&foot);

        // Subset, in order.
        let mut cursor = foot.iter();
        for kept in &result.polished {
            prop_assert!(cursor.any(|f| f == kept));
        }
        prop_assert_eq!(result.kept_vertices, vertex_set(&result.polished).len());

        // Removing the kept cluster and polishing the rest can never give a
        // larger cluster.
        let kept: HashSet<usize> = {
            let mut taken = HashSet::new();
            let mut cursor = 0;
            for p in &result.polished {
                while foot[cursor] != *p {
                    cursor += 1;
                }
                taken.insert(cursor);
                cursor += 1;
            }
            taken
        };
        let rest: Vec<Facet> = foot
            .iter()
            .enumerate()
            .filter(|(i, _)| !kept.contains(i))
            .map(|(_, f)| *f)
            .collect();
        let runner_up = polish_foot(&rest);
        prop_assert!(runner_up.kept_vertices <= result.kept_vertices);

        if foot.is_empty() {
            prop_assert_eq!(result.cluster_count, 0);
        } else {
            prop_assert!(result.cluster_count >= 1);
            prop_assert!(!result.polished.is_empty());
        }
    }
}

// =============================================================================
// Property Tests: Grid simplification and output
// =============================================================================

proptest! {
    /// Kept points occupy distinct cells, and every dropped point shares a
    /// cell with an earlier kept one.
    #[test]
    fn proptest_grid_keeps_one_per_cell(points in prop::collection::vec(arb_point(), 0..300)) {
        let cell = 0.01;
        let inv = 1.0 / cell;
        let key = |p: &Point3<f64>| {
            [
                (p.x * inv).floor() as i64,
                (p.y * inv).floor() as i64,
                (p.z * inv).floor() as i64,
            ]
        };

        let mask = grid_keep_mask(&points, cell);
        prop_assert_eq!(mask.len(), points.len());

        let mut seen = HashSet::new();
        for (p, keep) in points.iter().zip(&mask) {
            let fresh = seen.insert(key(p));
            prop_assert_eq!(fresh, *keep);
        }
    }

    /// The index writer never writes past the buffer or splits a facet.
    #[test]
    fn proptest_facet_writer_capacity(foot in arb_foot(), capacity in 0..300usize) {
        let mut out = vec![u32::MAX; capacity];
        let report = write_facet_indices(&foot, &mut out);

        prop_assert_eq!(report.natural, foot.len() * 3);
        prop_assert!(report.written <= capacity);
        prop_assert_eq!(report.written % 3, 0);
        prop_assert_eq!(report.written, (capacity / 3).min(foot.len()) * 3);
        prop_assert!(out[report.written..].iter().all(|&v| v == u32::MAX));
    }
}
