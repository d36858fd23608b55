//! Advancing-front triangulation by ball pivoting.
//!
//! A ball of fixed radius is rolled over the point set. Three points the
//! ball touches while empty form a facet; the ball then pivots around each
//! open edge of the front until it touches a new point.
//!
//! The front is a FIFO of directed edges. Each edge remembers the facet it
//! came from (through its opposite vertex) and the ball center that produced
//! it, so the pivot direction is always away from the existing facet.
//!
//! Every choice is made by scanning candidates in a fixed order with explicit
//! tie-breaks; hash maps only answer membership queries. The same input
//! always produces the same facets in the same order.

use std::collections::VecDeque;
use std::f64::consts::TAU;

use foot_types::Facet;
use hashbrown::{HashMap, HashSet};
use nalgebra::{Point3, Vector3};
use tracing::warn;

use crate::pointcloud::PointIndex;

/// Rotation angles closer than this to a full turn count as zero.
///
/// A point lying exactly on the current ball (four cocircular samples on a
/// grid) gives a rotation of 0 or 2π depending on rounding.
const ANGLE_EPSILON: f64 = 1e-6;

/// Relative slack on the empty-ball test, as a fraction of `r²`.
const EMPTY_BALL_TOLERANCE: f64 = 1e-6;

/// Triangles with `sin²` of their smallest angle below this are degenerate.
const DEGENERATE_SIN_SQ: f64 = 1e-12;

/// Output of [`advancing_front`].
#[derive(Debug, Clone, Default)]
pub struct FrontResult {
    /// Facets in creation order.
    pub facets: Vec<Facet>,

    /// Number of seed facets, one per grown component.
    pub seeds: usize,

    /// Points not touched by any facet.
    pub orphan_points: usize,

    /// Edges with exactly one facet.
    pub boundary_edges: usize,

    /// True if the iteration guard stopped the front early.
    pub truncated: bool,
}

/// A directed edge on the front: `a → b` belongs to a facet whose third
/// vertex is `opposite`, and `center` is that facet's ball center.
#[derive(Debug, Clone, Copy)]
struct FrontEdge {
    a: u32,
    b: u32,
    opposite: u32,
    center: Point3<f64>,
}

/// Undirected edge key.
fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Triangulates `points` with a ball of `radius`.
///
/// `normals` (one per point) decide on which side of a seed triangle the
/// ball sits; pass an empty slice to use `+Y` everywhere. Candidate facets
/// with a perimeter above `max_perimeter` are rejected.
#[must_use]
pub fn advancing_front(
    points: &[Point3<f64>],
    normals: &[Vector3<f64>],
    radius: f64,
    max_perimeter: f64,
) -> FrontResult {
    if points.len() < 3 || points.len() > u32::MAX as usize || radius.is_nan() || radius <= 0.0 {
        return FrontResult {
            orphan_points: points.len(),
            ..FrontResult::default()
        };
    }

    let mut front = Front::new(points, normals, radius, max_perimeter);
    front.run();
    front.finish()
}

/// Mutable reconstruction state.
struct Front<'a> {
    points: &'a [Point3<f64>],
    normals: &'a [Vector3<f64>],
    index: PointIndex,
    radius: f64,
    max_perimeter: f64,

    facets: Vec<Facet>,
    facet_keys: HashSet<[u32; 3]>,
    edge_faces: HashMap<(u32, u32), u8>,
    used: Vec<bool>,
    /// Number of one-facet edges incident to each vertex.
    open_edges: Vec<u32>,
    queue: VecDeque<FrontEdge>,
    seed_cursor: usize,
    seeds: usize,
    truncated: bool,
}

impl<'a> Front<'a> {
    fn new(
        points: &'a [Point3<f64>],
        normals: &'a [Vector3<f64>],
        radius: f64,
        max_perimeter: f64,
    ) -> Self {
        Self {
            points,
            normals,
            index: PointIndex::build(points),
            radius,
            max_perimeter,
            facets: Vec::new(),
            facet_keys: HashSet::new(),
            edge_faces: HashMap::new(),
            used: vec![false; points.len()],
            open_edges: vec![0; points.len()],
            queue: VecDeque::new(),
            seed_cursor: 0,
            seeds: 0,
            truncated: false,
        }
    }

    fn point(&self, i: u32) -> Point3<f64> {
        self.points[i as usize]
    }

    fn run(&mut self) {
        let max_pops = self.points.len().saturating_mul(20).saturating_add(100);
        let mut pops = 0usize;

        while let Some((facet, center)) = self.find_seed() {
            self.seeds += 1;
            self.add_facet(facet);
            let [a, b, c] = facet.0;
            for (a, b, opposite) in [(a, b, c), (b, c, a), (c, a, b)] {
                self.queue.push_back(FrontEdge {
                    a,
                    b,
                    opposite,
                    center,
                });
            }

            while let Some(edge) = self.queue.pop_front() {
                pops += 1;
                if pops > max_pops {
                    warn!(max_pops, "advancing front stopped by iteration guard");
                    self.truncated = true;
                    return;
                }
                self.expand(edge);
            }
        }
    }

    fn faces_on(&self, a: u32, b: u32) -> u8 {
        self.edge_faces.get(&edge_key(a, b)).copied().unwrap_or(0)
    }

    fn add_facet(&mut self, facet: Facet) {
        let [a, b, c] = facet.0;
        for (p, q) in [(a, b), (b, c), (c, a)] {
            let count = self.edge_faces.entry(edge_key(p, q)).or_insert(0);
            *count += 1;
            match *count {
                1 => {
                    self.open_edges[p as usize] += 1;
                    self.open_edges[q as usize] += 1;
                }
                2 => {
                    self.open_edges[p as usize] -= 1;
                    self.open_edges[q as usize] -= 1;
                }
                _ => {}
            }
        }
        for v in [a, b, c] {
            self.used[v as usize] = true;
        }
        self.facet_keys.insert(facet.sorted_key());
        self.facets.push(facet);
    }

    /// Pivots the ball around one front edge.
    fn expand(&mut self, edge: FrontEdge) {
        if self.faces_on(edge.a, edge.b) >= 2 {
            return;
        }
        let Some((c, center)) = self.pivot(&edge) else {
            return;
        };

        self.add_facet(Facet::new(edge.b, edge.a, c));
        self.queue.push_back(FrontEdge {
            a: edge.a,
            b: c,
            opposite: edge.b,
            center,
        });
        self.queue.push_back(FrontEdge {
            a: c,
            b: edge.b,
            opposite: edge.a,
            center,
        });
    }

    /// Finds the first point the ball touches when rolled around `edge`.
    fn pivot(&self, edge: &FrontEdge) -> Option<(u32, Point3<f64>)> {
        let pa = self.point(edge.a);
        let pb = self.point(edge.b);
        let mid = Point3::from((pa.coords + pb.coords) * 0.5);
        let axis = (pb - pa).try_normalize(f64::EPSILON)?;

        let start = edge.center - mid;
        let start = start - axis * start.dot(&axis);
        // Roll away from the facet the edge came from.
        let toward_opposite = axis.cross(&start).dot(&(self.point(edge.opposite) - mid));
        let sign = if toward_opposite > 0.0 { -1.0 } else { 1.0 };

        let mut best: Option<(f64, u32, Point3<f64>)> = None;

        for neighbor in self.index.within(&mid, 2.0 * self.radius) {
            #[allow(clippy::cast_possible_truncation)]
            let c = neighbor.index as u32;
            if c == edge.a || c == edge.b || c == edge.opposite {
                continue;
            }
            if !self.accepts_vertex(c, edge.a, edge.b) {
                continue;
            }

            // The new facet is wound `b, a, c` like its neighbor; only the
            // center on its normal side keeps the ball over the surface.
            let pc = self.point(c);
            let Some([center, _]) = ball_centers(&pb, &pa, &pc, self.radius) else {
                continue;
            };

            let offset = center - mid;
            let offset = offset - axis * offset.dot(&axis);
            let angle = rotation_angle(&start, &offset, &axis, sign);

            let better = best.map_or(true, |(best_angle, best_c, _)| {
                (angle, c) < (best_angle, best_c)
            });
            if better && self.is_empty_ball(&center, [edge.a, edge.b, c]) {
                best = Some((angle, c, center));
            }
        }

        best.map(|(_, c, center)| (c, center))
    }

    /// Topological and size checks for a candidate third vertex.
    fn accepts_vertex(&self, c: u32, a: u32, b: u32) -> bool {
        // Interior vertices are closed.
        if self.used[c as usize] && self.open_edges[c as usize] == 0 {
            return false;
        }
        if self.faces_on(a, c) >= 2 || self.faces_on(c, b) >= 2 {
            return false;
        }
        if self.facet_keys.contains(&Facet::new(a, b, c).sorted_key()) {
            return false;
        }
        perimeter(&self.point(a), &self.point(b), &self.point(c)) <= self.max_perimeter
    }

    fn is_empty_ball(&self, center: &Point3<f64>, exclude: [u32; 3]) -> bool {
        let limit = self.radius * self.radius * (1.0 - EMPTY_BALL_TOLERANCE);
        self.index.within(center, self.radius).iter().all(|n| {
            #[allow(clippy::cast_possible_truncation)]
            let i = n.index as u32;
            exclude.contains(&i) || (self.points[n.index] - center).norm_squared() >= limit
        })
    }

    /// Searches unused points, in order, for a seed facet.
    fn find_seed(&mut self) -> Option<(Facet, Point3<f64>)> {
        while self.seed_cursor < self.points.len() {
            let i = self.seed_cursor;
            self.seed_cursor += 1;
            if self.used[i] {
                continue;
            }
            if let Some(seed) = self.seed_at(i) {
                return Some(seed);
            }
        }
        None
    }

    fn seed_at(&self, i: usize) -> Option<(Facet, Point3<f64>)> {
        let p = self.points[i];
        let up = self.normals.get(i).copied().unwrap_or_else(Vector3::y);

        let mut neighbors: Vec<(f64, usize)> = self
            .index
            .within(&p, 2.0 * self.radius)
            .into_iter()
            .filter(|n| n.index != i && !self.used[n.index])
            .map(|n| ((self.points[n.index] - p).norm_squared(), n.index))
            .collect();
        neighbors.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));

        #[allow(clippy::cast_possible_truncation)]
        let vi = i as u32;

        for (n, &(_, j)) in neighbors.iter().enumerate() {
            for &(_, k) in &neighbors[n + 1..] {
                #[allow(clippy::cast_possible_truncation)]
                let (vj, vk) = (j as u32, k as u32);
                let (pj, pk) = (self.points[j], self.points[k]);
                if perimeter(&p, &pj, &pk) > self.max_perimeter {
                    continue;
                }
                let Some([above, below]) = ball_centers(&p, &pj, &pk, self.radius) else {
                    continue;
                };

                // Wind the facet so its right-hand normal faces the ball.
                let (center, facet) = if (above - below).dot(&up) >= 0.0 {
                    (above, Facet::new(vi, vj, vk))
                } else {
                    (below, Facet::new(vi, vk, vj))
                };

                if self.is_empty_ball(&center, [vi, vj, vk]) {
                    return Some((facet, center));
                }
            }
        }
        None
    }

    fn finish(self) -> FrontResult {
        let used = self.used.iter().filter(|&&u| u).count();
        let boundary_edges = self.edge_faces.values().filter(|&&n| n == 1).count();
        FrontResult {
            facets: self.facets,
            seeds: self.seeds,
            orphan_points: self.points.len() - used,
            boundary_edges,
            truncated: self.truncated,
        }
    }
}

/// Rotation from `from` to `to` around `axis`, in `[0, 2π)`, measured in
/// the direction given by `sign`.
fn rotation_angle(from: &Vector3<f64>, to: &Vector3<f64>, axis: &Vector3<f64>, sign: f64) -> f64 {
    let sin = sign * from.cross(to).dot(axis);
    let cos = from.dot(to);
    let mut angle = sin.atan2(cos);
    if angle < 0.0 {
        angle += TAU;
    }
    if angle > TAU - ANGLE_EPSILON {
        angle = 0.0;
    }
    angle
}

fn perimeter(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    (b - a).norm() + (c - b).norm() + (a - c).norm()
}

/// Centers of the two balls of `radius` through three points.
///
/// The first center lies on the side of `(p1 - p0) × (p2 - p0)`, the second
/// on the opposite side. `None` if the triangle is degenerate or its
/// circumradius exceeds `radius`.
pub fn ball_centers(
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    radius: f64,
) -> Option<[Point3<f64>; 2]> {
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    let n = e1.cross(&e2);
    let n_sq = n.norm_squared();

    let e1_sq = e1.norm_squared();
    let e2_sq = e2.norm_squared();
    if n_sq <= e1_sq * e2_sq * DEGENERATE_SIN_SQ || n_sq == 0.0 {
        return None;
    }

    let offset = (e2.cross(&n) * e1_sq + n.cross(&e1) * e2_sq) / (2.0 * n_sq);
    let circumcenter = p0 + offset;

    let h_sq = radius * radius - offset.norm_squared();
    if h_sq < 0.0 {
        return None;
    }
    let lift = n / n_sq.sqrt() * h_sq.sqrt();

    Some([circumcenter + lift, circumcenter - lift])
}
