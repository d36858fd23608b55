//! Foot mesh polishing: keep the dominant cluster of foot facets.
//!
//! Facets are clustered online. A facet joins every cluster it shares at
//! least two vertices with (an edge, or a vertex pair across a thin gap);
//! if it joins more than one, those clusters merge. A facet that shares at
//! most one vertex with every cluster starts a new one.
//!
//! Once every facet is placed, the cluster with the most distinct vertices
//! wins. Ties go to the cluster created first. The winner's facets, in input
//! order, are the polished foot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use foot_types::Facet;
use hashbrown::{HashMap, HashSet};
use tracing::{debug, info};

use crate::elapsed_ms;
use crate::error::{ScanError, ScanResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Output of [`polish_foot`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PolishResult {
    /// Facets of the dominant cluster, in input order.
    pub polished: Vec<Facet>,
    /// Clusters found.
    pub cluster_count: usize,
    /// Distinct vertices of the kept cluster.
    pub kept_vertices: usize,
}

impl PolishResult {
    /// Facets dropped with the smaller clusters.
    #[must_use]
    pub fn removed(&self, input: usize) -> usize {
        input.saturating_sub(self.polished.len())
    }
}

impl std::fmt::Display for PolishResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Polish: kept {} facets ({} vertices) of {} clusters",
            self.polished.len(),
            self.kept_vertices,
            self.cluster_count
        )
    }
}

/// Keeps the largest cluster of `foot` facets.
///
/// # Example
///
/// ```
/// use foot_scan::polish::polish_foot;
/// use foot_types::Facet;
///
/// let foot = vec![
///     Facet::new(0, 1, 2),
///     Facet::new(1, 3, 2),
///     Facet::new(10, 11, 12), // stray island
/// ];
/// let result = polish_foot(&foot);
/// assert_eq!(result.cluster_count, 2);
/// assert_eq!(result.polished, foot[..2].to_vec());
/// ```
#[must_use]
pub fn polish_foot(foot: &[Facet]) -> PolishResult {
    let start = Instant::now();
    let mut clusters = Clustering::with_capacity(foot.len());
    for (i, facet) in foot.iter().enumerate() {
        clusters.push(i, facet);
    }
    clusters.finish(foot, start)
}

/// Same as [`polish_foot`], checking `cancel` before each facet.
///
/// # Errors
///
/// Returns [`ScanError::Cancelled`] once `cancel` is set.
pub fn polish_foot_with_cancel(foot: &[Facet], cancel: &AtomicBool) -> ScanResult<PolishResult> {
    let start = Instant::now();
    let mut clusters = Clustering::with_capacity(foot.len());
    for (i, facet) in foot.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            debug!(placed = i, total = foot.len(), "polishing cancelled");
            return Err(ScanError::Cancelled);
        }
        clusters.push(i, facet);
    }
    Ok(clusters.finish(foot, start))
}

/// One cluster. Only meaningful while it is its own root.
#[derive(Debug, Default)]
struct Cluster {
    vertices: HashSet<u32>,
    facets: Vec<usize>,
}

/// Union-find over clusters plus a vertex to cluster index.
///
/// Roots are always the smallest id of a merged group, so a root's id is its
/// creation order.
#[derive(Debug, Default)]
struct Clustering {
    parent: Vec<usize>,
    clusters: Vec<Cluster>,
    by_vertex: HashMap<u32, Vec<usize>>,
}

impl Clustering {
    fn with_capacity(facets: usize) -> Self {
        Self {
            parent: Vec::with_capacity(facets),
            clusters: Vec::with_capacity(facets),
            by_vertex: HashMap::with_capacity(facets),
        }
    }

    fn find(&mut self, mut id: usize) -> usize {
        let mut root = id;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        while self.parent[id] != root {
            let next = self.parent[id];
            self.parent[id] = root;
            id = next;
        }
        root
    }

    /// Roots touching each distinct vertex of `facet`, with how many of the
    /// facet's vertices each one holds.
    fn shared_counts(&mut self, vertices: &[u32]) -> Vec<(usize, usize)> {
        let mut counts: Vec<(usize, usize)> = Vec::new();
        for v in vertices {
            let ids = self.by_vertex.get(v).cloned().unwrap_or_default();
            let mut roots: Vec<usize> = ids.into_iter().map(|id| self.find(id)).collect();
            roots.sort_unstable();
            roots.dedup();
            for root in roots {
                match counts.iter_mut().find(|(r, _)| *r == root) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((root, 1)),
                }
            }
        }
        counts
    }

    fn push(&mut self, index: usize, facet: &Facet) {
        let mut vertices = facet.indices().to_vec();
        vertices.sort_unstable();
        vertices.dedup();

        let mut joined: Vec<usize> = self
            .shared_counts(&vertices)
            .into_iter()
            .filter(|&(_, n)| n >= 2)
            .map(|(root, _)| root)
            .collect();
        joined.sort_unstable();

        let target = if let Some((&first, rest)) = joined.split_first() {
            for &other in rest {
                self.merge(first, other);
            }
            first
        } else {
            let id = self.clusters.len();
            self.parent.push(id);
            self.clusters.push(Cluster::default());
            id
        };

        let cluster = &mut self.clusters[target];
        cluster.facets.push(index);
        for &v in &vertices {
            if cluster.vertices.insert(v) {
                self.by_vertex.entry(v).or_default().push(target);
            }
        }
    }

    /// Merges root `other` into root `into`, where `into < other`.
    fn merge(&mut self, into: usize, other: usize) {
        let mut taken = std::mem::take(&mut self.clusters[other]);
        let kept = &mut self.clusters[into];
        if taken.vertices.len() > kept.vertices.len() {
            std::mem::swap(&mut taken.vertices, &mut kept.vertices);
        }
        kept.vertices.extend(taken.vertices);
        kept.facets.append(&mut taken.facets);
        self.parent[other] = into;
    }

    fn finish(mut self, foot: &[Facet], start: Instant) -> PolishResult {
        let roots: Vec<usize> = (0..self.parent.len())
            .filter(|&id| self.parent[id] == id)
            .collect();

        // Most vertices, then earliest created.
        let best = roots.iter().copied().max_by(|&a, &b| {
            self.clusters[a]
                .vertices
                .len()
                .cmp(&self.clusters[b].vertices.len())
                .then(b.cmp(&a))
        });

        let (polished, kept_vertices) = match best {
            Some(root) => {
                let cluster = &mut self.clusters[root];
                cluster.facets.sort_unstable();
                (
                    cluster.facets.iter().map(|&i| foot[i]).collect(),
                    cluster.vertices.len(),
                )
            }
            None => (Vec::new(), 0),
        };

        let result = PolishResult {
            polished,
            cluster_count: roots.len(),
            kept_vertices,
        };

        info!(
            foot = foot.len(),
            kept = result.polished.len(),
            clusters = result.cluster_count,
            kept_vertices = result.kept_vertices,
            elapsed_ms = elapsed_ms(start),
            "foot polishing done"
        );

        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// A strip of `n` facets sharing edges, starting at vertex `base`.
    fn strip(base: u32, n: u32) -> Vec<Facet> {
        (0..n).map(|i| Facet::new(base + i, base + i + 1, base + i + 2)).collect()
    }

    #[test]
    fn test_empty() {
        let result = polish_foot(&[]);
        assert_eq!(result, PolishResult::default());
    }

    #[test]
    fn test_keeps_larger_island() {
        let mut foot = strip(100, 2);
        foot.extend(strip(0, 5));
        let result = polish_foot(&foot);
        assert_eq!(result.cluster_count, 2);
        assert_eq!(result.polished, strip(0, 5));
        assert_eq!(result.kept_vertices, 7);
        assert_eq!(result.removed(foot.len()), 2);
    }

    #[test]
    fn test_single_shared_vertex_does_not_join() {
        let foot = vec![Facet::new(0, 1, 2), Facet::new(2, 3, 4), Facet::new(4, 5, 6)];
        let result = polish_foot(&foot);
        assert_eq!(result.cluster_count, 3);
        // All tie at 3 vertices; the first cluster wins.
        assert_eq!(result.polished, vec![foot[0]]);
    }

    #[test]
    fn test_bridge_merges_clusters() {
        // Two islands, then a chain of facets that reaches across.
        let foot = vec![
            Facet::new(0, 1, 2),
            Facet::new(10, 11, 12),
            Facet::new(1, 2, 10),  // joins the first only (shares 1, 2)
            Facet::new(2, 10, 11), // shares 2, 10 with the first and 10, 11 with the second
        ];
        let result = polish_foot(&foot);
        assert_eq!(result.cluster_count, 1);
        assert_eq!(result.polished, foot);
        assert_eq!(result.kept_vertices, 6);
    }

    #[test]
    fn test_output_keeps_input_order() {
        let foot = vec![
            Facet::new(5, 6, 7),
            Facet::new(0, 1, 2),
            Facet::new(6, 7, 8),
            Facet::new(1, 2, 3),
            Facet::new(7, 8, 9),
        ];
        let result = polish_foot(&foot);
        assert_eq!(result.polished, vec![foot[0], foot[2], foot[4]]);
    }

    #[test]
    fn test_cancel() {
        let foot = strip(0, 10);
        let cancel = AtomicBool::new(true);
        assert!(matches!(
            polish_foot_with_cancel(&foot, &cancel),
            Err(ScanError::Cancelled)
        ));

        cancel.store(false, Ordering::Relaxed);
        let result = polish_foot_with_cancel(&foot, &cancel).unwrap();
        assert_eq!(result, polish_foot(&foot));
    }

    #[test]
    fn test_display() {
        let result = polish_foot(&strip(0, 3));
        assert!(result.to_string().contains("kept 3 facets"));
    }
}
