//! Facets grouped by classification.

use crate::Facet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Classification of a facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FacetKind {
    /// Reconstructed but not yet classified.
    Undefined,
    /// Belongs to the floor band.
    Floor,
    /// Belongs to the foot.
    Foot,
    /// Foot facet that survived cluster pruning.
    PolishedFoot,
}

impl FacetKind {
    /// All kinds, in pipeline order.
    pub const ALL: [Self; 4] = [Self::Undefined, Self::Floor, Self::Foot, Self::PolishedFoot];

    /// Kinds produced by classification, as opposed to reconstruction.
    #[must_use]
    pub const fn is_derived(self) -> bool {
        !matches!(self, Self::Undefined)
    }

    const fn slot(self) -> usize {
        match self {
            Self::Undefined => 0,
            Self::Floor => 1,
            Self::Foot => 2,
            Self::PolishedFoot => 3,
        }
    }
}

impl std::fmt::Display for FacetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Undefined => "undefined",
            Self::Floor => "floor",
            Self::Foot => "foot",
            Self::PolishedFoot => "polished foot",
        };
        f.write_str(name)
    }
}

/// One facet list per [`FacetKind`].
///
/// # Example
///
/// ```
/// use foot_types::{Facet, FacetCollection, FacetKind};
///
/// let mut facets = FacetCollection::new();
/// facets.replace(FacetKind::Undefined, vec![Facet::new(0, 1, 2)]);
/// facets.replace(FacetKind::Floor, vec![Facet::new(0, 1, 2)]);
///
/// facets.clear_derived();
/// assert_eq!(facets.len(FacetKind::Undefined), 1);
/// assert!(facets.get(FacetKind::Floor).is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FacetCollection {
    lists: [Vec<Facet>; 4],
}

impl FacetCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Facets of one kind.
    #[must_use]
    pub fn get(&self, kind: FacetKind) -> &[Facet] {
        &self.lists[kind.slot()]
    }

    /// Number of facets of one kind.
    #[must_use]
    pub fn len(&self, kind: FacetKind) -> usize {
        self.lists[kind.slot()].len()
    }

    /// Returns true if no kind holds any facet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(Vec::is_empty)
    }

    /// Replace the facets of one kind, returning the previous list.
    pub fn replace(&mut self, kind: FacetKind, facets: Vec<Facet>) -> Vec<Facet> {
        std::mem::replace(&mut self.lists[kind.slot()], facets)
    }

    /// Drop every classified kind, keeping [`FacetKind::Undefined`].
    pub fn clear_derived(&mut self) {
        for kind in FacetKind::ALL.into_iter().filter(|k| k.is_derived()) {
            self.lists[kind.slot()].clear();
        }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.lists.iter_mut().for_each(Vec::clear);
    }
}
