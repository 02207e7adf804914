//! Hyperedge consolidation across views

use std::collections::BTreeSet;
use crate::hypergraph::Hyperedge;

/// Merge candidate hyperedges from all views into one canonical set.
///
/// Exact set-membership dedup: two hyperedges are identical iff their member
/// sets are identical, regardless of the view that produced them. The result
/// is independent of input order, and consolidating an already-consolidated
/// collection is a no-op. An empty input yields an empty set, never an error.
pub fn consolidate<I, C>(views: I) -> BTreeSet<Hyperedge>
where
    I: IntoIterator<Item = C>,
    C: IntoIterator<Item = Hyperedge>,
{
    views.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(members: &[u32]) -> Hyperedge {
        Hyperedge::new(members.iter().copied()).unwrap()
    }

    #[test]
    fn duplicates_across_views_collapse() {
        let view_a = vec![edge(&[1, 2, 3]), edge(&[4, 5])];
        let view_b = vec![edge(&[3, 2, 1]), edge(&[5, 6])];

        let merged = consolidate([view_a, view_b]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn consolidation_is_idempotent() {
        let views = vec![
            vec![edge(&[1, 2]), edge(&[2, 3])],
            vec![edge(&[2, 1]), edge(&[3, 4])],
        ];

        let once = consolidate(views.clone());
        let twice = consolidate([once.clone()]);
        assert_eq!(once, twice);
    }

    #[test]
    fn order_of_views_does_not_matter() {
        let a = vec![edge(&[1, 2]), edge(&[3, 4])];
        let b = vec![edge(&[5, 6])];

        let forward = consolidate([a.clone(), b.clone()]);
        let backward = consolidate([b, a]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn empty_input_yields_empty_set() {
        let views: Vec<Vec<Hyperedge>> = Vec::new();
        assert!(consolidate(views).is_empty());
    }
}
