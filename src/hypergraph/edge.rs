//! Hyperedge value type

use crate::error::AnalyzerError;

/// A non-empty set of individuals considered jointly related by some
/// criterion.
///
/// Members are stored as a sorted, duplicate-free list so that two hyperedges
/// with the same member set compare equal and hash identically regardless of
/// the order or view they were produced from. Edges of fewer than two
/// distinct members are rejected at construction; serialization goes through
/// the plain member lists of `HypergraphStructure` so that re-imports are
/// validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hyperedge {
    members: Vec<u32>,
}

impl Hyperedge {
    /// Build a hyperedge from any collection of member ids.
    ///
    /// Duplicates collapse; fewer than two distinct members is a
    /// `StructuralError`.
    pub fn new(members: impl IntoIterator<Item = u32>) -> Result<Self, AnalyzerError> {
        let mut members: Vec<u32> = members.into_iter().collect();
        members.sort_unstable();
        members.dedup();

        if members.len() < 2 {
            return Err(AnalyzerError::Structural(format!(
                "hyperedge must have at least 2 distinct members, got {}",
                members.len()
            )));
        }

        Ok(Self { members })
    }

    /// Member ids in ascending order.
    pub fn members(&self) -> &[u32] {
        &self.members
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false: empty hyperedges cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the given individual belongs to this hyperedge.
    pub fn contains(&self, id: u32) -> bool {
        self.members.binary_search(&id).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_are_sorted_and_deduped() {
        let e = Hyperedge::new([5, 1, 3, 1, 5]).unwrap();
        assert_eq!(e.members(), &[1, 3, 5]);
        assert_eq!(e.len(), 3);
    }

    #[test]
    fn identical_member_sets_compare_equal() {
        let a = Hyperedge::new([2, 7, 4]).unwrap();
        let b = Hyperedge::new([7, 4, 2]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn singleton_and_empty_are_rejected() {
        assert!(Hyperedge::new([3]).is_err());
        assert!(Hyperedge::new([3, 3, 3]).is_err());
        assert!(Hyperedge::new([]).is_err());
    }

    #[test]
    fn membership_lookup() {
        let e = Hyperedge::new([10, 20]).unwrap();
        assert!(e.contains(10));
        assert!(!e.contains(15));
    }
}
