//! Categorical grouping views: family, environment, and family-within-environment

use std::collections::BTreeMap;
use crate::data::{IndividualTable, NO_FAMILY};
use crate::hypergraph::Hyperedge;

fn edges_from_groups<K: Ord>(groups: BTreeMap<K, Vec<u32>>, min_size: usize) -> Vec<Hyperedge> {
    let min_size = min_size.max(2);
    groups
        .into_values()
        .filter(|members| members.len() >= min_size)
        .filter_map(|members| Hyperedge::new(members).ok())
        .collect()
}

/// One hyperedge per family meeting the minimum size. Individuals with the
/// "no family" sentinel never contribute.
pub fn family_hyperedges(individuals: &IndividualTable, min_size: usize) -> Vec<Hyperedge> {
    let mut groups: BTreeMap<i64, Vec<u32>> = BTreeMap::new();
    for record in &individuals.records {
        if record.family_id != NO_FAMILY {
            groups.entry(record.family_id).or_default().push(record.id);
        }
    }
    edges_from_groups(groups, min_size)
}

/// One hyperedge per environment meeting the minimum size.
pub fn environment_hyperedges(individuals: &IndividualTable, min_size: usize) -> Vec<Hyperedge> {
    let mut groups: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
    for record in &individuals.records {
        groups.entry(record.environment.as_str()).or_default().push(record.id);
    }
    edges_from_groups(groups, min_size)
}

/// Two-level grouping: within each family, subgroup by environment, one
/// hyperedge per (family, environment) cell meeting the minimum size.
pub fn family_in_env_hyperedges(individuals: &IndividualTable, min_size: usize) -> Vec<Hyperedge> {
    let mut groups: BTreeMap<(i64, &str), Vec<u32>> = BTreeMap::new();
    for record in &individuals.records {
        if record.family_id != NO_FAMILY {
            groups
                .entry((record.family_id, record.environment.as_str()))
                .or_default()
                .push(record.id);
        }
    }
    edges_from_groups(groups, min_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::IndividualRecord;

    fn table(rows: &[(u32, i64, &str)]) -> IndividualTable {
        IndividualTable {
            records: rows
                .iter()
                .map(|&(id, family_id, environment)| IndividualRecord {
                    id,
                    true_group: "G1".to_string(),
                    family_id,
                    environment: environment.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn family_groups_exclude_sentinel() {
        let individuals = table(&[
            (1, 0, "E1"),
            (2, 0, "E1"),
            (3, 0, "E2"),
            (4, 1, "E1"),
            (5, 1, "E2"),
            (6, -1, "E1"),
        ]);
        let edges = family_hyperedges(&individuals, 2);

        assert_eq!(edges.len(), 2);
        assert!(edges.iter().any(|e| e.members() == [1, 2, 3]));
        assert!(edges.iter().any(|e| e.members() == [4, 5]));
        assert!(edges.iter().all(|e| !e.contains(6)));
    }

    #[test]
    fn undersized_families_emit_nothing() {
        let individuals = table(&[(1, 0, "E1"), (2, 1, "E1"), (3, 1, "E1")]);
        let edges = family_hyperedges(&individuals, 2);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].members(), &[2, 3]);
    }

    #[test]
    fn environment_groups_everyone() {
        let individuals = table(&[(1, -1, "E1"), (2, 0, "E1"), (3, 0, "E2"), (4, 1, "E2")]);
        let edges = environment_hyperedges(&individuals, 2);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().any(|e| e.members() == [1, 2]));
        assert!(edges.iter().any(|e| e.members() == [3, 4]));
    }

    #[test]
    fn family_in_env_splits_by_cell() {
        let individuals = table(&[
            (1, 0, "E1"),
            (2, 0, "E1"),
            (3, 0, "E2"),
            (4, 0, "E2"),
            (5, -1, "E1"),
        ]);
        let edges = family_in_env_hyperedges(&individuals, 2);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().any(|e| e.members() == [1, 2]));
        assert!(edges.iter().any(|e| e.members() == [3, 4]));
    }
}
