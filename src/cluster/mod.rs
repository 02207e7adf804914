//! Hypergraph community detection and evaluation

pub mod detection;
pub mod metrics;

use std::collections::BTreeMap;
use std::str::FromStr;
use serde::{Serialize, Deserialize};

/// How much credit a hyperedge grants the community holding its members.
///
/// Published hypergraph-modularity variants differ on this convention, so it
/// is a configuration choice rather than hard-coded semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeContribution {
    /// Full credit only when every member shares one community.
    Strict,
    /// Full credit when a strict majority of members shares one community.
    Majority,
    /// Proportional credit t/d for a community holding a strict majority t
    /// of the d members.
    Linear,
}

impl FromStr for EdgeContribution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(EdgeContribution::Strict),
            "majority" => Ok(EdgeContribution::Majority),
            "linear" => Ok(EdgeContribution::Linear),
            other => Err(format!("unknown contribution rule '{}' (strict|majority|linear)", other)),
        }
    }
}

/// A total assignment of every node to exactly one cluster label.
///
/// Labels are consecutive integers ordered by first appearance among nodes
/// in ascending id order, so the output is reproducible and independent of
/// internal community bookkeeping. A detector run produces a fresh
/// partition; partitions are never mutated incrementally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    assignments: BTreeMap<u32, u32>,
}

impl Partition {
    /// Build a partition from per-node labels, relabeling to consecutive
    /// integers by first appearance in ascending node order. `nodes` must be
    /// sorted ascending and parallel to `labels`.
    pub fn from_labels(nodes: &[u32], labels: &[usize]) -> Self {
        let mut relabel: BTreeMap<usize, u32> = BTreeMap::new();
        let mut next = 0u32;
        let mut assignments = BTreeMap::new();

        for (&node, &label) in nodes.iter().zip(labels) {
            let cluster = *relabel.entry(label).or_insert_with(|| {
                let id = next;
                next += 1;
                id
            });
            assignments.insert(node, cluster);
        }

        Self { assignments }
    }

    pub fn empty() -> Self {
        Self { assignments: BTreeMap::new() }
    }

    /// Cluster label of a node, if the node was part of the detector input.
    pub fn get(&self, node: u32) -> Option<u32> {
        self.assignments.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Number of distinct cluster labels.
    pub fn cluster_count(&self) -> usize {
        self.assignments
            .values()
            .copied()
            .collect::<std::collections::BTreeSet<u32>>()
            .len()
    }

    /// (node, cluster) pairs in ascending node order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.assignments.iter().map(|(&n, &c)| (n, c))
    }

    /// Cluster label → sorted member list.
    pub fn clusters(&self) -> BTreeMap<u32, Vec<u32>> {
        let mut clusters: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for (&node, &cluster) in &self.assignments {
            clusters.entry(cluster).or_default().push(node);
        }
        clusters
    }
}
