//! Modularity-based hypergraph community detection
//!
//! Local-moving optimization of a hypergraph modularity objective: observed
//! intra-community hyperedge credit minus the credit expected under a null
//! model preserving node degrees and the hyperedge-size distribution.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use statrs::distribution::{Binomial, Discrete};
use crate::cluster::{EdgeContribution, Partition};
use crate::config::DetectionConfig;
use crate::hypergraph::Hypergraph;

/// Moves with delta at or below this never get accepted.
const DELTA_EPS: f64 = 1e-12;

/// Working state of one detector run: the hypergraph re-indexed to dense
/// node positions plus the degree/volume bookkeeping the delta computation
/// needs.
struct LocalMovingState {
    /// Per edge, the member node positions.
    edges: Vec<Vec<usize>>,
    /// Per node position, indices of incident edges.
    incident: Vec<Vec<usize>>,
    /// Per node position, number of incident edges.
    degrees: Vec<usize>,
    /// Histogram of hyperedge sizes.
    size_counts: BTreeMap<usize, usize>,
    /// Sum of all node degrees.
    total_volume: f64,
    /// Edge count as a float.
    m: f64,
    /// Current community label per node position.
    labels: Vec<usize>,
    /// Current degree volume per community label.
    community_volumes: Vec<f64>,
    rule: EdgeContribution,
}

impl LocalMovingState {
    fn new(hypergraph: &Hypergraph, rule: EdgeContribution) -> Self {
        let n = hypergraph.node_count();
        let position: HashMap<u32, usize> = hypergraph
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();

        let edges: Vec<Vec<usize>> = hypergraph
            .edges()
            .iter()
            .map(|e| e.members().iter().map(|m| position[m]).collect())
            .collect();

        let mut incident = vec![Vec::new(); n];
        for (idx, members) in edges.iter().enumerate() {
            for &p in members {
                incident[p].push(idx);
            }
        }
        let degrees: Vec<usize> = incident.iter().map(|v| v.len()).collect();

        let mut size_counts: BTreeMap<usize, usize> = BTreeMap::new();
        for members in &edges {
            *size_counts.entry(members.len()).or_insert(0) += 1;
        }

        let total_volume = degrees.iter().sum::<usize>() as f64;
        let m = edges.len() as f64;
        let community_volumes = degrees.iter().map(|&d| d as f64).collect();

        Self {
            edges,
            incident,
            degrees,
            size_counts,
            total_volume,
            m,
            labels: (0..n).collect(),
            community_volumes,
            rule,
        }
    }

    /// Credit one edge grants under the current labels, optionally with one
    /// node's label overridden (for evaluating a prospective move).
    fn edge_credit(&self, edge_idx: usize, moved: Option<(usize, usize)>) -> f64 {
        let members = &self.edges[edge_idx];
        let d = members.len();

        let mut counts: HashMap<usize, usize> = HashMap::with_capacity(d);
        for &p in members {
            let label = match moved {
                Some((node, label)) if node == p => label,
                _ => self.labels[p],
            };
            *counts.entry(label).or_insert(0) += 1;
        }

        let &top = counts.values().max().unwrap_or(&0);
        contribution_credit(self.rule, top, d)
    }

    /// Expected credit of a random size-d edge toward a community holding a
    /// fraction `p` of the total degree volume.
    fn expected_credit(&self, d: usize, p: f64) -> f64 {
        expected_credit(self.rule, d, p)
    }

    /// Modularity delta of moving `node` from its current community to `to`.
    fn move_delta(&self, node: usize, to: usize) -> f64 {
        let from = self.labels[node];
        if from == to {
            return 0.0;
        }

        let mut observed = 0.0;
        for &edge_idx in &self.incident[node] {
            observed +=
                self.edge_credit(edge_idx, Some((node, to))) - self.edge_credit(edge_idx, None);
        }
        observed /= self.m;

        let deg = self.degrees[node] as f64;
        let vol = self.total_volume;
        let p_from_old = self.community_volumes[from] / vol;
        let p_from_new = (self.community_volumes[from] - deg) / vol;
        let p_to_old = self.community_volumes[to] / vol;
        let p_to_new = (self.community_volumes[to] + deg) / vol;

        let mut expected = 0.0;
        for (&d, &count) in &self.size_counts {
            let weight = count as f64 / self.m;
            expected += weight
                * (self.expected_credit(d, p_from_new) + self.expected_credit(d, p_to_new)
                    - self.expected_credit(d, p_from_old)
                    - self.expected_credit(d, p_to_old));
        }

        observed - expected
    }

    fn apply_move(&mut self, node: usize, to: usize) {
        let from = self.labels[node];
        let deg = self.degrees[node] as f64;
        self.community_volumes[from] -= deg;
        self.community_volumes[to] += deg;
        self.labels[node] = to;
    }

    /// Communities represented among the node's co-members, plus its own.
    fn candidate_communities(&self, node: usize) -> BTreeSet<usize> {
        let mut candidates = BTreeSet::new();
        candidates.insert(self.labels[node]);
        for &edge_idx in &self.incident[node] {
            for &p in &self.edges[edge_idx] {
                candidates.insert(self.labels[p]);
            }
        }
        candidates
    }
}

fn contribution_credit(rule: EdgeContribution, top: usize, d: usize) -> f64 {
    match rule {
        EdgeContribution::Strict => {
            if top == d { 1.0 } else { 0.0 }
        }
        EdgeContribution::Majority => {
            if 2 * top > d { 1.0 } else { 0.0 }
        }
        EdgeContribution::Linear => {
            if 2 * top > d { top as f64 / d as f64 } else { 0.0 }
        }
    }
}

fn expected_credit(rule: EdgeContribution, d: usize, p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    if p == 0.0 {
        return 0.0;
    }
    match rule {
        EdgeContribution::Strict => p.powi(d as i32),
        EdgeContribution::Majority | EdgeContribution::Linear => {
            let Ok(binomial) = Binomial::new(p, d as u64) else {
                return 0.0;
            };
            let mut expected = 0.0;
            for t in (d / 2 + 1)..=d {
                let pmf = binomial.pmf(t as u64);
                expected += match rule {
                    EdgeContribution::Linear => (t as f64 / d as f64) * pmf,
                    _ => pmf,
                };
            }
            expected
        }
    }
}

/// Hypergraph modularity of a partition under the given contribution rule.
pub fn modularity(
    hypergraph: &Hypergraph,
    partition: &Partition,
    rule: EdgeContribution,
) -> f64 {
    let m = hypergraph.edge_count() as f64;
    if m == 0.0 {
        return 0.0;
    }

    let mut observed = 0.0;
    for edge in hypergraph.edges() {
        let d = edge.len();
        let mut counts: HashMap<u32, usize> = HashMap::with_capacity(d);
        for &member in edge.members() {
            if let Some(cluster) = partition.get(member) {
                *counts.entry(cluster).or_insert(0) += 1;
            }
        }
        let &top = counts.values().max().unwrap_or(&0);
        observed += contribution_credit(rule, top, d);
    }
    observed /= m;

    let total_volume: usize = hypergraph.nodes().iter().map(|&n| hypergraph.degree(n)).sum();
    let total_volume = total_volume as f64;
    if total_volume == 0.0 {
        return observed;
    }

    let mut cluster_volumes: BTreeMap<u32, f64> = BTreeMap::new();
    for &node in hypergraph.nodes() {
        if let Some(cluster) = partition.get(node) {
            *cluster_volumes.entry(cluster).or_insert(0.0) += hypergraph.degree(node) as f64;
        }
    }

    let mut size_counts: BTreeMap<usize, usize> = BTreeMap::new();
    for edge in hypergraph.edges() {
        *size_counts.entry(edge.len()).or_insert(0) += 1;
    }

    let mut expected = 0.0;
    for (&d, &count) in &size_counts {
        let weight = count as f64 / m;
        for volume in cluster_volumes.values() {
            expected += weight * expected_credit(rule, d, volume / total_volume);
        }
    }

    observed - expected
}

/// Partition the hypergraph's nodes into communities by local-moving
/// modularity optimization.
///
/// Each node starts in a singleton community. Passes visit every node in a
/// seed-shuffled fixed order and move it to the candidate community with the
/// strictly greatest positive modularity delta (ties: keep the current
/// community if tied, else the lowest label). A pass with no moves
/// converges; `max_passes` bounds the search. A hypergraph with no edges
/// yields the singleton-per-node partition; an empty node set yields an
/// empty partition.
pub fn detect_communities(hypergraph: &Hypergraph, config: &DetectionConfig) -> Partition {
    let n = hypergraph.node_count();
    if n == 0 {
        return Partition::empty();
    }
    if hypergraph.edge_count() == 0 {
        log::info!("Hypergraph has no edges; every node becomes its own community");
        let labels: Vec<usize> = (0..n).collect();
        return Partition::from_labels(hypergraph.nodes(), &labels);
    }

    log::info!(
        "Detecting communities over {} nodes and {} hyperedges ({:?} rule, seed {})",
        n,
        hypergraph.edge_count(),
        config.contribution,
        config.seed
    );

    let mut state = LocalMovingState::new(hypergraph, config.contribution);

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);
    order.shuffle(&mut rng);

    for pass in 0..config.max_passes {
        let mut moves = 0usize;

        for &node in &order {
            let current = state.labels[node];
            let mut best_label = current;
            let mut best_delta = 0.0;

            for &candidate in &state.candidate_communities(node) {
                if candidate == current {
                    continue;
                }
                let delta = state.move_delta(node, candidate);
                // Strictly greater delta wins; equal deltas keep the lower
                // label, and the current community wins all ties at zero.
                if delta > best_delta + DELTA_EPS {
                    best_delta = delta;
                    best_label = candidate;
                }
            }

            if best_label != current && best_delta > DELTA_EPS {
                state.apply_move(node, best_label);
                moves += 1;
            }
        }

        log::debug!("Pass {}: {} moves", pass + 1, moves);
        if moves == 0 {
            log::info!("Converged after {} passes", pass + 1);
            break;
        }
    }

    let partition = Partition::from_labels(hypergraph.nodes(), &state.labels);
    log::info!("Found {} communities", partition.cluster_count());
    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypergraph::Hyperedge;

    fn edge(members: &[u32]) -> Hyperedge {
        Hyperedge::new(members.iter().copied()).unwrap()
    }

    /// Two dense groups joined by a single bridge edge.
    fn two_community_hypergraph() -> Hypergraph {
        Hypergraph::from_edges([
            edge(&[0, 1, 2]),
            edge(&[0, 1]),
            edge(&[1, 2]),
            edge(&[0, 2]),
            edge(&[3, 4, 5]),
            edge(&[3, 4]),
            edge(&[4, 5]),
            edge(&[3, 5]),
            edge(&[2, 3]),
        ])
    }

    #[test]
    fn separates_two_dense_groups() {
        let h = two_community_hypergraph();
        let partition = detect_communities(&h, &DetectionConfig::default());

        assert_eq!(partition.get(0), partition.get(1));
        assert_eq!(partition.get(1), partition.get(2));
        assert_eq!(partition.get(3), partition.get(4));
        assert_eq!(partition.get(4), partition.get(5));
        assert_ne!(partition.get(0), partition.get(3));
    }

    #[test]
    fn partition_is_total_over_the_node_set() {
        let h = two_community_hypergraph();
        let partition = detect_communities(&h, &DetectionConfig::default());

        assert_eq!(partition.len(), h.node_count());
        for &node in h.nodes() {
            assert!(partition.get(node).is_some());
        }
        let covered: usize = partition.clusters().values().map(|m| m.len()).sum();
        assert_eq!(covered, h.node_count());
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let h = two_community_hypergraph();
        let config = DetectionConfig { seed: 7, ..Default::default() };
        let a = detect_communities(&h, &config);
        let b = detect_communities(&h, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn no_edges_yields_singletons() {
        let h = Hypergraph::with_nodes([1, 2, 3], Vec::<Hyperedge>::new()).unwrap();
        let partition = detect_communities(&h, &DetectionConfig::default());

        assert_eq!(partition.len(), 3);
        assert_eq!(partition.cluster_count(), 3);
        assert_eq!(partition.get(1), Some(0));
        assert_eq!(partition.get(3), Some(2));
    }

    #[test]
    fn empty_hypergraph_yields_empty_partition() {
        let h = Hypergraph::from_edges(Vec::<Hyperedge>::new());
        let partition = detect_communities(&h, &DetectionConfig::default());
        assert!(partition.is_empty());
    }

    #[test]
    fn single_pair_forms_one_cluster() {
        let h = Hypergraph::from_edges([edge(&[1, 2])]);
        let partition = detect_communities(&h, &DetectionConfig::default());
        assert_eq!(partition.get(1), partition.get(2));
        assert_eq!(partition.cluster_count(), 1);
    }

    #[test]
    fn final_modularity_never_below_singleton_start() {
        for rule in [
            EdgeContribution::Strict,
            EdgeContribution::Majority,
            EdgeContribution::Linear,
        ] {
            let h = two_community_hypergraph();
            let config = DetectionConfig { contribution: rule, ..Default::default() };

            let singleton_labels: Vec<usize> = (0..h.node_count()).collect();
            let singleton = Partition::from_labels(h.nodes(), &singleton_labels);
            let start = modularity(&h, &singleton, rule);

            let partition = detect_communities(&h, &config);
            let end = modularity(&h, &partition, rule);

            assert!(
                end >= start - 1e-9,
                "{:?}: final modularity {} below start {}",
                rule,
                end,
                start
            );
        }
    }

    #[test]
    fn grouped_partition_beats_singletons_on_modularity() {
        let h = two_community_hypergraph();
        let grouped = Partition::from_labels(h.nodes(), &[0, 0, 0, 1, 1, 1]);
        let singleton = Partition::from_labels(h.nodes(), &[0, 1, 2, 3, 4, 5]);

        for rule in [
            EdgeContribution::Strict,
            EdgeContribution::Majority,
            EdgeContribution::Linear,
        ] {
            assert!(modularity(&h, &grouped, rule) > modularity(&h, &singleton, rule));
        }
    }

    #[test]
    fn expected_credit_edge_cases() {
        assert_eq!(expected_credit(EdgeContribution::Majority, 3, 0.0), 0.0);
        assert!((expected_credit(EdgeContribution::Majority, 3, 1.0) - 1.0).abs() < 1e-9);
        assert!((expected_credit(EdgeContribution::Strict, 2, 0.5) - 0.25).abs() < 1e-9);
        // Majority for d=2, p=0.5: only t=2 counts, C(2,2) * 0.25 = 0.25.
        assert!((expected_credit(EdgeContribution::Majority, 2, 0.5) - 0.25).abs() < 1e-9);
        // Linear halves nothing at t=d for d=2 (t/d = 1).
        assert!((expected_credit(EdgeContribution::Linear, 2, 0.5) - 0.25).abs() < 1e-9);
    }
}
