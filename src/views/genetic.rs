//! Genetic-distance hyperedge views

use std::collections::BTreeSet;
use rayon::prelude::*;
use crate::data::GeneticDistances;
use crate::hypergraph::Hyperedge;

/// k-nearest-neighbor hyperedges from the genetic-distance matrix.
///
/// Each individual independently selects its k nearest others (ascending
/// distance, ties by ascending id) and forms a hyperedge including itself.
/// Neighbor selection is deliberately asymmetric; symmetry emerges only
/// through dedup of identical member sets.
pub fn genetic_knn_hyperedges(genetic: &GeneticDistances, k: usize) -> Vec<Hyperedge> {
    let n = genetic.ids.len();
    if n < 2 || k == 0 {
        return Vec::new();
    }
    let k = k.min(n - 1);

    let edges: BTreeSet<Hyperedge> = (0..n)
        .into_par_iter()
        .filter_map(|i| {
            let mut neighbors: Vec<(f64, u32)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (genetic.matrix[[i, j]], genetic.ids[j]))
                .collect();
            neighbors.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            let members = std::iter::once(genetic.ids[i])
                .chain(neighbors.iter().take(k).map(|&(_, id)| id));
            Hyperedge::new(members).ok()
        })
        .collect();

    edges.into_iter().collect()
}

/// Close-kin hyperedges: for each individual, everyone at distance strictly
/// below the threshold. The zero diagonal keeps the individual itself in its
/// own selection; sets smaller than `min_size` emit nothing.
pub fn genetic_threshold_hyperedges(
    genetic: &GeneticDistances,
    threshold: f64,
    min_size: usize,
) -> Vec<Hyperedge> {
    let n = genetic.ids.len();
    let min_size = min_size.max(2);

    let edges: BTreeSet<Hyperedge> = (0..n)
        .into_par_iter()
        .filter_map(|i| {
            let close: Vec<u32> = (0..n)
                .filter(|&j| genetic.matrix[[i, j]] < threshold)
                .map(|j| genetic.ids[j])
                .collect();
            if close.len() < min_size {
                return None;
            }
            Hyperedge::new(close).ok()
        })
        .collect();

    edges.into_iter().collect()
}
