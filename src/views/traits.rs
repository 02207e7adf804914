//! Trait-based hyperedge views

use std::collections::BTreeSet;
use ndarray::Array2;
use rayon::prelude::*;
use crate::data::TraitTable;
use crate::error::AnalyzerError;
use crate::hypergraph::Hyperedge;
use crate::views::Direction;

/// Standardize each trait dimension to zero mean and unit variance across
/// the population. Constant dimensions are centered only.
fn standardize(values: &Array2<f64>) -> Array2<f64> {
    let n = values.nrows() as f64;
    let mut scaled = values.clone();

    for mut col in scaled.columns_mut() {
        let mean = col.sum() / n;
        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        for v in col.iter_mut() {
            *v = if std > 0.0 { (*v - mean) / std } else { *v - mean };
        }
    }

    scaled
}

/// k-nearest-neighbor hyperedges in trait space.
///
/// For each individual: Euclidean distance to every other, take the k
/// nearest (ascending distance, ties by ascending id), and emit a hyperedge
/// of that individual plus its neighbors (size k+1). Duplicate edges across
/// individuals collapse.
pub fn trait_knn_hyperedges(traits: &TraitTable, k: usize, scale: bool) -> Vec<Hyperedge> {
    let n = traits.ids.len();
    if n < 2 || k == 0 {
        return Vec::new();
    }
    let k = k.min(n - 1);

    let values = if scale { standardize(&traits.values) } else { traits.values.clone() };

    let edges: BTreeSet<Hyperedge> = (0..n)
        .into_par_iter()
        .filter_map(|i| {
            let row_i = values.row(i);
            let mut neighbors: Vec<(f64, u32)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| {
                    let dist = row_i
                        .iter()
                        .zip(values.row(j).iter())
                        .map(|(a, b)| (a - b).powi(2))
                        .sum::<f64>()
                        .sqrt();
                    (dist, traits.ids[j])
                })
                .collect();

            neighbors.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            let members = std::iter::once(traits.ids[i])
                .chain(neighbors.iter().take(k).map(|&(_, id)| id));
            Hyperedge::new(members).ok()
        })
        .collect();

    edges.into_iter().collect()
}

/// A single hyperedge of every individual whose value on one trait
/// dimension clears the threshold; nothing when fewer than two qualify.
pub fn trait_threshold_hyperedges(
    traits: &TraitTable,
    trait_name: &str,
    threshold: f64,
    direction: Direction,
) -> Result<Vec<Hyperedge>, AnalyzerError> {
    let dim = traits
        .trait_names
        .iter()
        .position(|name| name == trait_name)
        .ok_or_else(|| {
            AnalyzerError::InputMissing(format!("trait column '{}' not found", trait_name))
        })?;

    let selected: Vec<u32> = traits
        .ids
        .iter()
        .enumerate()
        .filter(|&(i, _)| {
            let v = traits.values[[i, dim]];
            match direction {
                Direction::Above => v > threshold,
                Direction::Below => v < threshold,
            }
        })
        .map(|(_, &id)| id)
        .collect();

    if selected.len() < 2 {
        return Ok(Vec::new());
    }

    Ok(vec![Hyperedge::new(selected).map_err(|e| {
        AnalyzerError::Structural(format!("trait threshold selection invalid: {}", e))
    })?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Two well-separated value clusters of three individuals each.
    fn two_cluster_traits() -> TraitTable {
        TraitTable {
            ids: vec![0, 1, 2, 3, 4, 5],
            trait_names: vec!["trait_0".to_string()],
            values: array![[-5.0], [-5.1], [-4.9], [5.0], [5.1], [4.9]],
        }
    }

    #[test]
    fn knn_edges_never_cross_separated_clusters() {
        let traits = two_cluster_traits();
        let edges = trait_knn_hyperedges(&traits, 2, false);

        assert!(!edges.is_empty());
        for edge in &edges {
            let low = edge.members().iter().filter(|&&id| id <= 2).count();
            let high = edge.members().iter().filter(|&&id| id >= 3).count();
            assert!(
                low == 0 || high == 0,
                "edge {:?} crosses the two value clusters",
                edge.members()
            );
            assert_eq!(edge.len(), 3); // k + 1
        }
    }

    #[test]
    fn knn_is_deterministic() {
        let traits = two_cluster_traits();
        let a = trait_knn_hyperedges(&traits, 2, true);
        let b = trait_knn_hyperedges(&traits, 2, true);
        assert_eq!(a, b);
    }

    #[test]
    fn knn_ties_break_by_ascending_id() {
        // Individual 0 is equidistant from 1, 2 and 3; k=2 must pick 1 and 2.
        let traits = TraitTable {
            ids: vec![0, 1, 2, 3],
            trait_names: vec!["trait_0".to_string(), "trait_1".to_string()],
            values: array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [-1.0, 0.0]],
        };
        let edges = trait_knn_hyperedges(&traits, 2, false);
        assert!(edges.iter().any(|e| e.members() == [0, 1, 2]));
    }

    #[test]
    fn threshold_selects_one_edge_or_nothing() {
        let traits = two_cluster_traits();

        let above = trait_threshold_hyperedges(&traits, "trait_0", 0.0, Direction::Above).unwrap();
        assert_eq!(above.len(), 1);
        assert_eq!(above[0].members(), &[3, 4, 5]);

        let none =
            trait_threshold_hyperedges(&traits, "trait_0", 100.0, Direction::Above).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn threshold_unknown_column_is_input_missing() {
        let traits = two_cluster_traits();
        let err =
            trait_threshold_hyperedges(&traits, "trait_9", 0.0, Direction::Below).unwrap_err();
        assert!(matches!(err, AnalyzerError::InputMissing(_)));
    }

    #[test]
    fn standardization_keeps_neighbor_structure_scale_free() {
        let mut traits = two_cluster_traits();
        // Blow up the scale of the only dimension; k-NN structure must not change.
        let scaled_edges = {
            traits.values.mapv_inplace(|v| v * 1000.0);
            trait_knn_hyperedges(&traits, 2, true)
        };
        let reference = trait_knn_hyperedges(&two_cluster_traits(), 2, true);
        assert_eq!(scaled_edges, reference);
    }
}
