//! Configuration for the hypergraph analysis pipeline

use crate::cluster::EdgeContribution;

/// Parameters controlling hyperedge extraction from the relational views.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Neighbors per individual for the trait k-NN view.
    pub trait_knn_k: usize,

    /// Standardize each trait dimension to zero mean / unit variance before
    /// computing distances.
    pub scale_traits: bool,

    /// Neighbors per individual for the genetic k-NN view.
    pub genetic_knn_k: usize,

    /// Genetic distance below which individuals count as close.
    pub genetic_dist_threshold: f64,

    /// Minimum members for a genetic-threshold hyperedge.
    pub genetic_min_size: usize,

    /// Minimum members for a family hyperedge.
    pub min_family_size: usize,

    /// Minimum members for an environment hyperedge.
    pub min_env_size: usize,

    /// Minimum members for a family-within-environment hyperedge.
    pub min_family_env_size: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            trait_knn_k: 3,
            scale_traits: true,
            genetic_knn_k: 3,
            genetic_dist_threshold: 0.25,
            genetic_min_size: 2,
            min_family_size: 2,
            min_env_size: 2,
            min_family_env_size: 2,
        }
    }
}

/// Parameters controlling the modularity-based community detector.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Edge-contribution rule for the modularity objective.
    pub contribution: EdgeContribution,

    /// Maximum local-moving passes before giving up on convergence.
    pub max_passes: usize,

    /// Seed fixing the node visitation order.
    pub seed: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            contribution: EdgeContribution::Majority,
            max_passes: 50,
            seed: 42,
        }
    }
}
