//! Relational view extraction
//!
//! Each view converts one relational signal (trait similarity, genetic
//! distance, kinship, shared environment) into a set of candidate
//! hyperedges. Views are pure functions over the read-only population
//! snapshot; a view whose required table is missing reports the error and
//! contributes nothing instead of aborting the run.

pub mod traits;
pub mod genetic;
pub mod grouping;
pub mod consolidate;

pub use consolidate::consolidate;

use crate::config::ViewConfig;
use crate::data::PopulationData;
use crate::error::AnalyzerError;
use crate::hypergraph::Hyperedge;

/// Whether a trait threshold selects values above or below the cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Above,
    Below,
}

/// The fixed enumeration of hyperedge-synthesis strategies.
///
/// Each variant implements one capability: extract a set of hyperedges from
/// the population snapshot under view-specific parameters.
#[derive(Debug, Clone)]
pub enum ViewStrategy {
    /// Each individual plus its k nearest trait-space neighbors.
    TraitKnn { k: usize, scale: bool },
    /// All individuals beyond (or below) a cutoff on one trait dimension.
    TraitThreshold { trait_name: String, threshold: f64, direction: Direction },
    /// Each individual plus its k genetically nearest neighbors.
    GeneticKnn { k: usize },
    /// Per individual, everyone at genetic distance strictly below a cutoff.
    GeneticThreshold { threshold: f64, min_size: usize },
    /// One hyperedge per family of sufficient size.
    Family { min_size: usize },
    /// One hyperedge per environment of sufficient size.
    Environment { min_size: usize },
    /// One hyperedge per (family, environment) cell of sufficient size.
    FamilyInEnvironment { min_size: usize },
}

impl ViewStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ViewStrategy::TraitKnn { .. } => "trait_knn",
            ViewStrategy::TraitThreshold { .. } => "trait_threshold",
            ViewStrategy::GeneticKnn { .. } => "genetic_knn",
            ViewStrategy::GeneticThreshold { .. } => "genetic_dist_threshold",
            ViewStrategy::Family { .. } => "family",
            ViewStrategy::Environment { .. } => "environment",
            ViewStrategy::FamilyInEnvironment { .. } => "family_in_env",
        }
    }

    /// Extract this view's hyperedges from the population snapshot.
    pub fn extract(&self, data: &PopulationData) -> Result<Vec<Hyperedge>, AnalyzerError> {
        match self {
            ViewStrategy::TraitKnn { k, scale } => {
                let traits = data.traits.as_ref().ok_or_else(|| {
                    AnalyzerError::InputMissing("traits table required for trait k-NN view".into())
                })?;
                Ok(traits::trait_knn_hyperedges(traits, *k, *scale))
            }
            ViewStrategy::TraitThreshold { trait_name, threshold, direction } => {
                let traits = data.traits.as_ref().ok_or_else(|| {
                    AnalyzerError::InputMissing(
                        "traits table required for trait threshold view".into(),
                    )
                })?;
                traits::trait_threshold_hyperedges(traits, trait_name, *threshold, *direction)
            }
            ViewStrategy::GeneticKnn { k } => {
                let genetic = data.genetic.as_ref().ok_or_else(|| {
                    AnalyzerError::InputMissing(
                        "genetic distance matrix required for genetic k-NN view".into(),
                    )
                })?;
                Ok(genetic::genetic_knn_hyperedges(genetic, *k))
            }
            ViewStrategy::GeneticThreshold { threshold, min_size } => {
                let genetic = data.genetic.as_ref().ok_or_else(|| {
                    AnalyzerError::InputMissing(
                        "genetic distance matrix required for genetic threshold view".into(),
                    )
                })?;
                Ok(genetic::genetic_threshold_hyperedges(genetic, *threshold, *min_size))
            }
            ViewStrategy::Family { min_size } => {
                let individuals = data.individuals.as_ref().ok_or_else(|| {
                    AnalyzerError::InputMissing("individuals table required for family view".into())
                })?;
                Ok(grouping::family_hyperedges(individuals, *min_size))
            }
            ViewStrategy::Environment { min_size } => {
                let individuals = data.individuals.as_ref().ok_or_else(|| {
                    AnalyzerError::InputMissing(
                        "individuals table required for environment view".into(),
                    )
                })?;
                Ok(grouping::environment_hyperedges(individuals, *min_size))
            }
            ViewStrategy::FamilyInEnvironment { min_size } => {
                let individuals = data.individuals.as_ref().ok_or_else(|| {
                    AnalyzerError::InputMissing(
                        "individuals table required for family-in-environment view".into(),
                    )
                })?;
                Ok(grouping::family_in_env_hyperedges(individuals, *min_size))
            }
        }
    }
}

/// The standard battery of views for a pipeline run.
pub fn default_strategies(config: &ViewConfig) -> Vec<ViewStrategy> {
    vec![
        ViewStrategy::TraitKnn { k: config.trait_knn_k, scale: config.scale_traits },
        ViewStrategy::GeneticKnn { k: config.genetic_knn_k },
        ViewStrategy::GeneticThreshold {
            threshold: config.genetic_dist_threshold,
            min_size: config.genetic_min_size,
        },
        ViewStrategy::Family { min_size: config.min_family_size },
        ViewStrategy::Environment { min_size: config.min_env_size },
        ViewStrategy::FamilyInEnvironment { min_size: config.min_family_env_size },
    ]
}

/// Run every strategy, logging and skipping views whose inputs are absent.
/// Returns the per-view hyperedge sets for consolidation and reporting.
pub fn extract_all(
    strategies: &[ViewStrategy],
    data: &PopulationData,
) -> Vec<(&'static str, Vec<Hyperedge>)> {
    let mut results = Vec::with_capacity(strategies.len());
    for strategy in strategies {
        match strategy.extract(data) {
            Ok(edges) => {
                log::info!("View {} produced {} hyperedges", strategy.name(), edges.len());
                results.push((strategy.name(), edges));
            }
            Err(e) => {
                log::warn!("View {} skipped: {}", strategy.name(), e);
                results.push((strategy.name(), Vec::new()));
            }
        }
    }
    results
}
