//! Synthetic population generator
//!
//! Produces individuals with latent group membership, family structure,
//! environment assignments, trait measurements and a genetic-distance
//! matrix. The generated tables feed the view extractor exactly like
//! externally supplied CSVs would.

use anyhow::Result;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use crate::data::{GeneticDistances, IndividualRecord, IndividualTable, TraitTable, NO_FAMILY};

/// Parameters for the synthetic population.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub n_individuals: usize,
    pub n_true_groups: usize,
    pub n_traits: usize,
    pub n_families: usize,
    pub family_size_min: usize,
    pub family_size_max: usize,
    /// Relative share of each true group among non-hybrid individuals.
    pub group_proportions: Vec<f64>,
    /// Fraction of the population assigned the hybrid label.
    pub hybrid_fraction: f64,

    pub trait_group_effect_scale: f64,
    pub trait_env_effect_scale: f64,
    pub trait_plasticity_effect: f64,
    pub trait_convergence_effect: f64,
    pub trait_noise_std: f64,

    pub genetic_dist_base: f64,
    pub genetic_same_group_effect: f64,
    pub genetic_same_family_effect: f64,
    pub genetic_hybrid_factor: f64,

    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_individuals: 120,
            n_true_groups: 3,
            n_traits: 5,
            n_families: 15,
            family_size_min: 3,
            family_size_max: 5,
            group_proportions: vec![0.35, 0.35, 0.20],
            hybrid_fraction: 0.10,
            trait_group_effect_scale: 1.5,
            trait_env_effect_scale: 1.0,
            trait_plasticity_effect: 2.0,
            trait_convergence_effect: 1.8,
            trait_noise_std: 0.5,
            genetic_dist_base: 0.8,
            genetic_same_group_effect: -0.3,
            genetic_same_family_effect: -0.4,
            genetic_hybrid_factor: 0.5,
            seed: 42,
        }
    }
}

/// A complete simulated population: the three tables downstream stages read.
#[derive(Debug, Clone)]
pub struct SimulatedPopulation {
    pub individuals: IndividualTable,
    pub traits: TraitTable,
    pub genetic: GeneticDistances,
}

const HYBRID_LABEL: &str = "Hybrid_G1G2";

/// Generate a population. Deterministic for a fixed seed.
pub fn simulate_population(config: &SimulationConfig) -> Result<SimulatedPopulation> {
    log::info!(
        "Simulating population of {} individuals, {} groups, {} traits (seed {})",
        config.n_individuals, config.n_true_groups, config.n_traits, config.seed
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let n = config.n_individuals;

    let groups = assign_groups(config, &mut rng);
    let family_ids = assign_families(config, &mut rng);
    let environments = assign_environments(&groups, &mut rng);

    let individuals = IndividualTable {
        records: (0..n)
            .map(|i| IndividualRecord {
                id: i as u32,
                true_group: groups[i].clone(),
                family_id: family_ids[i],
                environment: environments[i].clone(),
            })
            .collect(),
    };

    let traits = simulate_traits(config, &individuals, &mut rng)?;
    let genetic = simulate_genetic_distances(config, &individuals, &mut rng);

    Ok(SimulatedPopulation { individuals, traits, genetic })
}

/// Draw group labels honoring the configured proportions, then mix in
/// hybrids and shuffle.
fn assign_groups(config: &SimulationConfig, rng: &mut StdRng) -> Vec<String> {
    let n = config.n_individuals;
    let n_hybrids = (n as f64 * config.hybrid_fraction) as usize;
    let n_pure = n - n_hybrids;

    // Proportions must cover every group; fall back to uniform otherwise.
    let proportions: Vec<f64> = if config.group_proportions.len() == config.n_true_groups {
        config.group_proportions.clone()
    } else {
        vec![1.0 / config.n_true_groups as f64; config.n_true_groups]
    };

    let mut counts: Vec<usize> = proportions
        .iter()
        .map(|p| (p * n_pure as f64) as usize)
        .collect();

    // Rounding can leave a few individuals unplaced; spread them randomly.
    let mut assigned: usize = counts.iter().sum();
    while assigned < n_pure {
        let idx = rng.random_range(0..counts.len());
        counts[idx] += 1;
        assigned += 1;
    }

    let mut labels = Vec::with_capacity(n);
    for (group_idx, &count) in counts.iter().enumerate() {
        for _ in 0..count {
            labels.push(format!("G{}", group_idx + 1));
        }
    }
    labels.extend(std::iter::repeat(HYBRID_LABEL.to_string()).take(n_hybrids));
    labels.shuffle(rng);
    labels
}

/// Carve families of random size out of a shuffled pool; leftovers stay
/// unassigned (`NO_FAMILY`).
fn assign_families(config: &SimulationConfig, rng: &mut StdRng) -> Vec<i64> {
    let n = config.n_individuals;
    let mut family_ids = vec![NO_FAMILY; n];

    let mut pool: Vec<usize> = (0..n).collect();
    pool.shuffle(rng);

    let mut next_family: i64 = 0;
    for _ in 0..config.n_families {
        if pool.len() < config.family_size_min {
            break;
        }
        let size = rng.random_range(config.family_size_min..=config.family_size_max);
        if pool.len() < size {
            continue;
        }
        for _ in 0..size {
            let member = pool.pop().unwrap_or_default();
            family_ids[member] = next_family;
        }
        next_family += 1;
    }

    family_ids
}

/// Environments are group-biased: G1 favors E1, G2 favors E2, hybrids draw
/// a bias at random.
fn assign_environments(groups: &[String], rng: &mut StdRng) -> Vec<String> {
    groups
        .iter()
        .map(|group| {
            let prob_e1 = match group.as_str() {
                "G1" => 0.8,
                "G2" => 0.2,
                "G3" => 0.6,
                HYBRID_LABEL => {
                    let r: f64 = rng.random();
                    if r < 0.4 {
                        0.8
                    } else if r < 0.8 {
                        0.2
                    } else {
                        0.5
                    }
                }
                _ => 0.5,
            };
            if rng.random::<f64>() < prob_e1 { "E1" } else { "E2" }.to_string()
        })
        .collect()
}

fn simulate_traits(
    config: &SimulationConfig,
    individuals: &IndividualTable,
    rng: &mut StdRng,
) -> Result<TraitTable> {
    let n = individuals.len();
    let n_traits = config.n_traits;
    let scale = config.trait_group_effect_scale;
    let noise = Normal::new(0.0, config.trait_noise_std)
        .map_err(|e| anyhow::anyhow!("invalid trait noise std: {}", e))?;

    // Per-group mean trait vectors; the hybrid mean is the G1/G2 midpoint.
    let mut group_means: Vec<(String, Vec<f64>)> = Vec::with_capacity(config.n_true_groups + 1);
    for g in 0..config.n_true_groups {
        let means = (0..n_traits).map(|_| rng.random_range(-scale..scale)).collect();
        group_means.push((format!("G{}", g + 1), means));
    }
    let hybrid_means: Vec<f64> = (0..n_traits)
        .map(|t| {
            let g1 = group_means.first().map_or(0.0, |(_, m)| m[t]);
            let g2 = group_means.get(1).map_or(0.0, |(_, m)| m[t]);
            (g1 + g2) / 2.0
        })
        .collect();
    group_means.push((HYBRID_LABEL.to_string(), hybrid_means));

    let mut values = Array2::zeros((n, n_traits));
    for (i, record) in individuals.records.iter().enumerate() {
        let base = group_means
            .iter()
            .find(|(g, _)| *g == record.true_group)
            .map(|(_, m)| m.clone())
            .unwrap_or_else(|| vec![0.0; n_traits]);

        for t in 0..n_traits {
            let env_scale = config.trait_env_effect_scale;
            let env_shift = rng.random_range(-env_scale..env_scale) / 2.0;
            let shifted = if record.environment == "E1" {
                base[t] + env_shift
            } else {
                base[t] - env_shift
            };
            values[[i, t]] = shifted + noise.sample(rng);
        }
    }

    // Phenotypic plasticity: G1's trait 0 diverges by environment.
    for (i, record) in individuals.records.iter().enumerate() {
        if record.true_group == "G1" && n_traits > 0 {
            if record.environment == "E1" {
                values[[i, 0]] += config.trait_plasticity_effect;
            } else {
                values[[i, 0]] -= config.trait_plasticity_effect;
            }
        }
    }

    // Convergent evolution: G1 and G3 share a trait-1 shift in E2.
    for (i, record) in individuals.records.iter().enumerate() {
        if n_traits > 1
            && record.environment == "E2"
            && (record.true_group == "G1" || record.true_group == "G3")
        {
            values[[i, 1]] += config.trait_convergence_effect;
        }
    }

    Ok(TraitTable {
        ids: individuals.records.iter().map(|r| r.id).collect(),
        trait_names: (0..n_traits).map(|t| format!("trait_{}", t)).collect(),
        values,
    })
}

fn simulate_genetic_distances(
    config: &SimulationConfig,
    individuals: &IndividualTable,
    rng: &mut StdRng,
) -> GeneticDistances {
    let n = individuals.len();
    let base = config.genetic_dist_base;
    let mut matrix = Array2::zeros((n, n));

    for i in 0..n {
        for j in (i + 1)..n {
            let a = &individuals.records[i];
            let b = &individuals.records[j];

            let mut dist = rng.random_range((base - 0.1)..(base + 0.1));
            let a_hybrid = a.true_group.contains("Hybrid");
            let b_hybrid = b.true_group.contains("Hybrid");

            if a.true_group == b.true_group && !a_hybrid {
                dist += config.genetic_same_group_effect;
            }
            if a.family_id != NO_FAMILY && a.family_id == b.family_id {
                dist += config.genetic_same_family_effect;
            }

            let parent = |g: &str| g == "G1" || g == "G2";
            if (a_hybrid && parent(&b.true_group)) || (b_hybrid && parent(&a.true_group)) {
                dist = (base + config.genetic_same_group_effect / 2.0) * config.genetic_hybrid_factor
                    + rng.random_range(-0.05..0.05);
            } else if a_hybrid && b_hybrid {
                dist = (base + config.genetic_same_group_effect / 2.0)
                    * (config.genetic_hybrid_factor + 0.1)
                    + rng.random_range(-0.05..0.05);
            }

            let dist = dist.max(0.01);
            matrix[[i, j]] = dist;
            matrix[[j, i]] = dist;
        }
    }

    GeneticDistances {
        ids: individuals.records.iter().map(|r| r.id).collect(),
        matrix,
    }
}
