use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use anyhow::Result;
use clap::{Parser, Subcommand};

mod config;
mod error;
mod data;
mod views;
mod hypergraph;
mod cluster;
mod storage;

use cluster::detection;
use config::{DetectionConfig, ViewConfig};
use data::simulate::{simulate_population, SimulationConfig};
use data::PopulationData;
use hypergraph::Hypergraph;

#[derive(Parser, Debug)]
#[clap(
    name = "hypergraph-cluster-analyzer",
    about = "Multi-view hypergraph construction and community detection for population data"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0", global = true)]
    threads: usize,

    /// Verbose logging
    #[clap(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a synthetic population and write its CSV tables
    Simulate {
        /// Output directory for the simulated tables
        #[clap(long, default_value = "simulated_data")]
        output_dir: PathBuf,

        /// Population size
        #[clap(long, default_value = "120")]
        n_individuals: usize,

        /// Number of latent groups
        #[clap(long, default_value = "3")]
        n_groups: usize,

        /// Number of trait dimensions
        #[clap(long, default_value = "5")]
        n_traits: usize,

        /// Random seed
        #[clap(long, default_value = "42")]
        seed: u64,
    },

    /// Extract hyperedges from the relational views and build the hypergraph
    Extract {
        #[clap(flatten)]
        inputs: InputArgs,

        #[clap(flatten)]
        views: ViewArgs,

        /// Output directory for hyperedges.json and hypergraph_structure.json
        #[clap(long, default_value = "hypergraph_results")]
        output_dir: PathBuf,
    },

    /// Partition a saved hypergraph into communities
    Cluster {
        /// Path to hypergraph_structure.json
        #[clap(long)]
        hypergraph: PathBuf,

        #[clap(flatten)]
        detection: DetectionArgs,

        /// Output path for the cluster assignment CSV
        #[clap(long, default_value = "hypergraph_cluster_assignments.csv")]
        output: PathBuf,
    },

    /// Compare cluster assignments against the true_group column
    Evaluate {
        /// Path to the cluster assignment CSV
        #[clap(long)]
        assignments: PathBuf,

        /// Path to the individuals CSV with true_group labels
        #[clap(long)]
        individuals: PathBuf,

        /// Output path for the evaluation report
        #[clap(long, default_value = "evaluation.json")]
        output: PathBuf,
    },

    /// Full pipeline: extract, cluster, evaluate, summarize
    Run {
        #[clap(flatten)]
        inputs: InputArgs,

        #[clap(flatten)]
        views: ViewArgs,

        #[clap(flatten)]
        detection: DetectionArgs,

        /// Output directory for all artifacts
        #[clap(long, default_value = "hypergraph_results")]
        output_dir: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct InputArgs {
    /// Path to the individuals CSV
    #[clap(long)]
    individuals: Option<PathBuf>,

    /// Path to the traits CSV
    #[clap(long)]
    traits: Option<PathBuf>,

    /// Path to the genetic distance matrix CSV
    #[clap(long)]
    genetic: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct ViewArgs {
    /// Neighbors per individual for the trait k-NN view
    #[clap(long, default_value = "3")]
    trait_k: usize,

    /// Skip trait standardization before distance computation
    #[clap(long)]
    no_scale_traits: bool,

    /// Neighbors per individual for the genetic k-NN view
    #[clap(long, default_value = "3")]
    genetic_k: usize,

    /// Genetic distance threshold for the close-kin view
    #[clap(long, default_value = "0.25")]
    genetic_threshold: f64,

    /// Minimum hyperedge size for the grouping views
    #[clap(long, default_value = "2")]
    min_group_size: usize,
}

#[derive(clap::Args, Debug)]
struct DetectionArgs {
    /// Edge contribution rule: strict, majority or linear
    #[clap(long, default_value = "majority")]
    rule: String,

    /// Maximum local-moving passes
    #[clap(long, default_value = "50")]
    max_passes: usize,

    /// Seed for the node visitation order
    #[clap(long, default_value = "42")]
    seed: u64,
}

impl ViewArgs {
    fn to_config(&self) -> ViewConfig {
        ViewConfig {
            trait_knn_k: self.trait_k,
            scale_traits: !self.no_scale_traits,
            genetic_knn_k: self.genetic_k,
            genetic_dist_threshold: self.genetic_threshold,
            genetic_min_size: self.min_group_size,
            min_family_size: self.min_group_size,
            min_env_size: self.min_group_size,
            min_family_env_size: self.min_group_size,
        }
    }
}

impl DetectionArgs {
    fn to_config(&self) -> Result<DetectionConfig> {
        let contribution = self.rule.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        Ok(DetectionConfig { contribution, max_passes: self.max_passes, seed: self.seed })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let num_threads = if cli.threads > 0 { cli.threads } else { num_cpus::get() };
    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    match cli.command {
        Command::Simulate { output_dir, n_individuals, n_groups, n_traits, seed } => {
            let config = SimulationConfig {
                n_individuals,
                n_true_groups: n_groups,
                n_traits,
                seed,
                ..Default::default()
            };
            let population = simulate_population(&config)?;
            storage::save_simulated_population(&population, &output_dir)?;
            log::info!("Simulation complete. Tables saved to {}", output_dir.display());
        }

        Command::Extract { inputs, views, output_dir } => {
            let population = load_population(&inputs)?;
            extract_hypergraph(&population, &views.to_config(), &output_dir)?;
        }

        Command::Cluster { hypergraph, detection: args, output } => {
            let h = storage::load_hypergraph(&hypergraph)?;
            let config = args.to_config()?;
            let partition = detection::detect_communities(&h, &config);
            storage::save_assignments(&partition, &output)?;
            log::info!(
                "Clustering complete: {} communities saved to {}",
                partition.cluster_count(),
                output.display()
            );
        }

        Command::Evaluate { assignments, individuals, output } => {
            let partition = storage::load_assignments(&assignments)?;
            let table = data::tables::load_individuals(&individuals)?;
            let report = cluster::metrics::evaluate_against_truth(&table, &partition)?;
            log_report(&report);
            storage::save_evaluation(&report, &output)?;
        }

        Command::Run { inputs, views, detection: args, output_dir } => {
            let population = load_population(&inputs)?;
            let (h, view_counts) =
                extract_hypergraph(&population, &views.to_config(), &output_dir)?;

            let config = args.to_config()?;
            let partition = detection::detect_communities(&h, &config);
            storage::save_assignments(
                &partition,
                &output_dir.join("hypergraph_cluster_assignments.csv"),
            )?;

            let score = detection::modularity(&h, &partition, config.contribution);
            log::info!(
                "Partition: {} communities, modularity {:.4}",
                partition.cluster_count(),
                score
            );

            if let Some(individuals) = &population.individuals {
                match cluster::metrics::evaluate_against_truth(individuals, &partition) {
                    Ok(report) => {
                        log_report(&report);
                        storage::save_evaluation(&report, &output_dir.join("evaluation.json"))?;
                    }
                    Err(e) => log::warn!("Evaluation skipped: {}", e),
                }
            }

            let counts: Vec<(&str, usize)> =
                view_counts.iter().map(|(name, edges)| (*name, edges.len())).collect();
            storage::save_summary(&h, &counts, &partition, score, &output_dir)?;
            log::info!("Analysis complete. Results saved to {}", output_dir.display());
        }
    }

    Ok(())
}

/// Load whichever input tables were supplied; views missing their table
/// report the gap and contribute nothing.
fn load_population(inputs: &InputArgs) -> Result<PopulationData> {
    let mut population = PopulationData::default();

    if let Some(path) = &inputs.individuals {
        population.individuals = Some(data::tables::load_individuals(path)?);
    }
    if let Some(path) = &inputs.traits {
        population.traits = Some(data::tables::load_traits(path)?);
    }
    if let Some(path) = &inputs.genetic {
        population.genetic = Some(data::tables::load_genetic_distances(path)?);
    }

    if population.individuals.is_none()
        && population.traits.is_none()
        && population.genetic.is_none()
    {
        return Err(error::AnalyzerError::InputMissing(
            "no input tables supplied; pass at least one of --individuals, --traits, --genetic"
                .into(),
        )
        .into());
    }

    Ok(population)
}

/// Extract all views, consolidate, build and persist the hypergraph.
#[allow(clippy::type_complexity)]
fn extract_hypergraph(
    population: &PopulationData,
    view_config: &ViewConfig,
    output_dir: &Path,
) -> Result<(Hypergraph, Vec<(&'static str, Vec<hypergraph::Hyperedge>)>)> {
    std::fs::create_dir_all(output_dir)?;

    let strategies = views::default_strategies(view_config);
    let view_edges = views::extract_all(&strategies, population);

    let consolidated: BTreeSet<hypergraph::Hyperedge> =
        views::consolidate(view_edges.iter().map(|(_, edges)| edges.iter().cloned()));
    if consolidated.is_empty() {
        log::warn!("No view produced hyperedges; the hypergraph will be empty");
    }
    log::info!("Consolidated {} unique hyperedges", consolidated.len());

    storage::save_hyperedges(&consolidated, &output_dir.join("hyperedges.json"))?;

    let h = Hypergraph::from_edges(consolidated);
    storage::save_hypergraph(&h, &output_dir.join("hypergraph_structure.json"))?;

    Ok((h, view_edges))
}

fn log_report(report: &cluster::metrics::EvaluationReport) {
    log::info!(
        "Evaluation over {} individuals: ARI {:.4}, homogeneity {:.4}, completeness {:.4}, V-measure {:.4}",
        report.n_evaluated,
        report.adjusted_rand_index,
        report.homogeneity,
        report.completeness,
        report.v_measure
    );
    for (group, row) in &report.contingency {
        let cells: Vec<String> =
            row.iter().map(|(cluster, count)| format!("C{}:{}", cluster, count)).collect();
        log::info!("  {} -> {}", group, cells.join(" "));
    }
}
