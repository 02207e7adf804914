//! Persistence of pipeline artifacts
//!
//! CSV tables exchanged with the simulator and evaluator, JSON for the
//! hyperedge list and the hypergraph structure, plus a run summary.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use anyhow::Result;
use itertools::Itertools;
use polars::prelude::*;
use serde_json::{json, to_string_pretty};
use crate::cluster::metrics::EvaluationReport;
use crate::cluster::Partition;
use crate::data::simulate::SimulatedPopulation;
use crate::error::AnalyzerError;
use crate::hypergraph::{Hyperedge, Hypergraph, HypergraphStructure};

/// Save the consolidated hyperedge list as a JSON list of member-id lists.
/// An empty outer list is valid and means "no hyperedges".
pub fn save_hyperedges(edges: &BTreeSet<Hyperedge>, path: &Path) -> Result<()> {
    log::info!("Saving {} hyperedges to {}", edges.len(), path.display());

    let lists: Vec<&[u32]> = edges.iter().map(|e| e.members()).collect();
    let mut file = File::create(path)?;
    file.write_all(to_string_pretty(&lists)?.as_bytes())?;

    Ok(())
}

/// Load a hyperedge list, skipping malformed records instead of aborting:
/// non-integer members are `MalformedData`, undersized member sets are
/// structural defects; both are dropped with a warning.
pub fn load_hyperedges(path: &Path) -> Result<Vec<Hyperedge>> {
    if !path.exists() {
        return Err(AnalyzerError::InputMissing(format!("file not found: {}", path.display())).into());
    }

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    let outer = raw.as_array().ok_or_else(|| {
        AnalyzerError::MalformedData(format!("{} is not a JSON list", path.display()))
    })?;

    let mut edges = Vec::with_capacity(outer.len());
    for (i, entry) in outer.iter().enumerate() {
        let Some(members) = entry.as_array() else {
            log::warn!("Skipping hyperedge {}: not a list", i);
            continue;
        };

        let mut ids = Vec::with_capacity(members.len());
        let mut malformed = false;
        for member in members {
            match member.as_i64() {
                Some(id) if id >= 0 => ids.push(id as u32),
                _ => {
                    log::warn!("Skipping hyperedge {}: non-integer member {}", i, member);
                    malformed = true;
                    break;
                }
            }
        }
        if malformed {
            continue;
        }

        match Hyperedge::new(ids) {
            Ok(edge) => edges.push(edge),
            Err(e) => log::warn!("Dropping hyperedge {}: {}", i, e),
        }
    }

    log::info!("Loaded {} valid hyperedges from {}", edges.len(), path.display());
    Ok(edges)
}

/// Save the hypergraph structure (`nodes` + `hyperedges`).
pub fn save_hypergraph(hypergraph: &Hypergraph, path: &Path) -> Result<()> {
    log::info!(
        "Saving hypergraph structure ({} nodes, {} hyperedges) to {}",
        hypergraph.node_count(),
        hypergraph.edge_count(),
        path.display()
    );

    let mut file = File::create(path)?;
    file.write_all(to_string_pretty(&hypergraph.to_structure())?.as_bytes())?;

    Ok(())
}

/// Reconstruct a hypergraph from its saved structure.
pub fn load_hypergraph(path: &Path) -> Result<Hypergraph> {
    if !path.exists() {
        return Err(AnalyzerError::InputMissing(format!("file not found: {}", path.display())).into());
    }

    let structure: HypergraphStructure = serde_json::from_str(&fs::read_to_string(path)?)?;
    let hypergraph = Hypergraph::from_structure(&structure)?;

    log::info!(
        "Loaded hypergraph with {} nodes and {} hyperedges from {}",
        hypergraph.node_count(),
        hypergraph.edge_count(),
        path.display()
    );
    Ok(hypergraph)
}

/// Save cluster assignments as CSV, one row per individual, sorted by
/// `individual_id` for reproducible diffing.
pub fn save_assignments(partition: &Partition, path: &Path) -> Result<()> {
    log::info!("Saving {} cluster assignments to {}", partition.len(), path.display());

    let mut file = File::create(path)?;
    writeln!(file, "individual_id,cluster_id")?;
    for (node, cluster) in partition.iter() {
        writeln!(file, "{},{}", node, cluster)?;
    }

    Ok(())
}

/// Load cluster assignments produced by `save_assignments`.
pub fn load_assignments(path: &Path) -> Result<Partition> {
    if !path.exists() {
        return Err(AnalyzerError::InputMissing(format!("file not found: {}", path.display())).into());
    }

    let df = LazyCsvReader::new(path).with_has_header(true).finish()?.collect()?;
    let ids = df
        .column("individual_id")
        .map_err(|_| AnalyzerError::InputMissing("column 'individual_id' missing".into()))?
        .i64()?;
    let clusters = df
        .column("cluster_id")
        .map_err(|_| AnalyzerError::InputMissing("column 'cluster_id' missing".into()))?
        .i64()?;

    let mut pairs: Vec<(u32, usize)> = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        match (ids.get(i), clusters.get(i)) {
            (Some(id), Some(cluster)) if id >= 0 && cluster >= 0 => {
                pairs.push((id as u32, cluster as usize));
            }
            other => log::warn!("Skipping assignments row {}: {:?}", i, other),
        }
    }
    pairs.sort_by_key(|&(id, _)| id);

    let nodes: Vec<u32> = pairs.iter().map(|&(id, _)| id).collect();
    let labels: Vec<usize> = pairs.iter().map(|&(_, c)| c).collect();
    Ok(Partition::from_labels(&nodes, &labels))
}

/// Write the three simulated tables in the layout the loaders expect.
pub fn save_simulated_population(population: &SimulatedPopulation, output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)?;

    let individuals_path = output_dir.join("simulated_individuals.csv");
    let mut file = File::create(&individuals_path)?;
    writeln!(file, "individual_id,true_group,family_id,environment")?;
    for record in &population.individuals.records {
        writeln!(
            file,
            "{},{},{},{}",
            record.id, record.true_group, record.family_id, record.environment
        )?;
    }
    log::info!("Saved individuals to {}", individuals_path.display());

    let traits_path = output_dir.join("simulated_traits.csv");
    let mut file = File::create(&traits_path)?;
    writeln!(file, "individual_id,{}", population.traits.trait_names.join(","))?;
    for (i, &id) in population.traits.ids.iter().enumerate() {
        let row = population.traits.values.row(i).iter().join(",");
        writeln!(file, "{},{}", id, row)?;
    }
    log::info!("Saved traits to {}", traits_path.display());

    let genetic_path = output_dir.join("simulated_genetic_distances.csv");
    let mut file = File::create(&genetic_path)?;
    writeln!(file, "individual_id_row,{}", population.genetic.ids.iter().join(","))?;
    for (i, &id) in population.genetic.ids.iter().enumerate() {
        let row = population.genetic.matrix.row(i).iter().join(",");
        writeln!(file, "{},{}", id, row)?;
    }
    log::info!("Saved genetic distances to {}", genetic_path.display());

    Ok(())
}

/// Save the evaluation report.
pub fn save_evaluation(report: &EvaluationReport, path: &Path) -> Result<()> {
    log::info!("Saving evaluation report to {}", path.display());

    let mut file = File::create(path)?;
    file.write_all(to_string_pretty(report)?.as_bytes())?;

    Ok(())
}

/// Save run summary: hypergraph shape, per-view hyperedge counts, cluster
/// sizes and the final modularity score.
pub fn save_summary(
    hypergraph: &Hypergraph,
    view_counts: &[(&str, usize)],
    partition: &Partition,
    modularity: f64,
    output_dir: &Path,
) -> Result<()> {
    let path = output_dir.join("summary.json");
    log::info!("Saving run summary to {}", path.display());

    let clusters = partition.clusters();
    let sizes: Vec<usize> = clusters.values().map(|m| m.len()).collect();

    let summary = json!({
        "hypergraph": {
            "node_count": hypergraph.node_count(),
            "hyperedge_count": hypergraph.edge_count(),
            "avg_hyperedge_size": if hypergraph.edge_count() == 0 { 0.0 } else {
                hypergraph.edges().iter().map(|e| e.len()).sum::<usize>() as f64
                    / hypergraph.edge_count() as f64
            },
        },
        "views": view_counts.iter()
            .map(|&(name, count)| json!({ "view": name, "hyperedges": count }))
            .collect::<Vec<_>>(),
        "clustering": {
            "cluster_count": partition.cluster_count(),
            "assigned_nodes": partition.len(),
            "largest_cluster_size": sizes.iter().max().copied().unwrap_or(0),
            "smallest_cluster_size": sizes.iter().min().copied().unwrap_or(0),
            "modularity": modularity,
        }
    });

    let mut file = File::create(path)?;
    file.write_all(to_string_pretty(&summary)?.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::simulate::{simulate_population, SimulationConfig};
    use crate::data::tables;

    fn edge(members: &[u32]) -> Hyperedge {
        Hyperedge::new(members.iter().copied()).unwrap()
    }

    #[test]
    fn hyperedge_list_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hyperedges.json");

        let edges: BTreeSet<Hyperedge> =
            [edge(&[1, 2, 3]), edge(&[4, 5])].into_iter().collect();
        save_hyperedges(&edges, &path).unwrap();

        let loaded: BTreeSet<Hyperedge> = load_hyperedges(&path).unwrap().into_iter().collect();
        assert_eq!(loaded, edges);
    }

    #[test]
    fn lenient_hyperedge_loading_skips_bad_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hyperedges.json");
        fs::write(&path, r#"[[1, 2], [3, "x"], [4], [], [5, 6, 5]]"#).unwrap();

        let loaded = load_hyperedges(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].members(), &[1, 2]);
        assert_eq!(loaded[1].members(), &[5, 6]);
    }

    #[test]
    fn empty_hyperedge_list_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hyperedges.json");
        fs::write(&path, "[]").unwrap();
        assert!(load_hyperedges(&path).unwrap().is_empty());
    }

    #[test]
    fn hypergraph_structure_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hypergraph_structure.json");

        let h = Hypergraph::from_edges([edge(&[1, 2, 3]), edge(&[3, 4])]);
        save_hypergraph(&h, &path).unwrap();
        let loaded = load_hypergraph(&path).unwrap();

        assert_eq!(loaded.nodes(), h.nodes());
        assert_eq!(loaded.edges(), h.edges());
    }

    #[test]
    fn assignments_round_trip_sorted_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assignments.csv");

        let partition = Partition::from_labels(&[1, 2, 5, 9], &[0, 0, 3, 3]);
        save_assignments(&partition, &path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "individual_id,cluster_id\n1,0\n2,0\n5,1\n9,1\n"
        );

        let loaded = load_assignments(&path).unwrap();
        assert_eq!(loaded, partition);
    }

    #[test]
    fn simulated_tables_reload_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let config = SimulationConfig { n_individuals: 20, n_families: 3, ..Default::default() };
        let population = simulate_population(&config).unwrap();

        save_simulated_population(&population, dir.path()).unwrap();

        let individuals =
            tables::load_individuals(&dir.path().join("simulated_individuals.csv")).unwrap();
        let traits = tables::load_traits(&dir.path().join("simulated_traits.csv")).unwrap();
        let genetic =
            tables::load_genetic_distances(&dir.path().join("simulated_genetic_distances.csv"))
                .unwrap();

        assert_eq!(individuals.len(), 20);
        assert_eq!(traits.ids, population.traits.ids);
        assert_eq!(genetic.ids, population.genetic.ids);
        for i in 0..20 {
            for j in 0..20 {
                assert!(
                    (genetic.matrix[[i, j]] - population.genetic.matrix[[i, j]]).abs() < 1e-9
                );
            }
        }
    }
}
