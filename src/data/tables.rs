//! CSV loading for population tables

use std::path::Path;
use anyhow::Result;
use ndarray::Array2;
use polars::prelude::*;
use crate::data::{GeneticDistances, IndividualRecord, IndividualTable, TraitTable};
use crate::error::AnalyzerError;

/// Tolerance when checking symmetry of the genetic-distance matrix.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

fn scan_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(AnalyzerError::InputMissing(format!("file not found: {}", path.display())).into());
    }

    log::info!("Reading CSV file: {}", path.display());
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()?
        .collect()?;

    Ok(df)
}

fn require_column<'a>(df: &'a DataFrame, name: &str, path: &Path) -> Result<&'a Column> {
    df.column(name).map_err(|_| {
        AnalyzerError::InputMissing(format!(
            "column '{}' missing from {}",
            name,
            path.display()
        ))
        .into()
    })
}

/// Load the individuals table: `individual_id`, `true_group`, `family_id`
/// (`-1` = unassigned), `environment`.
pub fn load_individuals(path: &Path) -> Result<IndividualTable> {
    let df = scan_csv(path)?;

    let ids = require_column(&df, "individual_id", path)?.i64()?;
    let groups = require_column(&df, "true_group", path)?.str()?;
    let families = require_column(&df, "family_id", path)?.i64()?;
    let environments = require_column(&df, "environment", path)?.str()?;

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let id = match ids.get(i) {
            Some(id) if id >= 0 => id as u32,
            other => {
                log::warn!("Skipping individuals row {}: invalid individual_id {:?}", i, other);
                continue;
            }
        };
        let (Some(group), Some(env)) = (groups.get(i), environments.get(i)) else {
            log::warn!("Skipping individuals row {}: missing group or environment", i);
            continue;
        };

        records.push(IndividualRecord {
            id,
            true_group: group.to_string(),
            family_id: families.get(i).unwrap_or(crate::data::NO_FAMILY),
            environment: env.to_string(),
        });
    }

    log::info!("Loaded {} individuals from {}", records.len(), path.display());
    Ok(IndividualTable { records })
}

/// Load the traits table: `individual_id` plus every `trait_*` column.
pub fn load_traits(path: &Path) -> Result<TraitTable> {
    let df = scan_csv(path)?;

    let ids_col = require_column(&df, "individual_id", path)?.i64()?;
    let trait_names: Vec<String> = df
        .get_column_names()
        .iter()
        .filter(|name| name.starts_with("trait_"))
        .map(|name| name.to_string())
        .collect();

    if trait_names.is_empty() {
        return Err(AnalyzerError::InputMissing(format!(
            "no trait_* columns found in {}",
            path.display()
        ))
        .into());
    }

    let mut trait_cols = Vec::with_capacity(trait_names.len());
    for name in &trait_names {
        let col = df.column(name)?.cast(&DataType::Float64)?;
        trait_cols.push(col.f64()?.clone());
    }

    let mut ids = Vec::with_capacity(df.height());
    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let id = match ids_col.get(i) {
            Some(id) if id >= 0 => id as u32,
            other => {
                log::warn!("Skipping traits row {}: invalid individual_id {:?}", i, other);
                continue;
            }
        };

        let mut row = Vec::with_capacity(trait_cols.len());
        let mut malformed = false;
        for (col, name) in trait_cols.iter().zip(&trait_names) {
            match col.get(i) {
                Some(v) if v.is_finite() => row.push(v),
                _ => {
                    log::warn!(
                        "Skipping traits row {} (id {}): non-numeric value in {}",
                        i, id, name
                    );
                    malformed = true;
                    break;
                }
            }
        }
        if malformed {
            continue;
        }

        ids.push(id);
        rows.push(row);
    }

    let n_rows = ids.len();
    let n_traits = trait_names.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    let values = Array2::from_shape_vec((n_rows, n_traits), flat)?;

    log::info!(
        "Loaded traits for {} individuals ({} dimensions) from {}",
        n_rows, n_traits, path.display()
    );
    Ok(TraitTable { ids, trait_names, values })
}

/// Load the genetic-distance matrix: first column holds row ids, remaining
/// column headers are individual ids. Asymmetric or negative entries are
/// reported and repaired (mirrored / clamped) rather than aborting the load.
pub fn load_genetic_distances(path: &Path) -> Result<GeneticDistances> {
    let df = scan_csv(path)?;

    let names = df.get_column_names();
    if names.len() < 2 {
        return Err(AnalyzerError::InputMissing(format!(
            "genetic distance matrix {} has no id columns",
            path.display()
        ))
        .into());
    }

    let row_id_name = names[0].to_string();
    let mut col_ids = Vec::with_capacity(names.len() - 1);
    for name in names.iter().skip(1) {
        let id: u32 = name.parse().map_err(|_| {
            AnalyzerError::MalformedData(format!(
                "genetic distance column header '{}' is not an individual id",
                name
            ))
        })?;
        col_ids.push(id);
    }

    let row_ids_col = df.column(&row_id_name)?.cast(&DataType::Int64)?;
    let row_ids_col = row_ids_col.i64()?;
    let mut row_ids = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        match row_ids_col.get(i) {
            Some(id) if id >= 0 => row_ids.push(id as u32),
            other => {
                return Err(AnalyzerError::MalformedData(format!(
                    "invalid row id {:?} at genetic distance row {}",
                    other, i
                ))
                .into());
            }
        }
    }

    if row_ids != col_ids {
        return Err(AnalyzerError::MalformedData(
            "genetic distance matrix row ids do not match column ids".to_string(),
        )
        .into());
    }

    let n = row_ids.len();
    let mut matrix = Array2::zeros((n, n));
    for (j, name) in names.iter().skip(1).enumerate() {
        let col = df.column(name)?.cast(&DataType::Float64)?;
        let col = col.f64()?.clone();
        for i in 0..n {
            let v = col.get(i).ok_or_else(|| {
                AnalyzerError::MalformedData(format!(
                    "missing genetic distance at ({}, {})",
                    row_ids[i], col_ids[j]
                ))
            })?;
            matrix[[i, j]] = v;
        }
    }

    // Repair pass: warn on negative or asymmetric entries, keep going.
    for i in 0..n {
        if matrix[[i, i]] != 0.0 {
            log::warn!("Nonzero diagonal at id {}: {}", row_ids[i], matrix[[i, i]]);
            matrix[[i, i]] = 0.0;
        }
        for j in (i + 1)..n {
            let (a, b) = (matrix[[i, j]], matrix[[j, i]]);
            if a < 0.0 || b < 0.0 {
                log::warn!("Negative genetic distance between {} and {}", row_ids[i], row_ids[j]);
            }
            if (a - b).abs() > SYMMETRY_TOLERANCE {
                log::warn!(
                    "Asymmetric genetic distance between {} and {} ({} vs {}), using mean",
                    row_ids[i], row_ids[j], a, b
                );
            }
            let repaired = ((a + b) / 2.0).max(0.0);
            matrix[[i, j]] = repaired;
            matrix[[j, i]] = repaired;
        }
    }

    log::info!("Loaded {}x{} genetic distance matrix from {}", n, n, path.display());
    Ok(GeneticDistances { ids: row_ids, matrix })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn individuals_round_trip() {
        let file = write_temp(
            "individual_id,true_group,family_id,environment\n\
             0,G1,-1,E1\n\
             1,G2,3,E2\n",
        );
        let table = load_individuals(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].id, 0);
        assert_eq!(table.records[1].family_id, 3);
        assert_eq!(table.records[1].environment, "E2");
    }

    #[test]
    fn missing_column_is_input_missing() {
        let file = write_temp("individual_id,true_group\n0,G1\n");
        let err = load_individuals(file.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalyzerError>(),
            Some(AnalyzerError::InputMissing(_))
        ));
    }

    #[test]
    fn traits_load_with_dimensions() {
        let file = write_temp(
            "individual_id,trait_0,trait_1\n\
             0,1.5,-0.25\n\
             1,2.0,0.75\n",
        );
        let traits = load_traits(file.path()).unwrap();
        assert_eq!(traits.ids, vec![0, 1]);
        assert_eq!(traits.trait_names, vec!["trait_0", "trait_1"]);
        assert_eq!(traits.values[[1, 0]], 2.0);
    }

    #[test]
    fn genetic_matrix_is_symmetrized() {
        let file = write_temp(
            "individual_id_row,0,1\n\
             0,0.0,0.4\n\
             1,0.6,0.0\n",
        );
        let genetic = load_genetic_distances(file.path()).unwrap();
        assert_eq!(genetic.ids, vec![0, 1]);
        assert!((genetic.matrix[[0, 1]] - 0.5).abs() < 1e-12);
        assert_eq!(genetic.matrix[[0, 1]], genetic.matrix[[1, 0]]);
    }
}
