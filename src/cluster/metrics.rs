//! Clustering quality evaluation against ground-truth groups

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use crate::cluster::Partition;
use crate::data::IndividualTable;
use crate::error::AnalyzerError;

/// Agreement metrics between found clusters and true group labels, plus the
/// contingency table they were computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Individuals present in both the assignments and the individuals table.
    pub n_evaluated: usize,
    pub n_clusters: usize,
    pub n_true_groups: usize,
    pub adjusted_rand_index: f64,
    pub homogeneity: f64,
    pub completeness: f64,
    pub v_measure: f64,
    /// true group → (cluster id → count)
    pub contingency: BTreeMap<String, BTreeMap<u32, usize>>,
}

/// Compare a partition against the `true_group` column.
///
/// The join on `individual_id` keeps the intersection only; a row-count
/// shortfall is surfaced as a `MergeMismatch` warning and evaluation
/// proceeds on the rows that matched.
pub fn evaluate_against_truth(
    individuals: &IndividualTable,
    partition: &Partition,
) -> Result<EvaluationReport, AnalyzerError> {
    let mut pairs: Vec<(&str, u32)> = Vec::with_capacity(individuals.len());
    for record in &individuals.records {
        if let Some(cluster) = partition.get(record.id) {
            pairs.push((record.true_group.as_str(), cluster));
        }
    }

    if pairs.is_empty() {
        return Err(AnalyzerError::MergeMismatch { expected: individuals.len(), actual: 0 });
    }
    if pairs.len() < individuals.len() {
        let mismatch = AnalyzerError::MergeMismatch {
            expected: individuals.len(),
            actual: pairs.len(),
        };
        log::warn!("{}; evaluating on the intersection only", mismatch);
    }

    let mut contingency: BTreeMap<String, BTreeMap<u32, usize>> = BTreeMap::new();
    for &(group, cluster) in &pairs {
        *contingency
            .entry(group.to_string())
            .or_default()
            .entry(cluster)
            .or_insert(0) += 1;
    }

    let n = pairs.len();
    let row_sums: Vec<usize> = contingency.values().map(|row| row.values().sum()).collect();
    let mut col_sums: BTreeMap<u32, usize> = BTreeMap::new();
    for row in contingency.values() {
        for (&cluster, &count) in row {
            *col_sums.entry(cluster).or_insert(0) += count;
        }
    }

    let cells: Vec<usize> = contingency
        .values()
        .flat_map(|row| row.values().copied())
        .collect();

    let ari = adjusted_rand_index(&cells, &row_sums, &col_sums.values().copied().collect::<Vec<_>>(), n);
    let (homogeneity, completeness, v_measure) = homogeneity_completeness_v(&contingency, n);

    Ok(EvaluationReport {
        n_evaluated: n,
        n_clusters: col_sums.len(),
        n_true_groups: contingency.len(),
        adjusted_rand_index: ari,
        homogeneity,
        completeness,
        v_measure,
        contingency,
    })
}

fn pairs_of(count: usize) -> f64 {
    (count * count.saturating_sub(1)) as f64 / 2.0
}

fn adjusted_rand_index(cells: &[usize], rows: &[usize], cols: &[usize], n: usize) -> f64 {
    let index: f64 = cells.iter().map(|&c| pairs_of(c)).sum();
    let sum_rows: f64 = rows.iter().map(|&c| pairs_of(c)).sum();
    let sum_cols: f64 = cols.iter().map(|&c| pairs_of(c)).sum();
    let total = pairs_of(n);

    if total == 0.0 {
        return 1.0;
    }
    let expected = sum_rows * sum_cols / total;
    let max = (sum_rows + sum_cols) / 2.0;
    let denom = max - expected;
    if denom.abs() < f64::EPSILON {
        // Both labelings are trivial (all-in-one or all-singletons).
        return 1.0;
    }
    (index - expected) / denom
}

fn homogeneity_completeness_v(
    contingency: &BTreeMap<String, BTreeMap<u32, usize>>,
    n: usize,
) -> (f64, f64, f64) {
    let nf = n as f64;

    let mut col_sums: BTreeMap<u32, usize> = BTreeMap::new();
    for row in contingency.values() {
        for (&cluster, &count) in row {
            *col_sums.entry(cluster).or_insert(0) += count;
        }
    }

    let entropy = |counts: Vec<usize>| -> f64 {
        counts
            .into_iter()
            .filter(|&c| c > 0)
            .map(|c| {
                let p = c as f64 / nf;
                -p * p.ln()
            })
            .sum()
    };

    let h_true = entropy(contingency.values().map(|row| row.values().sum()).collect());
    let h_pred = entropy(col_sums.values().copied().collect());

    // H(true | pred)
    let mut h_true_given_pred = 0.0;
    for (&cluster, &cluster_total) in &col_sums {
        for row in contingency.values() {
            if let Some(&count) = row.get(&cluster) {
                if count > 0 {
                    let joint = count as f64 / nf;
                    h_true_given_pred -= joint * (count as f64 / cluster_total as f64).ln();
                }
            }
        }
    }

    // H(pred | true)
    let mut h_pred_given_true = 0.0;
    for row in contingency.values() {
        let row_total: usize = row.values().sum();
        for &count in row.values() {
            if count > 0 {
                let joint = count as f64 / nf;
                h_pred_given_true -= joint * (count as f64 / row_total as f64).ln();
            }
        }
    }

    let homogeneity = if h_true > 0.0 { 1.0 - h_true_given_pred / h_true } else { 1.0 };
    let completeness = if h_pred > 0.0 { 1.0 - h_pred_given_true / h_pred } else { 1.0 };
    let v_measure = if homogeneity + completeness > 0.0 {
        2.0 * homogeneity * completeness / (homogeneity + completeness)
    } else {
        0.0
    };

    (homogeneity, completeness, v_measure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::IndividualRecord;

    fn individuals(groups: &[(u32, &str)]) -> IndividualTable {
        IndividualTable {
            records: groups
                .iter()
                .map(|&(id, group)| IndividualRecord {
                    id,
                    true_group: group.to_string(),
                    family_id: -1,
                    environment: "E1".to_string(),
                })
                .collect(),
        }
    }

    fn partition(assignments: &[(u32, usize)]) -> Partition {
        let nodes: Vec<u32> = assignments.iter().map(|&(n, _)| n).collect();
        let labels: Vec<usize> = assignments.iter().map(|&(_, l)| l).collect();
        Partition::from_labels(&nodes, &labels)
    }

    #[test]
    fn perfect_clustering_scores_one() {
        let table = individuals(&[(0, "G1"), (1, "G1"), (2, "G2"), (3, "G2")]);
        let p = partition(&[(0, 0), (1, 0), (2, 1), (3, 1)]);

        let report = evaluate_against_truth(&table, &p).unwrap();
        assert!((report.adjusted_rand_index - 1.0).abs() < 1e-9);
        assert!((report.v_measure - 1.0).abs() < 1e-9);
        assert_eq!(report.n_evaluated, 4);
        assert_eq!(report.n_clusters, 2);
    }

    #[test]
    fn single_cluster_scores_zero_ari_full_completeness() {
        let table = individuals(&[(0, "G1"), (1, "G1"), (2, "G2"), (3, "G2")]);
        let p = partition(&[(0, 0), (1, 0), (2, 0), (3, 0)]);

        let report = evaluate_against_truth(&table, &p).unwrap();
        assert!(report.adjusted_rand_index.abs() < 1e-9);
        assert!((report.completeness - 1.0).abs() < 1e-9);
        assert!(report.homogeneity.abs() < 1e-9);
    }

    #[test]
    fn partial_overlap_proceeds_on_intersection() {
        // Individual 9 has no assignment; evaluation covers the other three.
        let table = individuals(&[(0, "G1"), (1, "G1"), (2, "G2"), (9, "G2")]);
        let p = partition(&[(0, 0), (1, 0), (2, 1)]);

        let report = evaluate_against_truth(&table, &p).unwrap();
        assert_eq!(report.n_evaluated, 3);
    }

    #[test]
    fn disjoint_ids_are_a_merge_mismatch() {
        let table = individuals(&[(0, "G1")]);
        let p = partition(&[(5, 0)]);
        assert!(matches!(
            evaluate_against_truth(&table, &p),
            Err(AnalyzerError::MergeMismatch { .. })
        ));
    }

    #[test]
    fn contingency_counts_are_exact() {
        let table = individuals(&[(0, "G1"), (1, "G1"), (2, "G1"), (3, "G2")]);
        let p = partition(&[(0, 0), (1, 0), (2, 1), (3, 1)]);

        let report = evaluate_against_truth(&table, &p).unwrap();
        assert_eq!(report.contingency["G1"][&0], 2);
        assert_eq!(report.contingency["G1"][&1], 1);
        assert_eq!(report.contingency["G2"][&1], 1);
    }
}
