//! Population data tables and loading

pub mod tables;
pub mod simulate;

use ndarray::Array2;

/// Sentinel family id for individuals not assigned to any family.
pub const NO_FAMILY: i64 = -1;

/// One row of the individuals table.
#[derive(Debug, Clone)]
pub struct IndividualRecord {
    pub id: u32,
    pub true_group: String,
    pub family_id: i64,
    pub environment: String,
}

/// Individuals with their categorical attributes (ground-truth group,
/// family membership, environment).
#[derive(Debug, Clone, Default)]
pub struct IndividualTable {
    pub records: Vec<IndividualRecord>,
}

impl IndividualTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Real-valued trait measurements, one row per individual, one column per
/// trait dimension (`trait_0 .. trait_{N-1}`).
#[derive(Debug, Clone)]
pub struct TraitTable {
    pub ids: Vec<u32>,
    pub trait_names: Vec<String>,
    pub values: Array2<f64>,
}

/// Symmetric genetic-distance matrix with zero diagonal, indexed by
/// individual id in row order.
#[derive(Debug, Clone)]
pub struct GeneticDistances {
    pub ids: Vec<u32>,
    pub matrix: Array2<f64>,
}

/// The read-only input snapshot a pipeline run extracts hyperedges from.
/// Any table may be absent; views requiring a missing table report
/// `InputMissing` and contribute zero hyperedges.
#[derive(Debug, Clone, Default)]
pub struct PopulationData {
    pub individuals: Option<IndividualTable>,
    pub traits: Option<TraitTable>,
    pub genetic: Option<GeneticDistances>,
}
