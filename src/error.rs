//! Error taxonomy for the analysis pipeline

use thiserror::Error;

/// Errors surfaced by data loading, view extraction and hypergraph construction.
///
/// View extraction errors are reported to the caller, never raised fatally:
/// a view whose required input is absent contributes zero hyperedges and the
/// pipeline continues with the remaining views.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// A required file or column is absent.
    #[error("required input missing: {0}")]
    InputMissing(String),

    /// A record could not be interpreted (non-integer member, non-numeric
    /// trait value, asymmetric or negative genetic distance). The offending
    /// record is skipped with a warning.
    #[error("malformed data: {0}")]
    MalformedData(String),

    /// An invalid hyperedge (empty, singleton, or referencing an undeclared
    /// node). The hyperedge is dropped, never silently kept.
    #[error("structural error: {0}")]
    Structural(String),

    /// A join on `individual_id` produced fewer rows than expected.
    /// Evaluation proceeds on the intersection only.
    #[error("merge mismatch: expected {expected} rows, join produced {actual}")]
    MergeMismatch { expected: usize, actual: usize },
}
