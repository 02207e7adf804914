//! Hypergraph data model and serialization

pub mod edge;
pub mod model;

pub use edge::Hyperedge;
pub use model::{Hypergraph, HypergraphStructure};
