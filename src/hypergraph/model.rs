//! Hypergraph structure with incidence queries and serialization

use crate::error::AnalyzerError;
use crate::hypergraph::Hyperedge;
use std::collections::{BTreeSet, HashMap};
use serde::{Serialize, Deserialize};

/// A node set together with a set of hyperedges over it.
///
/// Immutable after construction. The node list is sorted and the edge list is
/// kept in canonical (sorted) order, so iteration order is deterministic and
/// independent of the order edges were supplied in. An incidence index built
/// at construction backs the queries the community detector needs.
#[derive(Debug, Clone)]
pub struct Hypergraph {
    nodes: Vec<u32>,
    edges: Vec<Hyperedge>,
    incidence: HashMap<u32, Vec<usize>>,
}

/// On-disk shape of a hypergraph: sorted node ids plus a list of sorted
/// member-id lists. Round-tripping through this structure reproduces the
/// identical node set and hyperedge set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypergraphStructure {
    pub nodes: Vec<u32>,
    pub hyperedges: Vec<Vec<u32>>,
}

impl Hypergraph {
    /// Build a hypergraph from a collection of hyperedges, deriving the node
    /// set as the union of all members.
    pub fn from_edges(edges: impl IntoIterator<Item = Hyperedge>) -> Self {
        let edge_set: BTreeSet<Hyperedge> = edges.into_iter().collect();
        let nodes: BTreeSet<u32> = edge_set
            .iter()
            .flat_map(|e| e.members().iter().copied())
            .collect();

        Self::assemble(nodes.into_iter().collect(), edge_set.into_iter().collect())
    }

    /// Build a hypergraph over an explicitly declared node set.
    ///
    /// Fails with a `StructuralError` if any hyperedge references a node
    /// outside the declared set. The node set may include isolated nodes.
    pub fn with_nodes(
        nodes: impl IntoIterator<Item = u32>,
        edges: impl IntoIterator<Item = Hyperedge>,
    ) -> Result<Self, AnalyzerError> {
        let node_set: BTreeSet<u32> = nodes.into_iter().collect();
        let edge_set: BTreeSet<Hyperedge> = edges.into_iter().collect();

        for edge in &edge_set {
            for &m in edge.members() {
                if !node_set.contains(&m) {
                    return Err(AnalyzerError::Structural(format!(
                        "hyperedge {:?} references undeclared node {}",
                        edge.members(),
                        m
                    )));
                }
            }
        }

        Ok(Self::assemble(
            node_set.into_iter().collect(),
            edge_set.into_iter().collect(),
        ))
    }

    fn assemble(nodes: Vec<u32>, edges: Vec<Hyperedge>) -> Self {
        let mut incidence: HashMap<u32, Vec<usize>> =
            nodes.iter().map(|&n| (n, Vec::new())).collect();
        for (idx, edge) in edges.iter().enumerate() {
            for &m in edge.members() {
                incidence.entry(m).or_default().push(idx);
            }
        }

        Self { nodes, edges, incidence }
    }

    /// Node ids in ascending order.
    pub fn nodes(&self) -> &[u32] {
        &self.nodes
    }

    /// Hyperedges in canonical order.
    pub fn edges(&self) -> &[Hyperedge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of hyperedges incident to a node (0 for unknown nodes).
    pub fn degree(&self, node: u32) -> usize {
        self.incidence.get(&node).map_or(0, |v| v.len())
    }

    /// Indices into `edges()` of the hyperedges incident to a node.
    pub fn incident_edges(&self, node: u32) -> &[usize] {
        self.incidence.get(&node).map_or(&[], |v| v.as_slice())
    }

    /// Export the serializable structure: sorted nodes, sorted member lists.
    pub fn to_structure(&self) -> HypergraphStructure {
        HypergraphStructure {
            nodes: self.nodes.clone(),
            hyperedges: self.edges.iter().map(|e| e.members().to_vec()).collect(),
        }
    }

    /// Reconstruct a hypergraph from its serialized structure.
    ///
    /// Structurally invalid hyperedges (fewer than two distinct members) are
    /// dropped with a warning rather than silently kept; a member id outside
    /// the declared node list fails the whole import.
    pub fn from_structure(structure: &HypergraphStructure) -> Result<Self, AnalyzerError> {
        let mut edges = Vec::with_capacity(structure.hyperedges.len());
        for members in &structure.hyperedges {
            match Hyperedge::new(members.iter().copied()) {
                Ok(edge) => edges.push(edge),
                Err(e) => log::warn!("Dropping invalid hyperedge {:?}: {}", members, e),
            }
        }

        Self::with_nodes(structure.nodes.iter().copied(), edges)
    }
}
