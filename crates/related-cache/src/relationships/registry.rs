//! Relationship Registry - edges discovered per record type during one episode

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use dashmap::DashMap;

use super::edge::RelationshipEdge;
use super::metadata::Cardinality;

/// Registry of relationship edges keyed by owning type name.
///
/// Grows monotonically: edges are only ever added during an episode.
#[derive(Debug, Clone, Default)]
pub struct RelationshipRegistry {
    /// Map of owning type name -> set of edges
    edges: Arc<DashMap<String, BTreeSet<RelationshipEdge>>>,
}

impl RelationshipRegistry {
    /// Create a new empty relationship registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an edge under its owning type. Returns false if an equal edge
    /// was already registered.
    pub fn register(&self, edge: RelationshipEdge) -> bool {
        let mut type_edges = self
            .edges
            .entry(edge.owning_type().to_string())
            .or_insert_with(BTreeSet::new);

        type_edges.insert(edge)
    }

    /// Check if an equal edge is registered
    pub fn contains(&self, edge: &RelationshipEdge) -> bool {
        self.edges
            .get(edge.owning_type())
            .map(|type_edges| type_edges.contains(edge))
            .unwrap_or(false)
    }

    /// Get all edges registered for an owning type, in edge order
    pub fn edges_for(&self, owning_type: &str) -> Vec<RelationshipEdge> {
        self.edges
            .get(owning_type)
            .map(|type_edges| type_edges.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every registered edge sorted by `(owning_type, related_type)` then identity
    pub fn sorted_edges(&self) -> Vec<RelationshipEdge> {
        let mut all: Vec<RelationshipEdge> = self
            .edges
            .iter()
            .flat_map(|entry| entry.value().iter().cloned().collect::<Vec<_>>())
            .collect();
        all.sort();
        all
    }

    /// Owning type names with at least one edge, sorted
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.edges.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Total number of edges
    pub fn len(&self) -> usize {
        self.edges.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get statistics about the registry
    pub fn stats(&self) -> RegistryStats {
        let mut cardinality_counts = HashMap::new();
        for entry in self.edges.iter() {
            for edge in entry.value() {
                *cardinality_counts.entry(edge.cardinality()).or_insert(0) += 1;
            }
        }

        RegistryStats {
            total_types: self.edges.len(),
            total_edges: self.len(),
            cardinality_counts,
        }
    }
}

/// Statistics about the relationship registry
#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    pub total_types: usize,
    pub total_edges: usize,
    pub cardinality_counts: HashMap<Cardinality, usize>,
}

impl RegistryStats {
    /// Number of edges that reattach a collection
    pub fn collection_edges(&self) -> usize {
        self.cardinality_counts
            .iter()
            .filter(|(cardinality, _)| cardinality.is_collection())
            .map(|(_, count)| *count)
            .sum()
    }
}
