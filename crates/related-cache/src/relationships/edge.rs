//! Relationship Edge - immutable join descriptor discovered during a walk

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::metadata::{Cardinality, RelationshipField};

/// One relationship of one owning type, as needed to re-link cached records.
///
/// Identity is `(owning_type, related_type, accessor, match_field,
/// remote_match_field)`. Ordering sorts by owning and related type first so
/// that reconciliation visits edges in a reproducible order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipEdge {
    owning_type: String,
    related_type: String,
    accessor: String,
    match_field: String,
    remote_match_field: String,
    cardinality: Cardinality,
}

impl RelationshipEdge {
    /// Create an edge from its parts
    pub fn new(
        owning_type: &str,
        cardinality: Cardinality,
        match_field: &str,
        related_type: &str,
        remote_match_field: &str,
        accessor: &str,
    ) -> Self {
        Self {
            owning_type: owning_type.to_string(),
            related_type: related_type.to_string(),
            accessor: accessor.to_string(),
            match_field: match_field.to_string(),
            remote_match_field: remote_match_field.to_string(),
            cardinality,
        }
    }

    /// Derive the edge for `field` declared on `owning_type`
    pub fn from_field(owning_type: &str, field: &RelationshipField) -> Self {
        Self::new(
            owning_type,
            field.cardinality,
            &field.match_field,
            &field.related_type,
            &field.remote_match_field,
            &field.accessor,
        )
    }

    pub fn owning_type(&self) -> &str {
        &self.owning_type
    }

    pub fn related_type(&self) -> &str {
        &self.related_type
    }

    pub fn accessor(&self) -> &str {
        &self.accessor
    }

    pub fn match_field(&self) -> &str {
        &self.match_field
    }

    pub fn remote_match_field(&self) -> &str {
        &self.remote_match_field
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    fn identity(&self) -> (&str, &str, &str, &str, &str) {
        (
            &self.owning_type,
            &self.related_type,
            &self.accessor,
            &self.match_field,
            &self.remote_match_field,
        )
    }
}

impl PartialEq for RelationshipEdge {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for RelationshipEdge {}

impl Hash for RelationshipEdge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for RelationshipEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RelationshipEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl std::fmt::Display for RelationshipEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{} ({}, via {})",
            self.owning_type,
            self.match_field,
            self.related_type,
            self.remote_match_field,
            self.cardinality,
            self.accessor
        )
    }
}
