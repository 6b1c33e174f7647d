//! Record Trait - what the cache needs from an externally owned record type
//!
//! Records are created and owned by the data store layer. The cache only
//! reads their key and join fields, walks their relationships and writes
//! re-linked relationship values into their [`RelationSlots`].

use std::fmt::Debug;
use std::sync::Arc;

use serde_json::Value;

use super::primary_key::PrimaryKey;
use super::slots::RelationSlots;
use crate::error::ModelResult;
use crate::relationships::metadata::{RelationshipField, DEFAULT_KEY};

/// Shared handle to a record. Identity is the allocation, not the value.
pub type RecordRef = Arc<dyn Record>;

/// Interface a record type exposes to the related-objects cache
pub trait Record: Send + Sync + Debug {
    /// Schema identity, e.g. the model name
    fn type_name(&self) -> &str;

    /// Primary key, unique within `type_name`
    fn primary_key(&self) -> PrimaryKey;

    /// Name of the primary key field as seen by [`Record::field_value`]
    fn primary_key_name(&self) -> &str {
        DEFAULT_KEY
    }

    /// Ordered relationship fields of this record's type
    fn relationship_fields(&self) -> Vec<RelationshipField>;

    /// Scalar value of a field, used as a join-key value
    fn field_value(&self, field: &str) -> Option<Value>;

    /// Read a relationship value.
    ///
    /// Returns `ModelError::FetchForbidden` when the value is not loaded and
    /// fetching it is currently disallowed. A legitimately empty relationship
    /// is `Related::One(None)` or an empty `Related::Many`, never an error.
    fn read_related(&self, field: &RelationshipField) -> ModelResult<Related>;

    /// Settable relationship attributes and collections
    fn relation_slots(&self) -> &RelationSlots;

    /// Look up a relationship field by field name or accessor
    fn relationship_field(&self, name: &str) -> Option<RelationshipField> {
        self.relationship_fields()
            .into_iter()
            .find(|field| field.name == name || field.accessor == name)
    }

    /// Join-key value of a field; JSON null counts as absent
    fn join_value(&self, field: &str) -> Option<Value> {
        self.field_value(field).filter(|value| !value.is_null())
    }

    /// Attach a relationship value under `accessor`
    fn attach(&self, accessor: &str, related: Related) {
        self.relation_slots().attach(accessor, related);
    }

    /// Relationship value previously attached under `accessor`
    fn attached(&self, accessor: &str) -> Option<Related> {
        self.relation_slots().get(accessor)
    }
}

/// True when both handles point at the same record instance
pub fn same_instance(a: &RecordRef, b: &RecordRef) -> bool {
    // Compare data pointers only; vtable pointers for the same type may differ.
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Value of one relationship: a single optional record or an ordered collection
#[derive(Debug, Clone)]
pub enum Related {
    One(Option<RecordRef>),
    Many(Vec<RecordRef>),
}

impl Related {
    /// An empty single-valued relationship
    pub fn none() -> Self {
        Related::One(None)
    }

    /// An empty collection
    pub fn empty() -> Self {
        Related::Many(Vec::new())
    }

    /// All contained records in order
    pub fn records(&self) -> Vec<RecordRef> {
        match self {
            Related::One(record) => record.iter().cloned().collect(),
            Related::Many(records) => records.clone(),
        }
    }

    /// The record of a single-valued relationship, or the first of a collection
    pub fn first(&self) -> Option<RecordRef> {
        match self {
            Related::One(record) => record.clone(),
            Related::Many(records) => records.first().cloned(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Related::One(record) => usize::from(record.is_some()),
            Related::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Related::Many(_))
    }

    /// Same shape and the same record instances in the same order
    pub fn is_same(&self, other: &Related) -> bool {
        match (self, other) {
            (Related::One(None), Related::One(None)) => true,
            (Related::One(Some(a)), Related::One(Some(b))) => same_instance(a, b),
            (Related::Many(a), Related::Many(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_instance(x, y))
            }
            _ => false,
        }
    }
}
