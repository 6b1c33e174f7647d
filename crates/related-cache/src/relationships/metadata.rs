//! Relationship Metadata - Declarative relationship schema supplied by record types

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Cardinality of a relationship field, seen from the owning record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// One-to-one, either the side holding the key or the reverse side
    OneToOne,
    /// Many-to-one (belongsTo)
    ManyToOne,
    /// One-to-many (hasMany)
    OneToMany,
    /// Many-to-many
    ManyToMany,
}

impl Cardinality {
    /// Returns true if the relationship resolves to at most one record
    pub fn is_single(self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }

    /// Returns true if this relationship returns a collection
    pub fn is_collection(self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    /// Get the cardinality name as a string
    pub fn as_str(self) -> &'static str {
        match self {
            Cardinality::OneToOne => "one_to_one",
            Cardinality::ManyToOne => "many_to_one",
            Cardinality::OneToMany => "one_to_many",
            Cardinality::ManyToMany => "many_to_many",
        }
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Cardinality {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "one_to_one" => Ok(Cardinality::OneToOne),
            "many_to_one" => Ok(Cardinality::ManyToOne),
            "one_to_many" => Ok(Cardinality::OneToMany),
            "many_to_many" => Ok(Cardinality::ManyToMany),
            _ => Err(ModelError::Configuration(format!(
                "Unknown relationship cardinality '{}'",
                s
            ))),
        }
    }
}

/// Default local/remote key when a relationship joins on the primary key
pub const DEFAULT_KEY: &str = "id";

/// One relationship field of a record type.
///
/// The join is fully declared here: a related record matches when
/// `related.remote_match_field == owner.match_field`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipField {
    /// Field name on the owning record type
    pub name: String,

    /// Cardinality seen from the owning record
    pub cardinality: Cardinality,

    /// Type name of the related records
    pub related_type: String,

    /// Field on the owning record whose value is compared
    pub match_field: String,

    /// Field on the related record compared against `match_field`
    pub remote_match_field: String,

    /// Attribute or collection populated on the owning record
    pub accessor: String,
}

impl RelationshipField {
    /// Create a relationship field with explicit join fields
    pub fn new(
        name: &str,
        cardinality: Cardinality,
        related_type: &str,
        match_field: &str,
        remote_match_field: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            cardinality,
            related_type: related_type.to_string(),
            match_field: match_field.to_string(),
            remote_match_field: remote_match_field.to_string(),
            accessor: name.to_string(),
        }
    }

    /// Many-to-one: this record holds `foreign_key` pointing at the related primary key
    pub fn belongs_to(name: &str, related_type: &str, foreign_key: &str) -> Self {
        Self::new(name, Cardinality::ManyToOne, related_type, foreign_key, DEFAULT_KEY)
    }

    /// One-to-one, key-holding side
    pub fn one_to_one(name: &str, related_type: &str, foreign_key: &str) -> Self {
        Self::new(name, Cardinality::OneToOne, related_type, foreign_key, DEFAULT_KEY)
    }

    /// One-to-one, reverse side: the related record holds `foreign_key`
    pub fn has_one(name: &str, related_type: &str, foreign_key: &str) -> Self {
        Self::new(name, Cardinality::OneToOne, related_type, DEFAULT_KEY, foreign_key)
    }

    /// One-to-many: every related record holding `foreign_key == self.id`
    pub fn has_many(name: &str, related_type: &str, foreign_key: &str) -> Self {
        Self::new(name, Cardinality::OneToMany, related_type, DEFAULT_KEY, foreign_key)
    }

    /// Many-to-many over explicit join fields
    pub fn many_to_many(
        name: &str,
        related_type: &str,
        match_field: &str,
        remote_match_field: &str,
    ) -> Self {
        Self::new(
            name,
            Cardinality::ManyToMany,
            related_type,
            match_field,
            remote_match_field,
        )
    }

    /// Set the field compared on the owning record
    pub fn with_local_key(mut self, local_key: &str) -> Self {
        self.match_field = local_key.to_string();
        self
    }

    /// Set the field compared on the related record
    pub fn with_remote_key(mut self, remote_key: &str) -> Self {
        self.remote_match_field = remote_key.to_string();
        self
    }

    /// Populate a different attribute than the field name
    pub fn with_accessor(mut self, accessor: &str) -> Self {
        self.accessor = accessor.to_string();
        self
    }

    /// Returns true when reads yield at most one record
    pub fn is_single(&self) -> bool {
        self.cardinality.is_single()
    }

    /// Validate the field for consistency
    pub fn validate(&self) -> ModelResult<()> {
        let required = [
            ("name", &self.name),
            ("related_type", &self.related_type),
            ("match_field", &self.match_field),
            ("remote_match_field", &self.remote_match_field),
            ("accessor", &self.accessor),
        ];

        for (label, value) in required {
            if value.is_empty() {
                return Err(ModelError::Configuration(format!(
                    "Relationship '{}' must specify {}",
                    self.name, label
                )));
            }
        }

        Ok(())
    }
}
