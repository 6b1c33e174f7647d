//! Error types for the related-objects cache
//!
//! Covers the forbidden-fetch signal raised by record types, cache misses,
//! traversal limits and relationship configuration problems.

use thiserror::Error;

/// Result type alias for cache operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Error types for relationship caching and navigation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A relationship read would have required a fetch while fetching is disabled
    #[error("Fetch forbidden: {0}")]
    FetchForbidden(String),

    /// Lookup by type and primary key found nothing (only under `CacheMissPolicy::Error`)
    #[error("'{type_name}' object with key '{key}' is not cached")]
    NotCached { type_name: String, key: String },

    /// Relationship descriptor is unknown or malformed
    #[error("Relationship error: {0}")]
    Relationship(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Traversal went deeper than the configured bound
    #[error("Traversal exceeded maximum depth of {0}")]
    DepthExceeded(usize),

    /// Traversal was cancelled through its cancellation flag
    #[error("Traversal cancelled")]
    Cancelled,

    /// Any other failure reported by a record while reading a relationship
    #[error("Access error: {0}")]
    Access(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ModelError {
    /// Build a forbidden-fetch signal for a relationship on a record type
    pub fn fetch_forbidden(type_name: &str, field: &str) -> Self {
        ModelError::FetchForbidden(format!(
            "reading '{}.{}' requires a query while queries are disabled",
            type_name, field
        ))
    }

    /// True for the forbidden-fetch signal, which the walker and interceptor absorb
    pub fn is_fetch_forbidden(&self) -> bool {
        matches!(self, ModelError::FetchForbidden(_))
    }

    /// True when a cache lookup missed under the error policy
    pub fn is_not_cached(&self) -> bool {
        matches!(self, ModelError::NotCached { .. })
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}
