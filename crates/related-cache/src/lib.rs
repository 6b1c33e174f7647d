//! # elif-related-cache: Related Objects Cache for elif.rs
//!
//! Caches a graph of already-loaded records so relationship navigation keeps
//! working in scopes where further data access is forbidden.
//!
//! A traversal episode ([`RelatedObjectsCache`]) walks every record reachable
//! from its seeds, registers the relationship edges it meets, reattaches
//! relationship slots purely from cached records and, while entered, answers
//! forbidden relationship reads from its cache.
//!
//! ```
//! use elif_related_cache::{
//!     CacheMissPolicy, PrimaryKey, RelatedCacheConfigBuilder, RelatedObjectsCache,
//! };
//!
//! let config = RelatedCacheConfigBuilder::new()
//!     .cache_miss_policy(CacheMissPolicy::Absent)
//!     .build()
//!     .expect("valid config");
//! let cache = RelatedObjectsCache::new(config);
//!
//! cache.scope(|cache| {
//!     let missing = cache.get("Author", &PrimaryKey::Integer(1)).expect("absent on miss");
//!     assert!(missing.is_none());
//! });
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod relationships;

#[cfg(test)]
pub mod fake;


// Re-export core traits and types
pub use cache::*;
pub use config::*;
pub use error::*;
pub use model::*;
pub use relationships::*;
