//! Cache configuration types and builders

use serde::{Deserialize, Serialize};
use service_builder::builder;

use crate::error::ModelError;

/// What a lookup returns when the requested record was never cached.
///
/// Applied uniformly by `RelatedObjectsCache::get` and by the caching resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMissPolicy {
    /// Return an absent value
    #[default]
    Absent,
    /// Return `ModelError::NotCached`
    Error,
}

impl CacheMissPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheMissPolicy::Absent => "absent",
            CacheMissPolicy::Error => "error",
        }
    }
}

impl std::fmt::Display for CacheMissPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CacheMissPolicy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "absent" => Ok(CacheMissPolicy::Absent),
            "error" => Ok(CacheMissPolicy::Error),
            _ => Err(ModelError::Configuration(format!(
                "Unknown cache miss policy '{}'",
                s
            ))),
        }
    }
}

/// What caching does with a distinct instance whose (type, key) is already cached.
///
/// Re-caching the very same instance is always a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Last write wins; the new instance replaces the cached one and is walked
    #[default]
    Overwrite,
    /// First write wins; the new instance is neither cached nor walked
    KeepExisting,
}

impl DuplicatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicatePolicy::Overwrite => "overwrite",
            DuplicatePolicy::KeepExisting => "keep_existing",
        }
    }
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "overwrite" => Ok(DuplicatePolicy::Overwrite),
            "keep_existing" => Ok(DuplicatePolicy::KeepExisting),
            _ => Err(ModelError::Configuration(format!(
                "Unknown duplicate policy '{}'",
                s
            ))),
        }
    }
}

/// Configuration for one traversal episode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[builder]
pub struct RelatedCacheConfig {
    /// Result of a lookup for a record that was never cached
    #[builder(default = "CacheMissPolicy::Absent", getter)]
    pub cache_miss_policy: CacheMissPolicy,

    /// Handling of a distinct instance under an already cached key
    #[builder(default = "DuplicatePolicy::Overwrite", getter)]
    pub duplicate_policy: DuplicatePolicy,

    /// Maximum recursion depth of the walker (None = unbounded)
    #[builder(default = "Some(512)", getter)]
    pub max_depth: Option<usize>,
}

impl Default for RelatedCacheConfig {
    fn default() -> Self {
        Self {
            cache_miss_policy: CacheMissPolicy::Absent,
            duplicate_policy: DuplicatePolicy::Overwrite,
            max_depth: Some(512),
        }
    }
}

impl RelatedCacheConfig {
    /// Load a configuration from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let overrides: serde_json::Value = serde_json::from_str(json)?;
        let mut merged = serde_json::to_value(Self::default())?;

        if let (Some(target), Some(source)) = (merged.as_object_mut(), overrides.as_object()) {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        } else {
            return Err(ModelError::Configuration(
                "Cache configuration must be a JSON object".to_string(),
            ));
        }

        Ok(serde_json::from_value(merged)?)
    }
}

impl RelatedCacheConfigBuilder {
    /// Misses are errors, so an unreachable relationship never goes unnoticed
    pub fn strict() -> Self {
        RelatedCacheConfigBuilder::new()
            .cache_miss_policy(CacheMissPolicy::Error)
            .duplicate_policy(DuplicatePolicy::Overwrite)
    }

    /// Misses read as absent and recursion is unbounded
    pub fn lenient() -> Self {
        RelatedCacheConfigBuilder::new()
            .cache_miss_policy(CacheMissPolicy::Absent)
            .max_depth(None)
    }
}
