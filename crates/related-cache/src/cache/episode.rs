//! Traversal Episode - owns one cache store and registry for its lifetime
//!
//! An episode caches seed records, walks what is reachable from them,
//! reconciles relationship slots and, while entered, serves forbidden
//! relationship reads on the current thread from its cache.

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::span::EnteredSpan;
use tracing::{debug, debug_span, info};
use uuid::Uuid;

use super::interceptor::{self, CachingResolver, InterceptorGuard};
use super::linker::{CrossLinker, ReconcileReport};
use super::store::{CacheStore, SharedStore};
use super::walker::{CancellationFlag, GraphWalker, WalkStats};
use crate::config::{CacheMissPolicy, RelatedCacheConfig};
use crate::error::{ModelError, ModelResult};
use crate::model::{PrimaryKey, RecordRef};
use crate::relationships::RelationshipRegistry;

/// Snapshot of an episode's cache contents and walk counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub episode_id: Uuid,
    /// Types with at least one cached record
    pub cached_types: usize,
    pub cached_records: usize,
    /// Registered relationship edges
    pub edges: usize,
    /// Counters summed over every walk of this episode
    pub walk: WalkStats,
}

/// Cache of related objects for one traversal episode
pub struct RelatedObjectsCache {
    episode_id: Uuid,
    config: RelatedCacheConfig,
    store: SharedStore,
    registry: RelationshipRegistry,
    cancellation: CancellationFlag,
    walk_stats: Mutex<WalkStats>,
}

impl Default for RelatedObjectsCache {
    fn default() -> Self {
        Self::new(RelatedCacheConfig::default())
    }
}

impl std::fmt::Debug for RelatedObjectsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelatedObjectsCache")
            .field("episode_id", &self.episode_id)
            .field("config", &self.config)
            .field("cached_records", &self.store.read().len())
            .field("edges", &self.registry.len())
            .finish()
    }
}

impl RelatedObjectsCache {
    /// Start a new, empty episode
    pub fn new(config: RelatedCacheConfig) -> Self {
        let store = CacheStore::shared(*config.get_duplicate_policy());
        Self {
            episode_id: Uuid::new_v4(),
            config,
            store,
            registry: RelationshipRegistry::new(),
            cancellation: CancellationFlag::new(),
            walk_stats: Mutex::new(WalkStats::default()),
        }
    }

    pub fn episode_id(&self) -> Uuid {
        self.episode_id
    }

    pub fn config(&self) -> &RelatedCacheConfig {
        &self.config
    }

    pub fn registry(&self) -> &RelationshipRegistry {
        &self.registry
    }

    /// Flag that stops in-progress and future walks of this episode
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    /// Resolver that falls back to this episode's cache on forbidden reads
    pub fn resolver(&self) -> Arc<CachingResolver> {
        Arc::new(CachingResolver::direct(
            Arc::clone(&self.store),
            *self.config.get_cache_miss_policy(),
        ))
    }

    /// Enter the episode on the current thread.
    ///
    /// Until the guard is dropped, [`interceptor::resolve_related`] serves
    /// forbidden reads from this cache.
    pub fn enter(&self) -> EpisodeGuard<'_> {
        let span = debug_span!("related_cache_episode", episode_id = %self.episode_id).entered();
        let interceptor = interceptor::install(self.resolver());
        debug!("Entered related objects cache episode");

        EpisodeGuard {
            cache: self,
            _interceptor: interceptor,
            _span: span,
        }
    }

    /// Run `f` inside the episode
    pub fn scope<T>(&self, f: impl FnOnce(&Self) -> T) -> T {
        let _guard = self.enter();
        f(self)
    }

    /// Cache `record` and everything reachable from it
    pub fn cache_record(&self, record: &RecordRef) -> ModelResult<RecordRef> {
        self.walk(|walker| walker.cache_record(record))
    }

    /// Cache each record and everything reachable from them
    pub fn cache_records(&self, records: &[RecordRef]) -> ModelResult<Vec<RecordRef>> {
        self.walk(|walker| walker.cache_records(records))
    }

    /// Reattach every registered relationship from the cached records
    pub fn reconcile(&self) -> ReconcileReport {
        CrossLinker::new(&self.store, &self.registry).reconcile()
    }

    /// Cache every seed, then reconcile. Returns the seeds.
    pub fn cache_results(&self, seeds: &[RecordRef]) -> ModelResult<Vec<RecordRef>> {
        let _span = debug_span!(
            "cache_results",
            episode_id = %self.episode_id,
            seeds = seeds.len()
        )
        .entered();

        let cached = self.cache_records(seeds)?;
        let report = self.reconcile();
        let stats = self.stats();

        info!(
            "Cached {} records of {} types from {} seeds, {} relationships reattached",
            stats.cached_records,
            stats.cached_types,
            seeds.len(),
            report.attachments()
        );

        Ok(cached)
    }

    /// Look up a cached record; a miss follows the configured policy
    pub fn get(&self, type_name: &str, key: &PrimaryKey) -> ModelResult<Option<RecordRef>> {
        match self.store.read().get(type_name, key) {
            Some(record) => Ok(Some(record)),
            None => match self.config.get_cache_miss_policy() {
                CacheMissPolicy::Absent => Ok(None),
                CacheMissPolicy::Error => Err(ModelError::NotCached {
                    type_name: type_name.to_string(),
                    key: key.to_string(),
                }),
            },
        }
    }

    pub fn contains(&self, type_name: &str, key: &PrimaryKey) -> bool {
        self.store.read().contains(type_name, key)
    }

    /// Every cached record of a type, in insertion order
    pub fn records(&self, type_name: &str) -> Vec<RecordRef> {
        self.store.read().records(type_name)
    }

    pub fn stats(&self) -> CacheStats {
        let store = self.store.read();
        CacheStats {
            episode_id: self.episode_id,
            cached_types: store.type_names().len(),
            cached_records: store.len(),
            edges: self.registry.len(),
            walk: *self.walk_stats.lock(),
        }
    }

    /// Clear the relationship slots of every cached record.
    ///
    /// Reattached slots hold strong references, so a cyclic graph is never
    /// freed until its links are released. Returns the number of records cleared.
    pub fn release_links(&self) -> usize {
        let records: Vec<RecordRef> = {
            let store = self.store.read();
            store
                .type_names()
                .iter()
                .flat_map(|type_name| store.records(type_name))
                .collect()
        };

        for record in &records {
            record.relation_slots().clear();
        }

        debug!(
            episode_id = %self.episode_id,
            "Released relationship links of {} records",
            records.len()
        );
        records.len()
    }

    fn walk<T>(
        &self,
        f: impl FnOnce(&mut GraphWalker<'_>) -> ModelResult<T>,
    ) -> ModelResult<T> {
        let mut walker = GraphWalker::new(&self.store, &self.registry)
            .with_max_depth(*self.config.get_max_depth())
            .with_cancellation(self.cancellation.clone());

        let result = f(&mut walker);
        self.walk_stats.lock().merge(walker.stats());
        result
    }
}

/// An entered episode; dropping it restores the previous resolver
pub struct EpisodeGuard<'a> {
    cache: &'a RelatedObjectsCache,
    _interceptor: InterceptorGuard,
    _span: EnteredSpan,
}

impl Deref for EpisodeGuard<'_> {
    type Target = RelatedObjectsCache;

    fn deref(&self) -> &Self::Target {
        self.cache
    }
}

impl Drop for EpisodeGuard<'_> {
    fn drop(&mut self) {
        let stats = self.cache.stats();
        debug!(
            "Exiting related objects cache episode: {} records, {} edges",
            stats.cached_records, stats.edges
        );
    }
}
