//! Graph Walker - caches seed records and everything reachable from them
//!
//! The walk is depth-first. Each relationship field encountered is registered
//! as an edge. A branch whose read is forbidden is skipped and left for the
//! cross-linker or the caching resolver; every other read failure aborts the walk.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::store::{InsertOutcome, SharedStore};
use crate::error::{ModelError, ModelResult};
use crate::model::RecordRef;
use crate::relationships::{RelationshipEdge, RelationshipRegistry};

/// Cooperative cancellation checked at every recursive step
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; clones observe it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Counters collected while walking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Records visited, including ones already cached
    pub visited: usize,
    /// Records newly cached
    pub inserted: usize,
    /// Distinct instances that replaced a cached record
    pub replaced: usize,
    /// Distinct instances dropped in favour of the cached record
    pub kept: usize,
    /// Visits stopped by the identity guard
    pub already_cached: usize,
    /// Relationship reads skipped because fetching was forbidden
    pub forbidden_skips: usize,
    /// Deepest recursion level reached (seeds are level 0)
    pub deepest: usize,
}

impl WalkStats {
    /// Add another walk's counters to these
    pub fn merge(&mut self, other: &WalkStats) {
        self.visited += other.visited;
        self.inserted += other.inserted;
        self.replaced += other.replaced;
        self.kept += other.kept;
        self.already_cached += other.already_cached;
        self.forbidden_skips += other.forbidden_skips;
        self.deepest = self.deepest.max(other.deepest);
    }
}

/// Recursive walker over the relationship graph of seed records
pub struct GraphWalker<'a> {
    store: &'a SharedStore,
    registry: &'a RelationshipRegistry,
    max_depth: Option<usize>,
    cancellation: Option<CancellationFlag>,
    stats: WalkStats,
}

impl<'a> GraphWalker<'a> {
    /// Create a walker populating `store` and `registry`
    pub fn new(store: &'a SharedStore, registry: &'a RelationshipRegistry) -> Self {
        Self {
            store,
            registry,
            max_depth: None,
            cancellation: None,
            stats: WalkStats::default(),
        }
    }

    /// Bound the recursion depth (None = unbounded)
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Observe a cancellation flag
    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// Cache `record` and every record reachable from it.
    ///
    /// Returns the record itself for chaining.
    pub fn cache_record(&mut self, record: &RecordRef) -> ModelResult<RecordRef> {
        self.visit(record, 0)?;
        Ok(Arc::clone(record))
    }

    /// Cache each record in order
    pub fn cache_records(&mut self, records: &[RecordRef]) -> ModelResult<Vec<RecordRef>> {
        records
            .iter()
            .map(|record| self.cache_record(record))
            .collect()
    }

    /// Counters of this walker so far
    pub fn stats(&self) -> &WalkStats {
        &self.stats
    }

    fn visit(&mut self, record: &RecordRef, depth: usize) -> ModelResult<()> {
        if let Some(cancellation) = &self.cancellation {
            if cancellation.is_cancelled() {
                return Err(ModelError::Cancelled);
            }
        }

        if let Some(max_depth) = self.max_depth {
            if depth > max_depth {
                return Err(ModelError::DepthExceeded(max_depth));
            }
        }

        self.stats.visited += 1;
        self.stats.deepest = self.stats.deepest.max(depth);

        // The lock is released before any relationship read below.
        let outcome = self.store.write().insert(record);
        match outcome {
            InsertOutcome::AlreadyCached => {
                self.stats.already_cached += 1;
                return Ok(());
            }
            InsertOutcome::Kept => {
                self.stats.kept += 1;
                debug!(
                    "Keeping cached '{}' {} over a distinct instance",
                    record.type_name(),
                    record.primary_key()
                );
                return Ok(());
            }
            InsertOutcome::Inserted => {
                self.stats.inserted += 1;
                debug!("Cached '{}' {}", record.type_name(), record.primary_key());
            }
            InsertOutcome::Replaced => {
                self.stats.replaced += 1;
                warn!(
                    "Replaced cached '{}' {} with a distinct instance",
                    record.type_name(),
                    record.primary_key()
                );
            }
        }

        let owning_type = record.type_name().to_string();
        for field in record.relationship_fields() {
            field.validate()?;
            self.registry
                .register(RelationshipEdge::from_field(&owning_type, &field));

            let related = match record.read_related(&field) {
                Ok(related) => related,
                Err(err) if err.is_fetch_forbidden() => {
                    self.stats.forbidden_skips += 1;
                    trace!(
                        "Skipping '{}.{}' ({}): fetch forbidden",
                        owning_type,
                        field.name,
                        field.cardinality
                    );
                    continue;
                }
                Err(err) => return Err(err),
            };

            for next in related.records() {
                self.visit(&next, depth + 1)?;
            }
        }

        Ok(())
    }
}
