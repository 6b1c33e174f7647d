//! Access Interceptor - resolver seam for relationship reads
//!
//! Application code navigates relationships through [`resolve_related`]. By
//! default that delegates to [`Record::read_related`]. While an episode is
//! active, a [`CachingResolver`] is installed for the current thread and
//! serves forbidden reads from the episode's cache instead.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::trace;

use super::store::SharedStore;
use crate::config::CacheMissPolicy;
use crate::error::{ModelError, ModelResult};
use crate::model::{PrimaryKey, Record, RecordRef, Related};
use crate::relationships::RelationshipField;

/// Reads the value of one relationship of a record
pub trait RelationshipResolver: Send + Sync {
    fn resolve(&self, record: &dyn Record, field: &RelationshipField) -> ModelResult<Related>;
}

/// The record's own read, with no fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectResolver;

impl RelationshipResolver for DirectResolver {
    fn resolve(&self, record: &dyn Record, field: &RelationshipField) -> ModelResult<Related> {
        record.read_related(field)
    }
}

/// Wraps a resolver and answers its forbidden-fetch signals from the cache.
///
/// Successful reads and every other error pass through unchanged.
pub struct CachingResolver<R = DirectResolver> {
    inner: R,
    store: SharedStore,
    miss_policy: CacheMissPolicy,
}

impl CachingResolver<DirectResolver> {
    /// Caching resolver over the records' own reads
    pub fn direct(store: SharedStore, miss_policy: CacheMissPolicy) -> Self {
        Self::new(DirectResolver, store, miss_policy)
    }
}

impl<R: RelationshipResolver> CachingResolver<R> {
    pub fn new(inner: R, store: SharedStore, miss_policy: CacheMissPolicy) -> Self {
        Self {
            inner,
            store,
            miss_policy,
        }
    }

    pub fn miss_policy(&self) -> CacheMissPolicy {
        self.miss_policy
    }

    /// Answer a read from the cache alone.
    ///
    /// Single-valued fields find the cached related record whose remote match
    /// field equals the owner's join value; for a forward reference that is
    /// a primary key lookup. Collections return every match in cache order.
    pub fn from_cache(&self, record: &dyn Record, field: &RelationshipField) -> ModelResult<Related> {
        let Some(join_value) = record.join_value(&field.match_field) else {
            return Ok(if field.is_single() {
                Related::none()
            } else {
                Related::empty()
            });
        };

        let store = self.store.read();

        if !field.is_single() {
            return Ok(Related::Many(store.find_all_by_field(
                &field.related_type,
                &field.remote_match_field,
                &join_value,
            )));
        }

        match store.find_by_field(&field.related_type, &field.remote_match_field, &join_value) {
            Some(found) => Ok(Related::One(Some(found))),
            None => match self.miss_policy {
                CacheMissPolicy::Absent => Ok(Related::none()),
                CacheMissPolicy::Error => Err(ModelError::NotCached {
                    type_name: field.related_type.clone(),
                    key: PrimaryKey::from_value(&join_value)
                        .map(|key| key.to_string())
                        .unwrap_or_else(|| join_value.to_string()),
                }),
            },
        }
    }
}

impl<R: RelationshipResolver> RelationshipResolver for CachingResolver<R> {
    fn resolve(&self, record: &dyn Record, field: &RelationshipField) -> ModelResult<Related> {
        match self.inner.resolve(record, field) {
            Err(err) if err.is_fetch_forbidden() => {
                trace!(
                    "Serving '{}.{}' from cache: {}",
                    record.type_name(),
                    field.name,
                    err
                );
                self.from_cache(record, field)
            }
            other => other,
        }
    }
}

thread_local! {
    static ACTIVE_RESOLVER: RefCell<Option<Arc<dyn RelationshipResolver>>> = RefCell::new(None);
}

/// Restores the previously installed resolver when dropped.
///
/// Guards must be dropped in reverse order of installation.
#[must_use = "dropping the guard uninstalls the resolver immediately"]
pub struct InterceptorGuard {
    previous: Option<Arc<dyn RelationshipResolver>>,
    // Restoring has to happen on the installing thread.
    _not_send: PhantomData<*const ()>,
}

impl Drop for InterceptorGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // Fails only during thread teardown, when there is nothing left to restore.
        let _ = ACTIVE_RESOLVER.try_with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Install `resolver` for relationship reads on the current thread
pub fn install(resolver: Arc<dyn RelationshipResolver>) -> InterceptorGuard {
    let previous = ACTIVE_RESOLVER.with(|slot| slot.borrow_mut().replace(resolver));
    InterceptorGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// The resolver installed on the current thread, if any
pub fn active_resolver() -> Option<Arc<dyn RelationshipResolver>> {
    ACTIVE_RESOLVER.with(|slot| slot.borrow().clone())
}

pub fn is_installed() -> bool {
    ACTIVE_RESOLVER.with(|slot| slot.borrow().is_some())
}

/// Read relationship `name` (field name or accessor) of `record` through the
/// installed resolver, or the record's own read when none is installed
pub fn resolve_related(record: &dyn Record, name: &str) -> ModelResult<Related> {
    let field = record.relationship_field(name).ok_or_else(|| {
        ModelError::Relationship(format!(
            "'{}' has no relationship '{}'",
            record.type_name(),
            name
        ))
    })?;

    // Cloned out of the slot so a resolver may navigate further itself.
    match active_resolver() {
        Some(resolver) => resolver.resolve(record, &field),
        None => DirectResolver.resolve(record, &field),
    }
}

/// Single related record of `record`
pub fn resolve_one(record: &dyn Record, name: &str) -> ModelResult<Option<RecordRef>> {
    Ok(resolve_related(record, name)?.first())
}

/// Related collection of `record`
pub fn resolve_many(record: &dyn Record, name: &str) -> ModelResult<Vec<RecordRef>> {
    Ok(resolve_related(record, name)?.records())
}
