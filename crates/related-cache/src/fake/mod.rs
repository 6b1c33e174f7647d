//! Fake Data Store
//!
//! In-memory stand-in for a database-backed model layer, used by the tests.
//! Rows are plain [`FakeRecord`]s. Relationship reads are served from a
//! record's attached slots when present (eager loading), otherwise they are
//! "fetched" from the store, which fails with `ModelError::FetchForbidden`
//! while queries are disabled.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::model::{PrimaryKey, Record, RecordRef, Related, RelationSlots};
use crate::relationships::RelationshipField;

#[derive(Debug, Default)]
struct StoreInner {
    rows: RwLock<Vec<RecordRef>>,
    queries_disabled: AtomicBool,
    fetches: AtomicUsize,
    failures: RwLock<HashMap<(String, String), String>>,
}

/// Shared handle to the fake store
#[derive(Debug, Clone, Default)]
pub struct FakeDataStore {
    inner: Arc<StoreInner>,
}

impl FakeDataStore {
    /// Create an empty store with queries enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Disallow fetches until `enable_queries` is called
    pub fn disable_queries(&self) {
        self.inner.queries_disabled.store(true, Ordering::SeqCst);
    }

    pub fn enable_queries(&self) {
        self.inner.queries_disabled.store(false, Ordering::SeqCst);
    }

    pub fn queries_enabled(&self) -> bool {
        !self.inner.queries_disabled.load(Ordering::SeqCst)
    }

    /// Run `f` with queries enabled, restoring the previous state afterwards
    pub fn with_queries_enabled<T>(&self, f: impl FnOnce() -> T) -> T {
        let was_disabled = self.inner.queries_disabled.swap(false, Ordering::SeqCst);
        let result = f();
        self.inner
            .queries_disabled
            .store(was_disabled, Ordering::SeqCst);
        result
    }

    /// Number of relationship fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    /// Make every read of `type_name.field` fail with `ModelError::Access`
    pub fn fail_on(&self, type_name: &str, field: &str, message: &str) {
        self.inner.failures.write().insert(
            (type_name.to_string(), field.to_string()),
            message.to_string(),
        );
    }

    /// Row lookup that bypasses the query switch, for test setup
    pub fn row(&self, type_name: &str, id: i64) -> Option<RecordRef> {
        let key = PrimaryKey::Integer(id);
        self.inner
            .rows
            .read()
            .iter()
            .find(|row| row.type_name() == type_name && row.primary_key() == key)
            .cloned()
    }

    fn insert_row(&self, row: RecordRef) {
        self.inner.rows.write().push(row);
    }
}

impl StoreInner {
    fn fetch(&self, owner: &FakeRecord, field: &RelationshipField) -> ModelResult<Related> {
        let failure_key = (owner.type_name.clone(), field.name.clone());
        if let Some(message) = self.failures.read().get(&failure_key) {
            return Err(ModelError::Access(message.clone()));
        }

        if self.queries_disabled.load(Ordering::SeqCst) {
            return Err(ModelError::fetch_forbidden(&owner.type_name, &field.name));
        }

        self.fetches.fetch_add(1, Ordering::SeqCst);

        let matches: Vec<RecordRef> = match owner.join_value(&field.match_field) {
            Some(value) => self
                .rows
                .read()
                .iter()
                .filter(|row| {
                    row.type_name() == field.related_type
                        && row.join_value(&field.remote_match_field).as_ref() == Some(&value)
                })
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        if field.is_single() {
            Ok(Related::One(matches.into_iter().next()))
        } else {
            Ok(Related::Many(matches))
        }
    }
}

/// A row of the fake store
#[derive(Debug)]
pub struct FakeRecord {
    type_name: String,
    key: PrimaryKey,
    key_field: String,
    fields: HashMap<String, Value>,
    relationships: Vec<RelationshipField>,
    slots: RelationSlots,
    store: Weak<StoreInner>,
}

impl FakeRecord {
    /// Start building a row with an integer primary key stored as `id`
    pub fn build(store: &FakeDataStore, type_name: &str, id: i64) -> FakeRecordBuilder {
        FakeRecordBuilder::new(store, type_name, PrimaryKey::Integer(id))
    }

    /// Start building a row with any primary key, stored as `id`
    pub fn build_with_key(
        store: &FakeDataStore,
        type_name: &str,
        key: PrimaryKey,
    ) -> FakeRecordBuilder {
        FakeRecordBuilder::new(store, type_name, key)
    }
}

impl Record for FakeRecord {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn primary_key(&self) -> PrimaryKey {
        self.key.clone()
    }

    fn primary_key_name(&self) -> &str {
        &self.key_field
    }

    fn relationship_fields(&self) -> Vec<RelationshipField> {
        self.relationships.clone()
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        self.fields.get(field).cloned()
    }

    fn read_related(&self, field: &RelationshipField) -> ModelResult<Related> {
        if let Some(loaded) = self.slots.get(&field.accessor) {
            return Ok(loaded);
        }

        let store = self
            .store
            .upgrade()
            .ok_or_else(|| ModelError::Access("fake data store dropped".to_string()))?;
        store.fetch(self, field)
    }

    fn relation_slots(&self) -> &RelationSlots {
        &self.slots
    }
}

/// Builder for [`FakeRecord`] rows; `finish` registers the row with the store
pub struct FakeRecordBuilder {
    store: FakeDataStore,
    record: FakeRecord,
}

impl FakeRecordBuilder {
    fn new(store: &FakeDataStore, type_name: &str, key: PrimaryKey) -> Self {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), key.to_value());

        Self {
            store: store.clone(),
            record: FakeRecord {
                type_name: type_name.to_string(),
                key,
                key_field: "id".to_string(),
                fields,
                relationships: Vec::new(),
                slots: RelationSlots::new(),
                store: Arc::downgrade(&store.inner),
            },
        }
    }

    /// Store the primary key under `name` instead of `id`
    pub fn key_field(mut self, name: &str) -> Self {
        if let Some(value) = self.record.fields.remove(&self.record.key_field) {
            self.record.fields.insert(name.to_string(), value);
        }
        self.record.key_field = name.to_string();
        self
    }

    /// Set a scalar field
    pub fn field(mut self, name: &str, value: Value) -> Self {
        self.record.fields.insert(name.to_string(), value);
        self
    }

    /// Declare a relationship field
    pub fn relationship(mut self, field: RelationshipField) -> Self {
        self.record.relationships.push(field);
        self
    }

    /// Register the row and hand out its shared handle
    pub fn finish(self) -> RecordRef {
        let row: RecordRef = Arc::new(self.record);
        self.store.insert_row(Arc::clone(&row));
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delta_with_echoes(store: &FakeDataStore) -> RecordRef {
        let delta = FakeRecord::build(store, "Delta", 1)
            .relationship(RelationshipField::has_many("echoes", "Echo", "delta_id"))
            .finish();
        for id in 1..=2 {
            FakeRecord::build(store, "Echo", id)
                .field("delta_id", json!(1))
                .finish();
        }
        delta
    }

    #[test]
    fn test_fetch_when_enabled() {
        let store = FakeDataStore::new();
        let delta = delta_with_echoes(&store);
        let field = delta.relationship_field("echoes").unwrap();

        let echoes = delta.read_related(&field).unwrap();
        assert_eq!(echoes.len(), 2);
        assert_eq!(store.fetch_count(), 1);
    }

    #[test]
    fn test_fetch_forbidden_when_disabled() {
        let store = FakeDataStore::new();
        let delta = delta_with_echoes(&store);
        let field = delta.relationship_field("echoes").unwrap();

        store.disable_queries();
        let err = delta.read_related(&field).unwrap_err();
        assert!(err.is_fetch_forbidden());
        assert_eq!(store.fetch_count(), 0);

        let echoes = store.with_queries_enabled(|| delta.read_related(&field)).unwrap();
        assert_eq!(echoes.len(), 2);
        assert!(!store.queries_enabled());
    }

    #[test]
    fn test_attached_slot_wins_over_fetch() {
        let store = FakeDataStore::new();
        let delta = delta_with_echoes(&store);
        let field = delta.relationship_field("echoes").unwrap();

        store.disable_queries();
        delta.attach("echoes", Related::empty());
        assert!(delta.read_related(&field).unwrap().is_empty());
    }

    #[test]
    fn test_configured_failure() {
        let store = FakeDataStore::new();
        let delta = delta_with_echoes(&store);
        let field = delta.relationship_field("echoes").unwrap();

        store.fail_on("Delta", "echoes", "connection reset");
        assert_eq!(
            delta.read_related(&field).unwrap_err(),
            ModelError::Access("connection reset".to_string())
        );
    }

    #[test]
    fn test_row_lookup() {
        let store = FakeDataStore::new();
        delta_with_echoes(&store);
        assert!(store.row("Echo", 2).is_some());
        assert!(store.row("Echo", 3).is_none());
    }
}
