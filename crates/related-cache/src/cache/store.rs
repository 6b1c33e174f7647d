//! Cache Store - records of one traversal episode keyed by type name and primary key
//!
//! Each type keeps its records in insertion order; reconciliation derives
//! collection order from it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::config::DuplicatePolicy;
use crate::model::{same_instance, PrimaryKey, RecordRef};

/// Store shared between the walker, the linker and the caching resolver
pub type SharedStore = Arc<RwLock<CacheStore>>;

/// Result of inserting a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Key was not cached before
    Inserted,
    /// This exact instance is already cached
    AlreadyCached,
    /// A distinct instance under the same key was replaced
    Replaced,
    /// A distinct instance under the same key was kept and the new one dropped
    Kept,
}

impl InsertOutcome {
    /// True when the inserted record is now the cached one and must be walked
    pub fn is_new_instance(self) -> bool {
        matches!(self, InsertOutcome::Inserted | InsertOutcome::Replaced)
    }
}

/// Records of one type in insertion order
#[derive(Debug, Default)]
struct TypeBucket {
    index: HashMap<PrimaryKey, usize>,
    records: Vec<RecordRef>,
    /// Primary key field name shared by every record, None once records disagree
    key_field: Option<String>,
}

impl TypeBucket {
    fn get(&self, key: &PrimaryKey) -> Option<&RecordRef> {
        self.index.get(key).map(|&slot| &self.records[slot])
    }

    /// Replacing keeps the original position
    fn put(&mut self, key: PrimaryKey, record: RecordRef) {
        if self.records.is_empty() {
            self.key_field = Some(record.primary_key_name().to_string());
        } else if self.key_field.as_deref() != Some(record.primary_key_name()) {
            self.key_field = None;
        }

        match self.index.get(&key) {
            Some(&slot) => self.records[slot] = record,
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(record);
            }
        }
    }

    /// True if every cached record of this type uses `field` as its primary key
    fn is_key_field(&self, field: &str) -> bool {
        self.key_field.as_deref() == Some(field)
    }

    /// Records whose `field` equals `value`, the comparison the cross-linker uses
    fn matching<'a>(
        &'a self,
        field: &'a str,
        value: &'a Value,
    ) -> impl Iterator<Item = &'a RecordRef> + 'a {
        self.records
            .iter()
            .filter(move |record| record.join_value(field).as_ref() == Some(value))
    }
}

/// Two-level cache: type name -> primary key -> record
#[derive(Debug)]
pub struct CacheStore {
    buckets: HashMap<String, TypeBucket>,
    duplicate_policy: DuplicatePolicy,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

impl CacheStore {
    /// Create an empty store
    pub fn new(duplicate_policy: DuplicatePolicy) -> Self {
        Self {
            buckets: HashMap::new(),
            duplicate_policy,
        }
    }

    /// Wrap a new store for sharing
    pub fn shared(duplicate_policy: DuplicatePolicy) -> SharedStore {
        Arc::new(RwLock::new(Self::new(duplicate_policy)))
    }

    /// Insert a record under its (type, key).
    ///
    /// The same instance twice is a no-op. A distinct instance under an
    /// existing key is handled by the duplicate policy.
    pub fn insert(&mut self, record: &RecordRef) -> InsertOutcome {
        let key = record.primary_key();
        let bucket = self
            .buckets
            .entry(record.type_name().to_string())
            .or_default();

        let outcome = match bucket.get(&key) {
            None => InsertOutcome::Inserted,
            Some(existing) if same_instance(existing, record) => {
                return InsertOutcome::AlreadyCached;
            }
            Some(_) => match self.duplicate_policy {
                DuplicatePolicy::Overwrite => InsertOutcome::Replaced,
                DuplicatePolicy::KeepExisting => return InsertOutcome::Kept,
            },
        };

        bucket.put(key, Arc::clone(record));
        outcome
    }

    /// Get a cached record by type name and primary key
    pub fn get(&self, type_name: &str, key: &PrimaryKey) -> Option<RecordRef> {
        self.buckets.get(type_name)?.get(key).cloned()
    }

    /// Check whether a record is cached under (type, key)
    pub fn contains(&self, type_name: &str, key: &PrimaryKey) -> bool {
        self.buckets
            .get(type_name)
            .map(|bucket| bucket.index.contains_key(key))
            .unwrap_or(false)
    }

    /// Check whether `record` itself is the instance cached under its key
    pub fn is_same_instance(&self, record: &RecordRef) -> bool {
        self.get(record.type_name(), &record.primary_key())
            .map(|cached| same_instance(&cached, record))
            .unwrap_or(false)
    }

    /// Every cached record of a type, in insertion order
    pub fn records(&self, type_name: &str) -> Vec<RecordRef> {
        self.buckets
            .get(type_name)
            .map(|bucket| bucket.records.clone())
            .unwrap_or_default()
    }

    /// First cached record of `type_name` whose `field` equals `value`.
    ///
    /// Tries the key index when `field` is the type's primary key, then falls
    /// back to a scan, so the result always agrees with join value equality.
    pub fn find_by_field(&self, type_name: &str, field: &str, value: &Value) -> Option<RecordRef> {
        let bucket = self.buckets.get(type_name)?;

        if bucket.is_key_field(field) {
            let indexed = PrimaryKey::from_value(value)
                .and_then(|key| bucket.get(&key))
                .filter(|record| record.join_value(field).as_ref() == Some(value));
            if let Some(record) = indexed {
                return Some(Arc::clone(record));
            }
        }

        bucket.matching(field, value).next().cloned()
    }

    /// Every cached record of `type_name` whose `field` equals `value`, in insertion order
    pub fn find_all_by_field(&self, type_name: &str, field: &str, value: &Value) -> Vec<RecordRef> {
        self.buckets
            .get(type_name)
            .map(|bucket| bucket.matching(field, value).cloned().collect())
            .unwrap_or_default()
    }

    /// Type names with at least one cached record, sorted
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .buckets
            .iter()
            .filter(|(_, bucket)| !bucket.records.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Number of cached records of one type
    pub fn len_of(&self, type_name: &str) -> usize {
        self.buckets
            .get(type_name)
            .map(|bucket| bucket.records.len())
            .unwrap_or(0)
    }

    /// Total number of cached records
    pub fn len(&self) -> usize {
        self.buckets.values().map(|bucket| bucket.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }
}
