//! Relation Slots - per-record storage for attached relationship values

use std::collections::HashMap;

use parking_lot::RwLock;

use super::record::Related;

/// Relationship values attached to one record, keyed by accessor.
///
/// Slots hold strong references, so a linked cyclic graph keeps itself alive
/// until the slots are cleared.
#[derive(Default)]
pub struct RelationSlots {
    slots: RwLock<HashMap<String, Related>>,
}

impl RelationSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach (or replace) the value under `accessor`
    pub fn attach(&self, accessor: &str, related: Related) {
        self.slots.write().insert(accessor.to_string(), related);
    }

    /// Get the value attached under `accessor`
    pub fn get(&self, accessor: &str) -> Option<Related> {
        self.slots.read().get(accessor).cloned()
    }

    /// Check if a value is attached under `accessor`
    pub fn is_loaded(&self, accessor: &str) -> bool {
        self.slots.read().contains_key(accessor)
    }

    /// Remove and return the value under `accessor`
    pub fn detach(&self, accessor: &str) -> Option<Related> {
        self.slots.write().remove(accessor)
    }

    /// Remove every attached value
    pub fn clear(&self) {
        self.slots.write().clear();
    }

    /// Sorted accessor names that carry a value
    pub fn accessors(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Attached records may point back at the owner, so print accessor names only.
impl std::fmt::Debug for RelationSlots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationSlots")
            .field("accessors", &self.accessors())
            .finish()
    }
}
