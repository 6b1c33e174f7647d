//! Cross-Linker - reattaches relationship values purely from cached records
//!
//! Runs after the walk. For every registered edge whose owning and related
//! types both have cached records, each owner gets the related records whose
//! remote match field equals its own match field.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use super::store::SharedStore;
use crate::model::{RecordRef, Related};
use crate::relationships::{Cardinality, RelationshipEdge, RelationshipRegistry};

/// Summary of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Edges with both endpoint types cached
    pub edges_processed: usize,
    /// Edges skipped because one endpoint type has nothing cached
    pub edges_skipped: usize,
    /// Single-valued attributes set
    pub single_attachments: usize,
    /// Collections set
    pub collection_attachments: usize,
}

impl ReconcileReport {
    pub fn attachments(&self) -> usize {
        self.single_attachments + self.collection_attachments
    }
}

/// Rewires relationship slots of cached records from the cache contents
pub struct CrossLinker<'a> {
    store: &'a SharedStore,
    registry: &'a RelationshipRegistry,
}

impl<'a> CrossLinker<'a> {
    pub fn new(store: &'a SharedStore, registry: &'a RelationshipRegistry) -> Self {
        Self { store, registry }
    }

    /// Reattach every registered edge, in sorted edge order.
    ///
    /// Always recomputes from the current cache, so running it twice on the
    /// same cache state assigns the same values.
    pub fn reconcile(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for edge in self.registry.sorted_edges() {
            let (owners, candidates) = {
                let store = self.store.read();
                (
                    store.records(edge.owning_type()),
                    store.records(edge.related_type()),
                )
            };

            if owners.is_empty() || candidates.is_empty() {
                trace!("Skipping edge {}: endpoint not cached", edge);
                report.edges_skipped += 1;
                continue;
            }

            self.link_edge(&edge, &owners, &candidates, &mut report);
            report.edges_processed += 1;
        }

        debug!(
            "Reconciled {} edges ({} skipped), {} attachments",
            report.edges_processed,
            report.edges_skipped,
            report.attachments()
        );

        report
    }

    fn link_edge(
        &self,
        edge: &RelationshipEdge,
        owners: &[RecordRef],
        candidates: &[RecordRef],
        report: &mut ReconcileReport,
    ) {
        let index = index_by_join_value(candidates, edge.remote_match_field());

        for owner in owners {
            let matches: Vec<RecordRef> = owner
                .join_value(edge.match_field())
                .and_then(|value| index.get(&value.to_string()))
                .cloned()
                .unwrap_or_default();

            match edge.cardinality() {
                Cardinality::OneToOne | Cardinality::ManyToOne => {
                    owner.attach(edge.accessor(), Related::One(matches.into_iter().next()));
                    report.single_attachments += 1;
                }
                Cardinality::OneToMany | Cardinality::ManyToMany => {
                    owner.attach(edge.accessor(), Related::Many(matches));
                    report.collection_attachments += 1;
                }
            }
        }
    }
}

/// Group candidates by the canonical text of their join value, keeping candidate order
fn index_by_join_value(candidates: &[RecordRef], field: &str) -> HashMap<String, Vec<RecordRef>> {
    let mut index: HashMap<String, Vec<RecordRef>> = HashMap::new();
    for candidate in candidates {
        if let Some(value) = candidate.join_value(field) {
            index
                .entry(value.to_string())
                .or_default()
                .push(Arc::clone(candidate));
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::CacheStore;
    use crate::cache::walker::GraphWalker;
    use crate::config::DuplicatePolicy;
    use crate::fake::{FakeDataStore, FakeRecord};
    use crate::model::{same_instance, PrimaryKey};
    use crate::relationships::RelationshipField;
    use serde_json::{json, Value};

    struct Fixture {
        data: FakeDataStore,
        store: SharedStore,
        registry: RelationshipRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                data: FakeDataStore::new(),
                store: CacheStore::shared(DuplicatePolicy::Overwrite),
                registry: RelationshipRegistry::new(),
            }
        }

        fn walk(&self, seeds: &[RecordRef]) {
            GraphWalker::new(&self.store, &self.registry)
                .cache_records(seeds)
                .unwrap();
        }

        fn reconcile(&self) -> ReconcileReport {
            CrossLinker::new(&self.store, &self.registry).reconcile()
        }
    }

    fn comment(data: &FakeDataStore, id: i64, post_id: Value) -> RecordRef {
        FakeRecord::build(data, "Comment", id)
            .field("post_id", post_id)
            .relationship(RelationshipField::belongs_to("post", "Post", "post_id"))
            .finish()
    }

    fn post(data: &FakeDataStore, id: i64) -> RecordRef {
        FakeRecord::build(data, "Post", id)
            .relationship(RelationshipField::has_many("comments", "Comment", "post_id"))
            .finish()
    }

    #[test]
    fn test_many_to_one_picks_by_join_key() {
        let fx = Fixture::new();
        let first = post(&fx.data, 1);
        let second = post(&fx.data, 2);
        let c1 = comment(&fx.data, 10, json!(2));
        fx.data.disable_queries();

        fx.walk(&[first, Arc::clone(&second), Arc::clone(&c1)]);
        fx.reconcile();

        let attached = c1.attached("post").unwrap().first().unwrap();
        assert!(same_instance(&attached, &second));
    }

    #[test]
    fn test_one_to_many_collects_every_match_in_cache_order() {
        let fx = Fixture::new();
        let parent = post(&fx.data, 1);
        let other = post(&fx.data, 2);
        let c3 = comment(&fx.data, 3, json!(1));
        let c1 = comment(&fx.data, 1, json!(1));
        let c2 = comment(&fx.data, 2, json!(2));
        fx.data.disable_queries();

        fx.walk(&[
            Arc::clone(&c3),
            Arc::clone(&c2),
            Arc::clone(&c1),
            Arc::clone(&parent),
            other,
        ]);
        fx.reconcile();

        let comments = parent.attached("comments").unwrap().records();
        let keys: Vec<PrimaryKey> = comments.iter().map(|c| c.primary_key()).collect();
        assert_eq!(keys, vec![PrimaryKey::Integer(3), PrimaryKey::Integer(1)]);
    }

    #[test]
    fn test_no_match_sets_absent_values() {
        let fx = Fixture::new();
        let lonely = post(&fx.data, 5);
        let stray = comment(&fx.data, 1, json!(99));
        fx.data.disable_queries();

        fx.walk(&[Arc::clone(&lonely), Arc::clone(&stray)]);
        fx.reconcile();

        assert!(matches!(stray.attached("post"), Some(Related::One(None))));
        assert!(lonely.attached("comments").unwrap().is_empty());
    }

    #[test]
    fn test_null_join_values_never_match() {
        let fx = Fixture::new();
        let parent = post(&fx.data, 1);
        let orphan = comment(&fx.data, 1, Value::Null);
        fx.data.disable_queries();

        fx.walk(&[Arc::clone(&parent), Arc::clone(&orphan)]);
        fx.reconcile();

        assert!(parent.attached("comments").unwrap().is_empty());
        assert!(matches!(orphan.attached("post"), Some(Related::One(None))));
    }

    #[test]
    fn test_edge_with_uncached_endpoint_is_skipped() {
        let fx = Fixture::new();
        let parent = post(&fx.data, 1);
        fx.data.disable_queries();

        fx.walk(&[Arc::clone(&parent)]);
        let report = fx.reconcile();

        assert_eq!(report.edges_processed, 0);
        assert_eq!(report.edges_skipped, 1);
        assert!(parent.attached("comments").is_none());
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let fx = Fixture::new();
        let parent = post(&fx.data, 1);
        let comments: Vec<RecordRef> = (1..=4).map(|id| comment(&fx.data, id, json!(1))).collect();
        fx.data.disable_queries();

        let mut seeds = vec![Arc::clone(&parent)];
        seeds.extend(comments.iter().cloned());
        fx.walk(&seeds);

        let first_report = fx.reconcile();
        let first_comments = parent.attached("comments").unwrap();
        let first_posts: Vec<Related> = comments.iter().map(|c| c.attached("post").unwrap()).collect();

        let second_report = fx.reconcile();
        assert_eq!(first_report, second_report);
        assert!(parent.attached("comments").unwrap().is_same(&first_comments));
        for (comment, before) in comments.iter().zip(&first_posts) {
            assert!(comment.attached("post").unwrap().is_same(before));
        }
    }

    #[test]
    fn test_many_to_many_over_explicit_join_fields() {
        let fx = Fixture::new();
        let tag = |id: i64, group: &str| {
            FakeRecord::build(&fx.data, "Tag", id)
                .field("group", json!(group))
                .finish()
        };
        let t4 = tag(4, "red");
        let t2 = tag(2, "blue");
        let t1 = tag(1, "red");
        let article = FakeRecord::build(&fx.data, "Article", 1)
            .field("tag_group", json!("red"))
            .relationship(RelationshipField::many_to_many("tags", "Tag", "tag_group", "group"))
            .finish();
        fx.data.disable_queries();

        fx.walk(&[t4.clone(), t2, t1.clone(), t4.clone(), Arc::clone(&article)]);
        let report = fx.reconcile();

        let tags = article.attached("tags").unwrap();
        assert!(tags.is_collection());
        let linked = tags.records();
        assert_eq!(linked.len(), 2);
        assert!(same_instance(&linked[0], &t4));
        assert!(same_instance(&linked[1], &t1));
        assert_eq!(report.collection_attachments, 1);
    }

    #[test]
    fn test_report_counts() {
        let fx = Fixture::new();
        let parent = post(&fx.data, 1);
        let c1 = comment(&fx.data, 1, json!(1));
        let c2 = comment(&fx.data, 2, json!(1));
        fx.data.disable_queries();

        fx.walk(&[parent, c1, c2]);
        let report = fx.reconcile();

        assert_eq!(report.edges_processed, 2);
        assert_eq!(report.single_attachments, 2);
        assert_eq!(report.collection_attachments, 1);
        assert_eq!(report.attachments(), 3);
    }
}
