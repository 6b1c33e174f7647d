//! Related objects cache: store, graph walker, cross-linker, access
//! interceptor and the traversal episode tying them together

pub mod episode;
pub mod interceptor;
pub mod linker;
pub mod store;
pub mod walker;

pub use episode::{CacheStats, EpisodeGuard, RelatedObjectsCache};
pub use interceptor::{
    active_resolver, install, is_installed, resolve_many, resolve_one, resolve_related,
    CachingResolver, DirectResolver, InterceptorGuard, RelationshipResolver,
};
pub use linker::{CrossLinker, ReconcileReport};
pub use store::{CacheStore, InsertOutcome, SharedStore};
pub use walker::{CancellationFlag, GraphWalker, WalkStats};
