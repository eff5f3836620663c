//! Cache of resolved routes keyed by method and normalized path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::method::HttpMethod;
use crate::router::{ParamVec, RouteEntry};

/// A cached resolution: the entry and the path parameters extracted for the
/// exact path that produced it.
#[derive(Debug, Clone)]
pub struct CachedRoute {
    pub entry: Arc<RouteEntry>,
    pub params: ParamVec,
}

/// Concurrent map from `(method, path)` to a previous successful resolution.
///
/// Entries are never evicted. With a capacity set, new paths stop being
/// cached once the map is full; the router still answers them.
#[derive(Debug, Default)]
pub struct ResolvedRouteCache {
    entries: DashMap<(HttpMethod, String), CachedRoute>,
    capacity: Option<usize>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResolvedRouteCache {
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn get(&self, method: HttpMethod, path: &str) -> Option<CachedRoute> {
        let found = self
            .entries
            .get(&(method, path.to_string()))
            .map(|cached| cached.value().clone());
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Store a resolution unless one is already present or the cache is full.
    /// Concurrent inserts for the same key keep the first.
    pub fn insert(&self, method: HttpMethod, path: &str, route: CachedRoute) {
        if self.capacity.is_some_and(|cap| self.entries.len() >= cap) {
            return;
        }
        self.entries
            .entry((method, path.to_string()))
            .or_insert(route);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
