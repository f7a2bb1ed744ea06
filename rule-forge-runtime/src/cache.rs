//! Cost-bounded cache of live runtimes
//!
//! Keyed by `(user_id, name)` so a tenant can never be handed another
//! tenant's instance. The byte cost of each entry is the size of its
//! compiled module; the sum of admitted costs stays under the
//! configured budget, with admission and eviction decided by the
//! cache's frequency-based policy. Every displaced entry is closed
//! through the eviction listener.
//!
//! Writes are buffered: a `set` is not guaranteed to be visible to a
//! `get` from another thread until maintenance has run. Tests assert
//! post-write state only after [`RuntimeCache::sync`].

use std::sync::Arc;

use moka::sync::Cache as MokaCache;

use rule_forge_core::CacheConfig;

use crate::Runtime;

/// Cache key scoping a rule to its owning tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleKey {
    pub user_id: i64,
    pub name: String,
}

impl RuleKey {
    pub fn new(user_id: i64, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RuleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.user_id, self.name)
    }
}

#[derive(Clone)]
struct CachedRuntime {
    runtime: Arc<Runtime>,
    cost: u64,
}

/// Concurrency-safe `(user_id, name) -> Runtime` mapping under a total
/// byte budget.
pub struct RuntimeCache {
    inner: MokaCache<RuleKey, CachedRuntime>,
    max_cost: u64,
}

impl RuntimeCache {
    pub fn new(config: &CacheConfig) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(config.max_cost_bytes)
            .weigher(|_key: &RuleKey, entry: &CachedRuntime| {
                entry.cost.min(u32::MAX as u64) as u32
            })
            .eviction_listener(|key: Arc<RuleKey>, entry: CachedRuntime, cause| {
                tracing::debug!(key = %key, ?cause, "closing displaced runtime");
                entry.runtime.close();
            })
            .build();

        Self {
            inner,
            max_cost: config.max_cost_bytes,
        }
    }

    /// Returns a live handle, or `None` on a miss.
    pub fn get(&self, key: &RuleKey) -> Option<Arc<Runtime>> {
        self.inner.get(key).map(|entry| entry.runtime)
    }

    /// Offer a runtime to the cache with its byte cost. Admission is
    /// advisory: `true` means the entry was handed to the cache, not
    /// that a later `get` will hit. Items larger than the whole budget
    /// are rejected outright. A displaced previous entry at the same
    /// key is closed once its in-flight holders release it.
    pub fn set(&self, key: RuleKey, runtime: Arc<Runtime>, cost: u64) -> bool {
        if cost > self.max_cost {
            return false;
        }
        self.inner.insert(key, CachedRuntime { runtime, cost });
        true
    }

    /// Explicit invalidation with the same close guarantee as eviction.
    pub fn delete(&self, key: &RuleKey) {
        self.inner.invalidate(key);
    }

    /// Close every live entry and drain pending maintenance.
    pub fn close(&self) {
        for (key, _) in self.inner.iter() {
            self.inner.invalidate(key.as_ref());
        }
        self.inner.run_pending_tasks();
    }

    /// Run pending maintenance so prior writes, invalidations, and
    /// their close callbacks become observable.
    pub fn sync(&self) {
        self.inner.run_pending_tasks();
    }
}
