//! Address- or type-keyed memoizing store
//!
//! [`KeyedCache`] is the leaf every other cache builds on: get-or-create by
//! key and bulk clear. There is no per-entry expiry or eviction.
//!
//! # Creation guarantee
//!
//! The store is a sharded concurrent map. A miss takes the shard's entry slot
//! and runs the factory while holding it, so for a given key the factory runs
//! at most once and every concurrent caller receives the same `Arc<V>`. The
//! factory must therefore not call back into the same cache. A factory that
//! fails leaves no entry behind.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use procmirror_domain::{Address, MirrorError, Result};
use tracing::debug;

use super::stats::{CacheStats, MetricsCollector};

/// Key usable in a [`KeyedCache`].
///
/// Keys that report [`CacheKey::is_null`] are rejected before any factory
/// runs.
pub trait CacheKey: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {
    /// Returns `true` for the distinguished invalid key.
    fn is_null(&self) -> bool {
        false
    }
}

impl CacheKey for Address {
    fn is_null(&self) -> bool {
        Self::is_null(*self)
    }
}

impl CacheKey for u64 {}

impl CacheKey for String {
    fn is_null(&self) -> bool {
        self.is_empty()
    }
}

impl CacheKey for &'static str {
    fn is_null(&self) -> bool {
        self.is_empty()
    }
}

/// Generic memoizing cache keyed by address or type.
///
/// # Example
/// ```
/// use procmirror_common::cache::KeyedCache;
/// use procmirror_domain::Address;
///
/// let cache: KeyedCache<Address, String> = KeyedCache::new("labels");
/// let label = cache.get_or_create(Address::new(0x10), |a| format!("obj@{a}")).unwrap();
/// assert_eq!(label.as_str(), "obj@0x10");
/// assert!(cache.get_or_create(Address::NULL, |_| String::new()).is_err());
/// ```
pub struct KeyedCache<K, V>
where
    K: CacheKey,
{
    name: String,
    store: DashMap<K, Arc<V>>,
    metrics: MetricsCollector,
}

impl<K, V> KeyedCache<K, V>
where
    K: CacheKey,
{
    /// Create an empty cache. `name` only appears in logs and errors.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), store: DashMap::new(), metrics: MetricsCollector::new() }
    }

    /// Name given at construction.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the entry for `key`, creating it with `factory` on a miss.
    ///
    /// # Errors
    /// [`MirrorError::InvalidKey`] for a null key; the factory is not called.
    pub fn get_or_create<F>(&self, key: K, factory: F) -> Result<Arc<V>>
    where
        F: FnOnce(&K) -> V,
    {
        self.try_get_or_create(key, |key| Ok(factory(key)))
    }

    /// Fallible form of [`Self::get_or_create`].
    ///
    /// # Errors
    /// [`MirrorError::InvalidKey`] for a null key, otherwise whatever the
    /// factory returned. A failed factory stores nothing.
    pub fn try_get_or_create<F>(&self, key: K, factory: F) -> Result<Arc<V>>
    where
        F: FnOnce(&K) -> Result<V>,
    {
        if key.is_null() {
            return Err(MirrorError::invalid_key(&key));
        }

        if let Some(existing) = self.get(&key) {
            return Ok(existing);
        }

        match self.store.entry(key) {
            // Lost a race with another creator between the read and the entry lock
            Entry::Occupied(occupied) => Ok(Arc::clone(occupied.get())),
            Entry::Vacant(vacant) => match factory(vacant.key()) {
                Ok(value) => {
                    let value = Arc::new(value);
                    vacant.insert(Arc::clone(&value));
                    self.metrics.record_creation();
                    Ok(value)
                }
                Err(err) => {
                    self.metrics.record_failed_creation();
                    Err(err)
                }
            },
        }
    }

    /// Existing entry for `key`, without creating one.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let found = self.store.get(key).map(|entry| Arc::clone(entry.value()));
        if found.is_some() {
            self.metrics.record_hit();
        } else {
            self.metrics.record_miss();
        }
        found
    }

    /// Returns `true` if `key` has an entry. Not counted as a lookup.
    pub fn contains_key(&self, key: &K) -> bool {
        self.store.contains_key(key)
    }

    /// Remove every entry, returning how many were dropped.
    ///
    /// Readers holding an `Arc` from before the clear keep a stale but valid
    /// value until they release it.
    pub fn clear(&self) -> usize {
        let dropped = self.store.len();
        self.store.clear();
        self.metrics.record_clear();
        debug!(cache = %self.name, dropped, "cache cleared");
        dropped
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Snapshot of the current keys, in no particular order.
    pub fn keys(&self) -> Vec<K> {
        self.store.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Snapshot of the current values, in no particular order.
    pub fn values(&self) -> Vec<Arc<V>> {
        self.store.iter().map(|entry| Arc::clone(entry.value())).collect()
    }

    /// Current statistics.
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.len())
    }

    pub(crate) fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }
}

impl<K, V> fmt::Debug for KeyedCache<K, V>
where
    K: CacheKey,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedCache").field("name", &self.name).field("len", &self.len()).finish()
    }
}
