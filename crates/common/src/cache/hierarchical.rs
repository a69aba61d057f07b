//! Two-level address cache with parallel bulk refresh
//!
//! A [`HierarchicalAddressCache`] owns a local [`KeyedCache`] of
//! [`TrackedEntry`] values and may name one grandparent cache of the same
//! reader type. Lookups consult the local store first and the grandparent
//! second; there is never a walk beyond that one hop.
//!
//! Bulk refresh fans out over a rayon pool. Callers must not run
//! [`HierarchicalAddressCache::ensure_tracked`] or
//! [`HierarchicalAddressCache::clear`] on the same cache while a refresh is
//! in flight. Reading entries from other threads during a refresh is fine.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use procmirror_domain::{Address, FetchError, LifecycleEvent, LifecycleState, MirrorError, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use super::entry::TrackedEntry;
use super::keyed::KeyedCache;
use super::reader::FieldReader;
use super::stats::CacheStats;
use crate::lifecycle::{RetentionPolicy, Scheduler, SubscriptionId};

/// What [`HierarchicalAddressCache::ensure_tracked`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// A new local entry was constructed.
    Created,
    /// The local store already had the address.
    AlreadyTracked,
    /// The grandparent already tracks the address; nothing was created.
    InGrandparent,
    /// Construction failed. The failure was logged and nothing was stored.
    Failed,
}

impl TrackOutcome {
    /// Returns `true` when the address is now resolvable.
    #[must_use]
    pub const fn is_tracked(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// Result of one [`HierarchicalAddressCache::refresh_all_parallel`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Entries whose snapshot was replaced.
    pub refreshed: usize,
    /// Entries whose refresh failed, sorted. They keep their last snapshot.
    pub failed: Vec<Address>,
    /// Wall time for the whole fan-out.
    pub elapsed: Duration,
}

impl RefreshReport {
    /// Total entries visited.
    #[must_use]
    pub fn total(&self) -> usize {
        self.refreshed + self.failed.len()
    }
}

/// What a cache did in response to a lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheAction {
    /// The event does not concern bulk cache maintenance.
    Ignored,
    /// Local entries were dropped; carries how many.
    Cleared(usize),
    /// Entries were retained and refreshed in bulk.
    Refreshed(RefreshReport),
}

pub(crate) struct CacheInner<R>
where
    R: FieldReader,
{
    store: KeyedCache<Address, TrackedEntry<R>>,
    reader: Arc<R>,
    grandparent: Option<Weak<CacheInner<R>>>,
    pool: Option<Arc<ThreadPool>>,
}

/// Address cache with an optional read-only grandparent.
///
/// Cloning is cheap and yields another handle to the same cache.
pub struct HierarchicalAddressCache<R>
where
    R: FieldReader,
{
    inner: Arc<CacheInner<R>>,
}

impl<R> Clone for HierarchicalAddressCache<R>
where
    R: FieldReader,
{
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

/// Build a rayon pool for bulk refresh. `threads == 0` means one per CPU.
///
/// # Errors
/// [`MirrorError::Config`] if the pool cannot be created.
pub fn refresh_pool(threads: usize) -> Result<Arc<ThreadPool>> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|index| format!("procmirror-refresh-{index}"))
        .build()
        .map(Arc::new)
        .map_err(|err| MirrorError::Config(format!("failed to build refresh pool: {err}")))
}

/// Builder for [`HierarchicalAddressCache`].
pub struct AddressCacheBuilder<R>
where
    R: FieldReader,
{
    name: String,
    reader: Arc<R>,
    grandparent: Option<Weak<CacheInner<R>>>,
    pool: Option<Arc<ThreadPool>>,
}

impl<R> AddressCacheBuilder<R>
where
    R: FieldReader,
{
    /// Consult `cache` before creating local entries.
    ///
    /// Only a weak link is kept; once the grandparent is dropped it is
    /// treated as absent.
    #[must_use]
    pub fn grandparent(mut self, cache: &HierarchicalAddressCache<R>) -> Self {
        self.grandparent = Some(Arc::downgrade(&cache.inner));
        self
    }

    /// Run bulk refreshes on `pool` instead of rayon's global pool.
    #[must_use]
    pub fn refresh_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn build(self) -> HierarchicalAddressCache<R> {
        HierarchicalAddressCache {
            inner: Arc::new(CacheInner {
                store: KeyedCache::new(self.name),
                reader: self.reader,
                grandparent: self.grandparent,
                pool: self.pool,
            }),
        }
    }
}

impl<R> HierarchicalAddressCache<R>
where
    R: FieldReader,
{
    /// Standalone cache with no grandparent, refreshing on the global pool.
    pub fn new(name: impl Into<String>, reader: Arc<R>) -> Self {
        Self::builder(name, reader).build()
    }

    pub fn builder(name: impl Into<String>, reader: Arc<R>) -> AddressCacheBuilder<R> {
        AddressCacheBuilder { name: name.into(), reader, grandparent: None, pool: None }
    }

    pub(crate) fn from_inner(inner: Arc<CacheInner<R>>) -> Self {
        Self { inner }
    }

    /// Name given at construction.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.store.name()
    }

    /// The reader entries are constructed and refreshed from.
    #[must_use]
    pub fn reader(&self) -> &Arc<R> {
        &self.inner.reader
    }

    /// The grandparent cache, if one was configured and is still alive.
    pub fn grandparent(&self) -> Option<Self> {
        self.inner.grandparent.as_ref().and_then(Weak::upgrade).map(Self::from_inner)
    }

    /// Start tracking `address` unless this cache or the grandparent
    /// already does.
    ///
    /// Construction reads the address's fields once. A read failure is
    /// logged and reported as [`TrackOutcome::Failed`] so a batch of
    /// addresses keeps going past one bad entry.
    ///
    /// # Errors
    /// [`MirrorError::InvalidKey`] for the null address.
    pub fn ensure_tracked(&self, address: Address) -> Result<TrackOutcome> {
        if address.is_null() {
            return Err(MirrorError::invalid_key(address));
        }
        if self.inner.store.contains_key(&address) {
            return Ok(TrackOutcome::AlreadyTracked);
        }
        if self.grandparent().is_some_and(|grandparent| grandparent.contains(address)) {
            return Ok(TrackOutcome::InGrandparent);
        }

        let owner = Arc::downgrade(&self.inner);
        let reader = &self.inner.reader;
        let mut created = false;
        let result = self.inner.store.try_get_or_create(address, |&key| {
            let fields = reader.read_fields(key)?;
            created = true;
            Ok(TrackedEntry::new(key, fields, owner))
        });

        match result {
            Ok(_) if created => {
                debug!(cache = %self.name(), %address, "tracking new entry");
                Ok(TrackOutcome::Created)
            }
            Ok(_) => Ok(TrackOutcome::AlreadyTracked),
            Err(err) => {
                warn!(cache = %self.name(), %address, error = %err, "failed to construct entry");
                Ok(TrackOutcome::Failed)
            }
        }
    }

    /// Local entry for `address`, else the grandparent's.
    ///
    /// # Errors
    /// [`MirrorError::InvalidKey`] for the null address and
    /// [`MirrorError::NotFound`] when neither store has it.
    pub fn resolve(&self, address: Address) -> Result<Arc<TrackedEntry<R>>> {
        if address.is_null() {
            return Err(MirrorError::invalid_key(address));
        }
        if let Some(entry) = self.inner.store.get(&address) {
            return Ok(entry);
        }
        self.grandparent()
            .and_then(|grandparent| grandparent.inner.store.get(&address))
            .ok_or_else(|| MirrorError::not_found(self.name(), address))
    }

    /// Re-read every local entry concurrently.
    ///
    /// Each entry is independent: a failed read is logged, leaves that
    /// entry's last snapshot in place and lands in
    /// [`RefreshReport::failed`]. Returns once every entry was visited.
    pub fn refresh_all_parallel(&self) -> RefreshReport {
        let started = Instant::now();
        let entries = self.inner.store.values();

        let refresh = || -> Vec<Address> {
            entries
                .par_iter()
                .filter_map(|entry| self.refresh_entry(entry).err().map(|_| entry.address()))
                .collect()
        };
        let mut failed = match &self.inner.pool {
            Some(pool) => pool.install(refresh),
            None => refresh(),
        };
        failed.sort_unstable();

        let report =
            RefreshReport { refreshed: entries.len() - failed.len(), failed, elapsed: started.elapsed() };
        info!(
            cache = %self.name(),
            refreshed = report.refreshed,
            failed = report.failed.len(),
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "parallel refresh finished"
        );
        report
    }

    pub(crate) fn refresh_entry(
        &self,
        entry: &TrackedEntry<R>,
    ) -> std::result::Result<(), FetchError> {
        let outcome = entry.refresh_from(&self.inner.reader);
        self.inner.store.metrics().record_refresh(outcome.is_ok());
        if let Err(err) = &outcome {
            warn!(
                cache = %self.name(),
                address = %entry.address(),
                error = %err,
                "entry refresh failed, keeping last snapshot"
            );
        }
        outcome
    }

    /// Drop every local entry. The grandparent is untouched.
    pub fn clear(&self) -> usize {
        self.inner.store.clear()
    }

    /// Returns `true` if this cache itself tracks `address`.
    pub fn contains(&self, address: Address) -> bool {
        self.inner.store.contains_key(&address)
    }

    /// Number of local entries.
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// Returns `true` when there are no local entries.
    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    /// Snapshot of the local entries, in no particular order.
    pub fn entries(&self) -> Vec<Arc<TrackedEntry<R>>> {
        self.inner.store.values()
    }

    /// Sorted local addresses.
    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses = self.inner.store.keys();
        addresses.sort_unstable();
        addresses
    }

    /// Statistics for the local store.
    pub fn stats(&self) -> CacheStats {
        self.inner.store.stats()
    }

    /// Apply `policy` to a lifecycle event.
    ///
    /// Ticks are ignored. A process close always clears. An area change
    /// clears unless `state` is preserved, in which case the retained
    /// entries are refreshed once.
    pub fn on_lifecycle_event(
        &self,
        event: LifecycleEvent,
        state: LifecycleState,
        policy: &RetentionPolicy,
    ) -> CacheAction {
        if event == LifecycleEvent::PerFrameTick {
            return CacheAction::Ignored;
        }
        if policy.should_clear(event, state) {
            CacheAction::Cleared(self.clear())
        } else {
            CacheAction::Refreshed(self.refresh_all_parallel())
        }
    }

    /// Subscribe this cache to the scheduler's process-closed and
    /// area-changed events.
    ///
    /// The callbacks hold a weak handle and stop doing anything once the
    /// cache is dropped.
    pub fn attach(&self, scheduler: &mut Scheduler, policy: RetentionPolicy) -> Vec<SubscriptionId> {
        [LifecycleEvent::ProcessClosed, LifecycleEvent::LogicalAreaChanged]
            .into_iter()
            .map(|event| {
                let cache = Arc::downgrade(&self.inner);
                let policy = policy.clone();
                scheduler.subscribe(event, move |ctx| {
                    let Some(inner) = cache.upgrade() else {
                        return;
                    };
                    let cache = Self::from_inner(inner);
                    let action = cache.on_lifecycle_event(ctx.event, ctx.state, &policy);
                    debug!(cache = %cache.name(), event = %ctx.event, ?action, "lifecycle maintenance");
                })
            })
            .collect()
    }
}

impl<R> fmt::Debug for HierarchicalAddressCache<R>
where
    R: FieldReader,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HierarchicalAddressCache")
            .field("name", &self.name())
            .field("len", &self.len())
            .field("grandparent", &self.grandparent().map(|g| g.name().to_string()))
            .finish_non_exhaustive()
    }
}
