//! Tracked entries owned by a [`HierarchicalAddressCache`]

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use procmirror_domain::{Address, FetchError, MirrorError, Result};

use super::hierarchical::{CacheInner, HierarchicalAddressCache, TrackOutcome};
use super::reader::FieldReader;

/// Mirror of one foreign object: its address plus the last snapshot read.
///
/// The snapshot is replaced whole on refresh. A reader calling
/// [`TrackedEntry::fields`] gets either the previous or the new snapshot,
/// never a mix of the two.
pub struct TrackedEntry<R>
where
    R: FieldReader,
{
    address: Address,
    fields: RwLock<Arc<R::Fields>>,
    refreshes: AtomicU64,
    // Non-owning; an entry never keeps its cache alive.
    owner: Weak<CacheInner<R>>,
}

impl<R> TrackedEntry<R>
where
    R: FieldReader,
{
    pub(crate) fn new(address: Address, fields: R::Fields, owner: Weak<CacheInner<R>>) -> Self {
        Self { address, fields: RwLock::new(Arc::new(fields)), refreshes: AtomicU64::new(0), owner }
    }

    /// Address this entry mirrors.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Latest snapshot.
    pub fn fields(&self) -> Arc<R::Fields> {
        Arc::clone(&self.fields.read())
    }

    /// Number of successful refreshes since construction.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// The cache that created this entry, if it is still alive.
    pub fn owner(&self) -> Option<HierarchicalAddressCache<R>> {
        self.owner.upgrade().map(HierarchicalAddressCache::from_inner)
    }

    /// Re-read this entry's fields through its owning cache.
    ///
    /// # Errors
    /// [`MirrorError::Fetch`] when the reader fails (the previous snapshot is
    /// kept), or [`MirrorError::Construction`] if the owning cache is gone.
    pub fn refresh(&self) -> Result<()> {
        let owner = self.owner().ok_or_else(|| self.orphaned())?;
        owner.refresh_entry(self).map_err(MirrorError::from)
    }

    /// Track a nested object through the owning cache.
    ///
    /// # Errors
    /// Same as [`HierarchicalAddressCache::ensure_tracked`], plus
    /// [`MirrorError::Construction`] if the owning cache is gone.
    pub fn track_nested(&self, address: Address) -> Result<TrackOutcome> {
        let owner = self.owner().ok_or_else(|| self.orphaned())?;
        owner.ensure_tracked(address)
    }

    pub(crate) fn refresh_from(&self, reader: &R) -> std::result::Result<(), FetchError> {
        let fresh = reader.read_fields(self.address)?;
        *self.fields.write() = Arc::new(fresh);
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn orphaned(&self) -> MirrorError {
        MirrorError::Construction {
            key: self.address.to_string(),
            reason: "owning cache was dropped".to_string(),
        }
    }
}

impl<R> fmt::Debug for TrackedEntry<R>
where
    R: FieldReader,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedEntry")
            .field("address", &self.address)
            .field("refreshes", &self.refresh_count())
            .finish_non_exhaustive()
    }
}
