//! Caches wired to a lifecycle scheduler
//!
//! A [`MirrorSession`] owns the scheduler, the lifecycle state handle and a
//! root cache, plus any number of named child caches that use the root as
//! their grandparent. The driver calls [`MirrorSession::change_area`],
//! [`MirrorSession::process_closed`] and [`MirrorSession::tick`]; the caches
//! clear or refresh themselves from the scheduler callbacks.

use std::fmt;
use std::sync::Arc;

use procmirror_common::cache::{
    refresh_pool, FieldReader, HierarchicalAddressCache, TrackOutcome, TrackedEntry,
};
use procmirror_common::lifecycle::{RetentionPolicy, Scheduler, SharedLifecycleState};
use procmirror_domain::{
    Address, CacheSettings, LifecycleEvent, LifecycleState, MirrorError, Result,
};
use rayon::ThreadPool;
use tracing::{debug, info};

/// Maps a refreshed root entry to addresses a child cache should track.
pub type DiscoveryHook<R> = Box<dyn Fn(&TrackedEntry<R>) -> Vec<Address> + Send + Sync>;

/// What one [`MirrorSession::tick`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Frame number after this tick.
    pub frame: u64,
    /// Root entries refreshed successfully.
    pub refreshed: usize,
    /// Root entries whose refresh failed, sorted.
    pub failed: Vec<Address>,
    /// Child entries newly created by discovery.
    pub discovered: usize,
}

struct ChildCache<R>
where
    R: FieldReader,
{
    name: String,
    cache: HierarchicalAddressCache<R>,
    discover: Option<DiscoveryHook<R>>,
}

/// Root and child caches driven by lifecycle events.
pub struct MirrorSession<R>
where
    R: FieldReader,
{
    scheduler: Scheduler,
    state: SharedLifecycleState,
    policy: RetentionPolicy,
    pool: Arc<ThreadPool>,
    root: HierarchicalAddressCache<R>,
    children: Vec<ChildCache<R>>,
}

impl<R> MirrorSession<R>
where
    R: FieldReader,
{
    /// Start a session reading through `reader`, detached from any process.
    ///
    /// # Errors
    /// Returns `MirrorError::Config` if the refresh pool cannot be built.
    pub fn new(reader: Arc<R>, settings: &CacheSettings) -> Result<Self> {
        let pool = refresh_pool(settings.refresh_threads)?;
        let policy = RetentionPolicy::from_settings(settings);
        let root =
            HierarchicalAddressCache::builder("root", reader).refresh_pool(Arc::clone(&pool)).build();

        let mut scheduler = Scheduler::new();
        root.attach(&mut scheduler, policy.clone());

        info!(
            refresh_threads = pool.current_num_threads(),
            preserved = ?policy.preserved(),
            "mirror session started"
        );

        Ok(Self {
            scheduler,
            state: SharedLifecycleState::default(),
            policy,
            pool,
            root,
            children: Vec::new(),
        })
    }

    /// Add a child cache that is only populated explicitly.
    ///
    /// # Errors
    /// Returns `MirrorError::Config` if a child named `name` already exists.
    pub fn add_child(&mut self, name: &str) -> Result<HierarchicalAddressCache<R>> {
        self.insert_child(name, None)
    }

    /// Add a child cache fed on every tick by `discover`, which runs against
    /// each successfully refreshed root entry.
    ///
    /// # Errors
    /// Returns `MirrorError::Config` if a child named `name` already exists.
    pub fn add_discovering_child<D>(
        &mut self,
        name: &str,
        discover: D,
    ) -> Result<HierarchicalAddressCache<R>>
    where
        D: Fn(&TrackedEntry<R>) -> Vec<Address> + Send + Sync + 'static,
    {
        self.insert_child(name, Some(Box::new(discover)))
    }

    fn insert_child(
        &mut self,
        name: &str,
        discover: Option<DiscoveryHook<R>>,
    ) -> Result<HierarchicalAddressCache<R>> {
        if name == self.root.name() || self.child(name).is_some() {
            return Err(MirrorError::Config(format!("cache '{}' already exists", name)));
        }

        let cache = HierarchicalAddressCache::builder(name, Arc::clone(self.root.reader()))
            .grandparent(&self.root)
            .refresh_pool(Arc::clone(&self.pool))
            .build();
        cache.attach(&mut self.scheduler, self.policy.clone());
        debug!(cache = name, discovering = discover.is_some(), "child cache added");

        self.children.push(ChildCache { name: name.to_string(), cache: cache.clone(), discover });
        Ok(cache)
    }

    /// Track a top-level object in the root cache.
    ///
    /// # Errors
    /// `MirrorError::InvalidKey` for the null address.
    pub fn track_root(&self, address: Address) -> Result<TrackOutcome> {
        self.root.ensure_tracked(address)
    }

    pub fn root(&self) -> &HierarchicalAddressCache<R> {
        &self.root
    }

    /// Child cache named `name`.
    pub fn child(&self, name: &str) -> Option<&HierarchicalAddressCache<R>> {
        self.children.iter().find(|child| child.name == name).map(|child| &child.cache)
    }

    /// Handle for reading the lifecycle state from elsewhere.
    pub fn state(&self) -> &SharedLifecycleState {
        &self.state
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Scheduler, for subscribing additional callbacks.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// The process went away. Every cache clears.
    ///
    /// Returns how many callbacks ran.
    pub fn process_closed(&mut self) -> usize {
        self.state.set(LifecycleState::Detached);
        self.scheduler.raise(LifecycleEvent::ProcessClosed, LifecycleState::Detached)
    }

    /// The process entered `state` in a new logical area. Caches clear or
    /// refresh according to the retention policy before this returns.
    ///
    /// Returns how many callbacks ran.
    pub fn change_area(&mut self, state: LifecycleState) -> usize {
        let previous = self.state.set(state);
        debug!(from = %previous, to = %state, "logical area changed");
        self.scheduler.raise(LifecycleEvent::LogicalAreaChanged, state)
    }

    /// Refresh every root entry, feed discovering children, then deliver the
    /// tick to scheduler subscribers.
    ///
    /// Root entries are refreshed one at a time on the calling thread. A
    /// failed refresh keeps the entry's last snapshot and skips discovery for
    /// it.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        for entry in self.root.entries() {
            if entry.refresh().is_err() {
                report.failed.push(entry.address());
                continue;
            }
            report.refreshed += 1;
            report.discovered += self.discover_from(&entry);
        }
        report.failed.sort_unstable();

        self.scheduler.raise(LifecycleEvent::PerFrameTick, self.state.get());
        report.frame = self.scheduler.frame();
        report
    }

    fn discover_from(&self, entry: &TrackedEntry<R>) -> usize {
        let mut created = 0;
        for child in &self.children {
            let Some(discover) = &child.discover else {
                continue;
            };
            for address in discover(entry).into_iter().filter(|address| !address.is_null()) {
                if let Ok(TrackOutcome::Created) = child.cache.ensure_tracked(address) {
                    created += 1;
                }
            }
        }
        created
    }
}

impl<R> fmt::Debug for MirrorSession<R>
where
    R: FieldReader,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let children: Vec<&str> = self.children.iter().map(|child| child.name.as_str()).collect();
        f.debug_struct("MirrorSession")
            .field("state", &self.state.get())
            .field("root", &self.root)
            .field("children", &children)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use procmirror_common::testing::entity_reader;

    use super::*;

    #[test]
    fn test_duplicate_child_names_rejected() {
        let mut session = MirrorSession::new(entity_reader([], 0), &CacheSettings::default()).unwrap();
        session.add_child("items").unwrap();

        assert!(matches!(session.add_child("items"), Err(MirrorError::Config(_))));
        assert!(matches!(session.add_child("root"), Err(MirrorError::Config(_))));
    }

    #[test]
    fn test_process_closed_detaches_state() {
        let mut session = MirrorSession::new(entity_reader([0x10], 1), &CacheSettings::default()).unwrap();
        session.change_area(LifecycleState::InArea);
        session.track_root(Address::new(0x10)).unwrap();

        session.process_closed();

        assert_eq!(session.state().get(), LifecycleState::Detached);
        assert!(session.root().is_empty());
    }
}
