//! Memoized handler resolution

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use procmirror_domain::{MirrorError, Result};
use tracing::{debug, trace};

use super::type_info::{Dispatchable, TypeInfo, TypeTag};

/// Something that can process values of one declared type and its
/// descendants.
///
/// `C` is caller-supplied context passed through every dispatch, for
/// example a draw list or an output buffer.
pub trait Handler<C>: Send + Sync {
    /// Declared target type. `None` is rejected at registration.
    fn target(&self) -> Option<&'static TypeInfo>;

    /// Process `value`. The handler may dispatch nested values through
    /// `dispatcher`; dispatching `value` itself again recurses forever.
    fn handle(&self, value: &dyn Dispatchable, dispatcher: &DispatchCache<C>, ctx: &mut C);
}

/// Handler backed by a closure.
pub struct FnHandler<F> {
    target: Option<&'static TypeInfo>,
    func: F,
}

impl<F> FnHandler<F> {
    pub fn new<C>(target: Option<&'static TypeInfo>, func: F) -> Self
    where
        F: Fn(&dyn Dispatchable, &DispatchCache<C>, &mut C) + Send + Sync,
    {
        Self { target, func }
    }
}

impl<C, F> Handler<C> for FnHandler<F>
where
    F: Fn(&dyn Dispatchable, &DispatchCache<C>, &mut C) + Send + Sync,
{
    fn target(&self) -> Option<&'static TypeInfo> {
        self.target
    }

    fn handle(&self, value: &dyn Dispatchable, dispatcher: &DispatchCache<C>, ctx: &mut C) {
        (self.func)(value, dispatcher, ctx);
    }
}

/// Accepts any value and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackHandler;

impl<C> Handler<C> for FallbackHandler {
    fn target(&self) -> Option<&'static TypeInfo> {
        None
    }

    fn handle(&self, _value: &dyn Dispatchable, _dispatcher: &DispatchCache<C>, _ctx: &mut C) {}
}

/// What [`DispatchCache::dispatch`] did with a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No value was given.
    Skipped,
    /// A registered handler ran.
    Handled {
        /// Concrete type of the value.
        concrete: TypeTag,
        /// Type the handler was registered for.
        matched: TypeTag,
    },
    /// Nothing in the ancestry matched; the fallback ran.
    Fallback { concrete: TypeTag },
}

impl DispatchOutcome {
    /// Tag of the registration that handled the value, if any.
    #[must_use]
    pub const fn handled_by(&self) -> Option<TypeTag> {
        match self {
            Self::Handled { matched, .. } => Some(*matched),
            Self::Skipped | Self::Fallback { .. } => None,
        }
    }
}

/// Counters describing resolution work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub registered: usize,
    /// Concrete types with a memoized resolution.
    pub memoized: usize,
    /// Ancestor-chain walks performed.
    pub walks: u64,
    /// Chain links visited across all walks.
    pub steps: u64,
    /// Resolutions answered from the memo.
    pub memo_hits: u64,
    /// Dispatches that ended in the fallback.
    pub fallbacks: u64,
}

type Resolution<C> = Option<(TypeTag, Arc<dyn Handler<C>>)>;

/// Resolves the most specific handler for a value's concrete type.
///
/// Registration happens up front through `&mut self`. Dispatch takes
/// `&self`, and the memo lock is never held while a handler runs, so
/// handlers can dispatch nested values through the same cache.
pub struct DispatchCache<C> {
    handlers: HashMap<TypeTag, Arc<dyn Handler<C>>>,
    resolutions: RwLock<HashMap<TypeTag, Resolution<C>>>,
    fallback: Arc<dyn Handler<C>>,
    walks: AtomicU64,
    steps: AtomicU64,
    memo_hits: AtomicU64,
    fallbacks: AtomicU64,
}

impl<C: 'static> DispatchCache<C> {
    /// Cache with the no-op [`FallbackHandler`].
    pub fn new() -> Self {
        Self::with_fallback(FallbackHandler)
    }

    /// Cache that runs `fallback` when no registration matches.
    pub fn with_fallback(fallback: impl Handler<C> + 'static) -> Self {
        Self {
            handlers: HashMap::new(),
            resolutions: RwLock::new(HashMap::new()),
            fallback: Arc::new(fallback),
            walks: AtomicU64::new(0),
            steps: AtomicU64::new(0),
            memo_hits: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        }
    }
}

impl<C: 'static> Default for DispatchCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> DispatchCache<C> {
    /// Register `handler` for its declared target type.
    ///
    /// A second handler for the same type replaces the first. Memoized
    /// resolutions are forgotten since a new registration can change which
    /// ancestor is the closest match.
    ///
    /// # Errors
    /// [`MirrorError::InvalidHandler`] when the handler declares no target.
    pub fn register(&mut self, handler: impl Handler<C> + 'static) -> Result<()> {
        let Some(target) = handler.target() else {
            return Err(MirrorError::InvalidHandler("handler declares no target type".to_string()));
        };
        if self.handlers.insert(target.tag(), Arc::new(handler)).is_some() {
            debug!(target = %target.tag(), "replaced dispatch handler");
        }
        self.resolutions.get_mut().clear();
        Ok(())
    }

    /// Returns `true` if a handler is registered for exactly `info`.
    pub fn is_registered(&self, info: &TypeInfo) -> bool {
        self.handlers.contains_key(&info.tag())
    }

    /// Route `value` to its handler.
    ///
    /// `None` is a no-op. A value whose ancestry has no registration goes to
    /// the fallback, so dispatch never fails.
    pub fn dispatch(&self, value: Option<&dyn Dispatchable>, ctx: &mut C) -> DispatchOutcome {
        let Some(value) = value else {
            return DispatchOutcome::Skipped;
        };
        let info = value.type_info();
        let concrete = info.tag();

        match self.lookup(info) {
            Some((matched, handler)) => {
                handler.handle(value, self, ctx);
                DispatchOutcome::Handled { concrete, matched }
            }
            None => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                self.fallback.handle(value, self, ctx);
                DispatchOutcome::Fallback { concrete }
            }
        }
    }

    /// Registration that would handle values of type `info`, if any.
    pub fn resolve(&self, info: &TypeInfo) -> Option<TypeTag> {
        self.lookup(info).map(|(matched, _)| matched)
    }

    /// Forget every memoized resolution, returning how many were dropped.
    pub fn clear_resolutions(&self) -> usize {
        let mut resolutions = self.resolutions.write();
        let dropped = resolutions.len();
        resolutions.clear();
        dropped
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            registered: self.handlers.len(),
            memoized: self.resolutions.read().len(),
            walks: self.walks.load(Ordering::Relaxed),
            steps: self.steps.load(Ordering::Relaxed),
            memo_hits: self.memo_hits.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }

    fn lookup(&self, info: &TypeInfo) -> Resolution<C> {
        let concrete = info.tag();
        if let Some(memoized) = self.resolutions.read().get(&concrete) {
            self.memo_hits.fetch_add(1, Ordering::Relaxed);
            return memoized.clone();
        }

        let found = self.walk(info);
        self.resolutions.write().entry(concrete).or_insert(found).clone()
    }

    fn walk(&self, info: &TypeInfo) -> Resolution<C> {
        self.walks.fetch_add(1, Ordering::Relaxed);
        for ancestor in info.ancestry() {
            self.steps.fetch_add(1, Ordering::Relaxed);
            if let Some(handler) = self.handlers.get(&ancestor.tag()) {
                trace!(concrete = %info.tag(), matched = %ancestor.tag(), "resolved dispatch handler");
                return Some((ancestor.tag(), Arc::clone(handler)));
            }
        }
        trace!(concrete = %info.tag(), "no dispatch handler in ancestry");
        None
    }
}

impl<C> fmt::Debug for DispatchCache<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut registered: Vec<TypeTag> = self.handlers.keys().copied().collect();
        registered.sort_unstable();
        f.debug_struct("DispatchCache")
            .field("registered", &registered)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
