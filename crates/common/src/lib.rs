//! Cache and invalidation layer for mirroring external process memory.
//!
//! # Safety and Quality
//!
//! This crate enforces strict safety and quality standards; no module uses
//! `unsafe`.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: collections (rank-ordered container)
//! - `runtime`: address caches, type dispatch, lifecycle plumbing and test
//!   helpers (parking_lot, dashmap, rayon, tracing)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod collections;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod cache;
#[cfg(feature = "runtime")]
pub mod dispatch;
#[cfg(feature = "runtime")]
pub mod lifecycle;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use cache::{
    CacheAction, CacheKey, CacheStats, FieldReader, HierarchicalAddressCache, KeyedCache,
    RefreshReport, TrackOutcome, TrackedEntry,
};
#[cfg(feature = "foundation")]
pub use collections::RankedContainer;
#[cfg(feature = "runtime")]
pub use dispatch::{DispatchCache, DispatchOutcome, Dispatchable, Handler, TypeInfo, TypeTag};
#[cfg(feature = "runtime")]
pub use lifecycle::{RetentionPolicy, Scheduler, SharedLifecycleState};
pub use procmirror_domain::{Address, LifecycleEvent, LifecycleState, MirrorError, Result};
