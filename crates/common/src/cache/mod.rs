//! Memoizing caches over foreign process memory
//!
//! This module provides the two address-keyed caches the mirror is built on:
//!
//! - [`KeyedCache`]: generic get-or-create store keyed by address or type,
//!   cleared in bulk, with no eviction.
//! - [`HierarchicalAddressCache`]: a [`KeyedCache`] of [`TrackedEntry`]
//!   values plus an optional grandparent consulted before creating, parallel
//!   bulk refresh, and lifecycle-driven retention.
//!
//! Entries are built from a [`FieldReader`], the seam to whatever decodes the
//! monitored process's memory.
//!
//! # Examples
//!
//! ## Root and child caches
//! ```
//! use std::sync::Arc;
//!
//! use procmirror_common::cache::{HierarchicalAddressCache, TrackOutcome};
//! use procmirror_common::testing::fixtures::entity_reader;
//! use procmirror_domain::Address;
//!
//! let reader = entity_reader([0x1000, 0x2000], 100);
//! let root = HierarchicalAddressCache::new("world", Arc::clone(&reader));
//! let child = HierarchicalAddressCache::builder("inventory", reader).grandparent(&root).build();
//!
//! root.ensure_tracked(Address::new(0x1000)).unwrap();
//! assert_eq!(child.ensure_tracked(Address::new(0x1000)).unwrap(), TrackOutcome::InGrandparent);
//! assert_eq!(child.ensure_tracked(Address::new(0x2000)).unwrap(), TrackOutcome::Created);
//! assert_eq!(child.resolve(Address::new(0x1000)).unwrap().fields().id, 0x1000);
//! ```
//!
//! ## Bulk refresh
//! ```
//! use std::sync::Arc;
//!
//! use procmirror_common::cache::{refresh_pool, HierarchicalAddressCache};
//! use procmirror_common::testing::fixtures::entity_reader;
//! use procmirror_domain::Address;
//!
//! let reader = entity_reader([0x10, 0x20], 100);
//! let cache = HierarchicalAddressCache::builder("actors", reader)
//!     .refresh_pool(refresh_pool(2).unwrap())
//!     .build();
//! cache.ensure_tracked(Address::new(0x10)).unwrap();
//! cache.ensure_tracked(Address::new(0x20)).unwrap();
//!
//! let report = cache.refresh_all_parallel();
//! assert_eq!(report.refreshed, 2);
//! assert!(report.failed.is_empty());
//! ```

mod entry;
mod hierarchical;
mod keyed;
mod reader;
mod stats;

pub use entry::TrackedEntry;
pub use hierarchical::{
    refresh_pool, AddressCacheBuilder, CacheAction, HierarchicalAddressCache, RefreshReport,
    TrackOutcome,
};
pub use keyed::{CacheKey, KeyedCache};
pub use reader::FieldReader;
pub use stats::CacheStats;
