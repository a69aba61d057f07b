//! Testing utilities and helpers
//!
//! This module provides:
//! - **[`reader`]**: a scripted [`FieldReader`](crate::cache::FieldReader)
//!   whose values and failures are set per address
//! - **[`fixtures`]**: small snapshot types and ready-made readers
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use procmirror_common::cache::HierarchicalAddressCache;
//! use procmirror_common::testing::fixtures::entity_reader;
//! use procmirror_domain::Address;
//!
//! let reader = entity_reader([0x10, 0x20], 100);
//! let cache = HierarchicalAddressCache::new("actors", Arc::clone(&reader));
//! cache.ensure_tracked(Address::new(0x10)).unwrap();
//! assert_eq!(reader.reads_at(Address::new(0x10)), 1);
//! ```

pub mod fixtures;
pub mod reader;

pub use fixtures::{entity_reader, EntitySnapshot};
pub use reader::ScriptedReader;
