//! Polymorphic handler resolution over declared type hierarchies
//!
//! Values describe their concrete type through a static [`TypeInfo`] chain.
//! A [`DispatchCache`] walks that chain once per concrete type, memoizes the
//! most specific registered [`Handler`] (or the absence of one) and invokes
//! it, falling back to a no-op handler when nothing in the chain matched.
//!
//! ```
//! use procmirror_common::dispatch::{DispatchCache, DispatchOutcome, FnHandler, TypeInfo};
//! use procmirror_common::impl_dispatchable;
//!
//! static OBJECT: TypeInfo = TypeInfo::root("Object");
//! static ITEM: TypeInfo = TypeInfo::derived("Item", &OBJECT);
//!
//! struct Item;
//! impl_dispatchable!(Item => ITEM);
//!
//! let mut cache: DispatchCache<Vec<String>> = DispatchCache::new();
//! cache
//!     .register(FnHandler::new(Some(&OBJECT), |value, _, out: &mut Vec<String>| {
//!         out.push(value.type_info().name().to_string());
//!     }))
//!     .unwrap();
//!
//! let mut out = Vec::new();
//! let outcome = cache.dispatch(Some(&Item), &mut out);
//! assert!(matches!(outcome, DispatchOutcome::Handled { .. }));
//! assert_eq!(out, ["Item"]);
//! ```

mod cache;
mod type_info;

pub use cache::{DispatchCache, DispatchOutcome, DispatchStats, FallbackHandler, FnHandler, Handler};
pub use type_info::{Ancestry, Dispatchable, TypeInfo, TypeTag};
