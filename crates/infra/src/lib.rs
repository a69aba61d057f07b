//! # procmirror infrastructure
//!
//! Impure adapters around the cache layer.
//!
//! This crate contains:
//! - Configuration loading from the environment and config files
//! - Tracing subscriber setup
//! - File persistence for ranked containers
//! - [`MirrorSession`], which wires caches to the lifecycle scheduler
//!
//! ## Architecture
//! - Builds on `procmirror-common` (caches, dispatch, lifecycle)
//! - Uses configuration and error types from `procmirror-domain`
//! - Contains all code that touches files, the environment or global state

pub mod config;
pub mod logging;
pub mod persistence;
pub mod session;

// Re-export commonly used items
pub use logging::init_tracing;
pub use persistence::{load_ranked, save_ranked};
pub use session::{DiscoveryHook, MirrorSession, TickReport};
