//! Configuration loading and management
//!
//! This module provides utilities for loading [`MirrorConfig`] from
//! environment variables and files.
//!
//! [`MirrorConfig`]: procmirror_domain::MirrorConfig

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
