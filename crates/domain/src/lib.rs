//! # procmirror Domain
//!
//! Plain domain types shared by every procmirror crate.
//!
//! This crate contains:
//! - Foreign address and lifecycle types
//! - Domain error types and Result definitions
//! - Configuration structures
//!
//! ## Architecture
//! - No dependencies on other procmirror crates
//! - Only external dependencies allowed
//! - No I/O, no threads, no global state

pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
