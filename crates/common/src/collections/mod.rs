//! Specialized data structures
//!
//! This module provides data structures used by the mirror layer:
//! - **[`ranked`]**: Associative container with gap-free positional ranks
//!
//! ## Usage
//!
//! ```
//! use procmirror_common::collections::RankedContainer;
//!
//! let mut alerts = RankedContainer::new();
//! alerts.add("boss", 10, 0);
//! alerts.add("chest", 5, 0);
//! assert_eq!(alerts.ordered_keys(), &["chest", "boss"]);
//! ```

pub mod ranked;

// Re-export commonly used types
pub use ranked::RankedContainer;
