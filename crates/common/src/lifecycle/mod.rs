//! Lifecycle plumbing between the external process and the caches
//!
//! This module provides:
//! - **[`scheduler`]**: explicit callback registration keyed by lifecycle event
//! - **[`state`]**: the driver-owned lifecycle state handle caches read from
//! - **[`retention`]**: which states keep cache entries across an area change

pub mod retention;
pub mod scheduler;
pub mod state;

pub use retention::RetentionPolicy;
pub use scheduler::{EventContext, Scheduler, SubscriptionId};
pub use state::{LifecycleStateProvider, SharedLifecycleState};
