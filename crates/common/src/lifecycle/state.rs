//! Driver-owned lifecycle state
//!
//! Only the component driving the scheduler writes the state. Caches and
//! retention decisions read it through [`LifecycleStateProvider`], which is
//! also implemented for a plain [`LifecycleState`] so tests can pass a
//! constant.

use std::sync::Arc;

use parking_lot::RwLock;
use procmirror_domain::LifecycleState;

/// Read access to the current lifecycle state.
pub trait LifecycleStateProvider: Send + Sync {
    fn current(&self) -> LifecycleState;
}

impl LifecycleStateProvider for LifecycleState {
    fn current(&self) -> LifecycleState {
        *self
    }
}

/// Clonable handle to the shared lifecycle state.
#[derive(Debug, Clone, Default)]
pub struct SharedLifecycleState(Arc<RwLock<LifecycleState>>);

impl SharedLifecycleState {
    /// Create a handle starting at `state`.
    #[must_use]
    pub fn new(state: LifecycleState) -> Self {
        Self(Arc::new(RwLock::new(state)))
    }

    /// Current state.
    pub fn get(&self) -> LifecycleState {
        *self.0.read()
    }

    /// Replace the state, returning the previous one.
    pub fn set(&self, state: LifecycleState) -> LifecycleState {
        std::mem::replace(&mut *self.0.write(), state)
    }
}

impl LifecycleStateProvider for SharedLifecycleState {
    fn current(&self) -> LifecycleState {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_the_same_state() {
        let driver = SharedLifecycleState::default();
        let reader = driver.clone();
        assert_eq!(reader.current(), LifecycleState::Detached);

        let previous = driver.set(LifecycleState::InArea);
        assert_eq!(previous, LifecycleState::Detached);
        assert_eq!(reader.current(), LifecycleState::InArea);
    }

    #[test]
    fn plain_state_is_a_constant_provider() {
        fn read(provider: &dyn LifecycleStateProvider) -> LifecycleState {
            provider.current()
        }
        assert_eq!(read(&LifecycleState::Paused), LifecycleState::Paused);
    }
}
