//! Selective retention across lifecycle events

use procmirror_domain::{CacheSettings, LifecycleEvent, LifecycleState};

/// Decides whether a lifecycle event should clear a cache.
///
/// A process close always clears, since every address it handed out is
/// dead. An area change clears unless the new state is one of the preserved
/// states. Ticks never clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    preserve: Vec<LifecycleState>,
}

impl RetentionPolicy {
    /// Policy preserving exactly `preserve`.
    pub fn new(preserve: impl IntoIterator<Item = LifecycleState>) -> Self {
        let mut unique = Vec::new();
        for state in preserve {
            if !unique.contains(&state) {
                unique.push(state);
            }
        }
        Self { preserve: unique }
    }

    /// Policy described by the cache section of the configuration.
    #[must_use]
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.preserve_states.iter().copied())
    }

    /// Policy that clears on every area change.
    #[must_use]
    pub fn clear_always() -> Self {
        Self { preserve: Vec::new() }
    }

    /// States that keep entries across an area change.
    #[must_use]
    pub fn preserved(&self) -> &[LifecycleState] {
        &self.preserve
    }

    #[must_use]
    pub fn preserves(&self, state: LifecycleState) -> bool {
        self.preserve.contains(&state)
    }

    /// Returns `true` when `event` raised in `state` should drop entries.
    #[must_use]
    pub fn should_clear(&self, event: LifecycleEvent, state: LifecycleState) -> bool {
        match event {
            LifecycleEvent::ProcessClosed => true,
            LifecycleEvent::LogicalAreaChanged => !self.preserves(state),
            LifecycleEvent::PerFrameTick => false,
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new([LifecycleState::InArea, LifecycleState::Paused])
    }
}
