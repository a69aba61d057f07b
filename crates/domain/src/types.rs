//! Common data types used throughout the workspace

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque location inside the monitored process.
///
/// The cache layer never dereferences an address; it only hashes, compares
/// and hands it to a field reader. The same bit pattern may refer to
/// unrelated data after the process reuses memory, so addresses are only
/// meaningful until the next lifecycle transition.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(u64);

impl Address {
    /// The distinguished null address. Never valid as a cache key.
    pub const NULL: Self = Self(0);

    /// Wrap a raw address value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw address value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns `true` for the null address.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Address displaced by `offset` bytes, or `None` on overflow.
    #[must_use]
    pub const fn checked_offset(self, offset: u64) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }
}

impl From<u64> for Address {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:#x})", self.0)
    }
}

/// Process-wide logical state, owned by whoever drives the scheduler.
///
/// Caches read it to decide whether a lifecycle event should clear them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// No process attached, or the process exited.
    #[default]
    Detached,
    /// The process is transitioning between logical areas.
    Loading,
    /// The process is inside a logical area and its structures are live.
    InArea,
    /// Inside an area but paused (overlay menus, escape screen).
    Paused,
    /// At a top-level menu outside any area.
    Menu,
}

impl LifecycleState {
    /// Stable lowercase name, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Detached => "detached",
            Self::Loading => "loading",
            Self::InArea => "in_area",
            Self::Paused => "paused",
            Self::Menu => "menu",
        }
    }

    /// Parse a state name as produced by [`LifecycleState::as_str`].
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "detached" => Some(Self::Detached),
            "loading" => Some(Self::Loading),
            "in_area" => Some(Self::InArea),
            "paused" => Some(Self::Paused),
            "menu" => Some(Self::Menu),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notifications raised by the external scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The monitored process exited or was detached.
    ProcessClosed,
    /// The process moved to another logical area.
    LogicalAreaChanged,
    /// One frame elapsed.
    PerFrameTick,
}

impl LifecycleEvent {
    /// Every event kind, in declaration order.
    pub const ALL: [Self; 3] = [Self::ProcessClosed, Self::LogicalAreaChanged, Self::PerFrameTick];

    /// Stable event name used for subscription bookkeeping and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ProcessClosed => "process_closed",
            Self::LogicalAreaChanged => "logical_area_changed",
            Self::PerFrameTick => "per_frame_tick",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
