//! Error types used throughout the workspace

use thiserror::Error;

use crate::types::Address;

/// Failure reported by a field reader for a single address.
///
/// Readers are black boxes to the cache layer: the address may have been
/// freed, remapped, or never pointed at the expected structure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to read fields at {address}: {reason}")]
pub struct FetchError {
    /// Address the read was attempted at.
    pub address: Address,
    /// Reader-supplied description of the failure.
    pub reason: String,
}

impl FetchError {
    /// Create a fetch error for `address`.
    pub fn new(address: Address, reason: impl Into<String>) -> Self {
        Self { address, reason: reason.into() }
    }
}

/// Main error type for procmirror
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    /// A null or otherwise invalid key was used as a cache key.
    #[error("Invalid cache key: {key}")]
    InvalidKey { key: String },

    /// Neither the local store nor the grandparent held the key.
    #[error("No entry for {key} in cache '{cache}'")]
    NotFound { cache: String, key: String },

    /// A per-entry factory or refresh failed.
    #[error("Failed to construct entry for {key}: {reason}")]
    Construction { key: String, reason: String },

    /// The field reader could not produce a snapshot.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A dispatch handler was rejected at registration.
    #[error("Invalid handler: {0}")]
    InvalidHandler(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl MirrorError {
    /// Create an invalid-key error from any debuggable key.
    pub fn invalid_key(key: impl std::fmt::Debug) -> Self {
        Self::InvalidKey { key: format!("{key:?}") }
    }

    /// Create a not-found error for `key` in the named cache.
    pub fn not_found(cache: impl Into<String>, key: impl std::fmt::Display) -> Self {
        Self::NotFound { cache: cache.into(), key: key.to_string() }
    }

    /// Programming errors that should be fixed, not recovered from.
    #[must_use]
    pub const fn is_defect(&self) -> bool {
        matches!(self, Self::InvalidKey { .. } | Self::InvalidHandler(_))
    }
}

/// Result type alias for procmirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;
