//! Configuration management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::LifecycleState;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub cache: CacheSettings,
    pub logging: LoggingConfig,
    pub persistence: PersistenceConfig,
}

/// Cache layer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Worker threads for bulk refresh; `0` means one per CPU.
    pub refresh_threads: usize,
    /// States in which a logical-area change keeps cached entries.
    pub preserve_states: Vec<LifecycleState>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            refresh_threads: 0,
            preserve_states: vec![LifecycleState::InArea, LifecycleState::Paused],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// File holding the saved ranked container, if any.
    pub ranked_path: Option<PathBuf>,
}
