//! File persistence for ranked containers
//!
//! A container is stored as a JSON array of `[key, value]` pairs in rank
//! order. Saving writes a sibling temporary file and renames it over the
//! target, so a crash mid-save leaves the previous file intact.

use std::hash::Hash;
use std::path::{Path, PathBuf};

use procmirror_common::collections::RankedContainer;
use procmirror_domain::{MirrorError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Write `container` to `path`, creating parent directories as needed.
///
/// # Errors
/// Returns `MirrorError::Persistence` if serialization or any file
/// operation fails.
pub fn save_ranked<K, V>(container: &RankedContainer<K, V>, path: &Path) -> Result<()>
where
    K: Eq + Hash + Clone + Serialize,
    V: Serialize,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error("create directory", parent, &e))?;
    }

    let json = serde_json::to_string_pretty(container)
        .map_err(|e| MirrorError::Persistence(format!("Failed to serialize ranked entries: {}", e)))?;

    let staging = staging_path(path);
    std::fs::write(&staging, json).map_err(|e| io_error("write", &staging, &e))?;
    std::fs::rename(&staging, path).map_err(|e| io_error("replace", path, &e))?;

    tracing::debug!(path = %path.display(), entries = container.len(), "saved ranked entries");
    Ok(())
}

/// Read a container saved by [`save_ranked`].
///
/// A missing file yields an empty container. Entries are appended in file
/// order, so each key's rank is its position in the file.
///
/// # Errors
/// Returns `MirrorError::Persistence` if the file exists but cannot be read
/// or parsed.
pub fn load_ranked<K, V>(path: &Path) -> Result<RankedContainer<K, V>>
where
    K: Eq + Hash + Clone + DeserializeOwned,
    V: DeserializeOwned,
{
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no saved ranked entries");
        return Ok(RankedContainer::new());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| io_error("read", path, &e))?;
    let container: RankedContainer<K, V> = serde_json::from_str(&contents).map_err(|e| {
        MirrorError::Persistence(format!("Invalid ranked file {}: {}", path.display(), e))
    })?;

    tracing::debug!(path = %path.display(), entries = container.len(), "loaded ranked entries");
    Ok(container)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn io_error(action: &str, path: &Path, err: &std::io::Error) -> MirrorError {
    MirrorError::Persistence(format!("Failed to {} {}: {}", action, path.display(), err))
}
